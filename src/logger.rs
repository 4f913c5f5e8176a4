use simplelog::{ConfigBuilder, LevelFilter, SimpleLogger};

pub fn init(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    // Keep HTTP client internals out of debug output
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("hyper")
        .build();
    let _ = SimpleLogger::init(level, config);
}
