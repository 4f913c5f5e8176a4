use crate::error::TaskError;
use crate::task::{
    FIELD_AUDIENCE, FIELD_CONCEPT, FIELD_TARGET_LANGUAGE, FIELD_TEXT, FIELD_TOPIC, Fields,
    TaskKind, TaskRequest,
};

/// Model used for every task.
pub const MODEL: &str = "openai/gpt-3.5-turbo";

/// Everything the provider needs to run one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub prompt_text: String,
    pub temperature: f32,
    pub model: &'static str,
}

impl TaskKind {
    /// Sampling temperature for this task.
    pub fn temperature(&self) -> f32 {
        match self {
            TaskKind::Translate => 0.3,
            TaskKind::Summarize => 0.5,
            TaskKind::Brainstorm => 0.8,
            TaskKind::Explain => 0.6,
            TaskKind::ProofreadGrammar => 0.2,
        }
    }
}

/// Build the prompt for `kind` from the user's field values.
pub fn build_prompt(kind: TaskKind, fields: &Fields) -> Result<PromptSpec, TaskError> {
    let request = TaskRequest::new(kind, fields.clone());
    request.validate()?;

    let prompt_text = match kind {
        TaskKind::Translate => format!(
            "You are an expert translator. Translate the following text into '{}'.\n\
             Detect the original language automatically.\n\
             Return ONLY the translated text.\n\n\
             Text: \"{}\"",
            request.value(FIELD_TARGET_LANGUAGE),
            request.value(FIELD_TEXT)
        ),
        TaskKind::Summarize => format!(
            "You are an expert at condensing information. Summarize the following text concisely, \
             capturing only its main ideas.\n\
             The summary must be noticeably shorter than the original.\n\
             Return ONLY the summary.\n\n\
             Text: \"{}\"",
            request.value(FIELD_TEXT)
        ),
        TaskKind::Brainstorm => format!(
            "You are a creative idea generator. Brainstorm about the following topic and provide \
             5 to 7 original and varied ideas.\n\
             Format: numbered list.\n\
             Return ONLY the list of ideas.\n\n\
             Topic: \"{}\"",
            request.value(FIELD_TOPIC)
        ),
        TaskKind::Explain => format!(
            "You are a patient, expert teacher. Explain the following concept clearly and simply, \
             tailored for '{}'.\n\
             Use analogies where possible. Avoid excessive technical jargon.\n\
             Return ONLY the explanation.\n\n\
             Concept: \"{}\"",
            request.value(FIELD_AUDIENCE),
            request.value(FIELD_CONCEPT)
        ),
        TaskKind::ProofreadGrammar => format!(
            "You are a meticulous writing assistant. Check the following text for grammar and \
             spelling mistakes and return the corrected text.\n\
             Make only the necessary corrections. Do not change its meaning or style.\n\
             Return ONLY the corrected text.\n\n\
             Text: \"{}\"",
            request.value(FIELD_TEXT)
        ),
    };

    Ok(PromptSpec {
        prompt_text,
        temperature: kind.temperature(),
        model: MODEL,
    })
}
