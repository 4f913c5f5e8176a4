use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Field values keyed by field name.
pub type Fields = BTreeMap<String, String>;

pub const FIELD_TEXT: &str = "text";
pub const FIELD_TARGET_LANGUAGE: &str = "targetLanguage";
pub const FIELD_TOPIC: &str = "topic";
pub const FIELD_CONCEPT: &str = "concept";
pub const FIELD_AUDIENCE: &str = "audience";

pub const DEFAULT_TARGET_LANGUAGE: &str = "English";
pub const DEFAULT_AUDIENCE: &str = "a beginner";

const TARGET_LANGUAGES: &[&str] = &[
    "English",
    "French",
    "German",
    "Italian",
    "Portuguese",
    "Chinese (Simplified)",
    "Japanese",
    "Russian",
    "Arabic",
    "Spanish",
];

const AUDIENCES: &[&str] = &[
    "a beginner",
    "an intermediate learner",
    "an expert",
    "a child",
];

/// The five tasks the assistant knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TaskKind {
    Translate,
    Summarize,
    Brainstorm,
    Explain,
    ProofreadGrammar,
}

/// How a field is collected from the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldInput {
    Line,
    Multiline,
    Choice(&'static [&'static str]),
}

/// Form descriptor for one task field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub input: FieldInput,
    /// Required fields must be non-blank; the others fall back to `default`.
    pub required: bool,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn required(name: &'static str, label: &'static str, input: FieldInput) -> Self {
        Self {
            name,
            label,
            input,
            required: true,
            default: None,
        }
    }

    const fn defaulted(
        name: &'static str,
        label: &'static str,
        input: FieldInput,
        default: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            input,
            required: false,
            default: Some(default),
        }
    }
}

const TRANSLATE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(FIELD_TEXT, "Text to translate", FieldInput::Multiline),
    FieldSpec::defaulted(
        FIELD_TARGET_LANGUAGE,
        "Target language",
        FieldInput::Choice(TARGET_LANGUAGES),
        DEFAULT_TARGET_LANGUAGE,
    ),
];

const SUMMARIZE_FIELDS: &[FieldSpec] = &[FieldSpec::required(
    FIELD_TEXT,
    "Text to summarize",
    FieldInput::Multiline,
)];

const BRAINSTORM_FIELDS: &[FieldSpec] = &[FieldSpec::required(
    FIELD_TOPIC,
    "Topic to brainstorm about",
    FieldInput::Line,
)];

const EXPLAIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(FIELD_CONCEPT, "Concept to explain", FieldInput::Line),
    FieldSpec::defaulted(
        FIELD_AUDIENCE,
        "Audience",
        FieldInput::Choice(AUDIENCES),
        DEFAULT_AUDIENCE,
    ),
];

const PROOFREAD_FIELDS: &[FieldSpec] = &[FieldSpec::required(
    FIELD_TEXT,
    "Text to proofread",
    FieldInput::Multiline,
)];

impl TaskKind {
    /// All tasks, in menu order.
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Translate,
        TaskKind::Summarize,
        TaskKind::Brainstorm,
        TaskKind::Explain,
        TaskKind::ProofreadGrammar,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            TaskKind::Translate => "translate",
            TaskKind::Summarize => "summarize",
            TaskKind::Brainstorm => "brainstorm",
            TaskKind::Explain => "explain",
            TaskKind::ProofreadGrammar => "proofread",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskKind::Translate => "Translate",
            TaskKind::Summarize => "Summarize",
            TaskKind::Brainstorm => "Brainstorm Ideas",
            TaskKind::Explain => "Explain a Concept",
            TaskKind::ProofreadGrammar => "Proofread Grammar",
        }
    }

    /// The field-set contract for this task.
    pub fn field_specs(&self) -> &'static [FieldSpec] {
        match self {
            TaskKind::Translate => TRANSLATE_FIELDS,
            TaskKind::Summarize => SUMMARIZE_FIELDS,
            TaskKind::Brainstorm => BRAINSTORM_FIELDS,
            TaskKind::Explain => EXPLAIN_FIELDS,
            TaskKind::ProofreadGrammar => PROOFREAD_FIELDS,
        }
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.field_specs().iter().map(|spec| spec.name).collect()
    }

    pub fn field_spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.field_specs().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "translate" | "translation" => Ok(TaskKind::Translate),
            "summarize" | "summarise" | "summary" => Ok(TaskKind::Summarize),
            "brainstorm" | "brainstorm-ideas" | "ideas" => Ok(TaskKind::Brainstorm),
            "explain" | "explain-a-concept" | "explain-concept" => Ok(TaskKind::Explain),
            "proofread" | "proofread-grammar" | "grammar" => Ok(TaskKind::ProofreadGrammar),
            _ => Err(TaskError::UnrecognizedTask(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for TaskKind {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskKind> for &'static str {
    fn from(kind: TaskKind) -> Self {
        kind.slug()
    }
}

/// One submission: a task plus the values the user filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub fields: Fields,
}

impl TaskRequest {
    pub fn new(kind: TaskKind, fields: Fields) -> Self {
        Self { kind, fields }
    }

    /// Fails on the first required field that is missing or blank.
    pub fn validate(&self) -> Result<(), TaskError> {
        match missing_required(self.kind, &self.fields).first() {
            Some(field) => Err(TaskError::validation(*field)),
            None => Ok(()),
        }
    }

    /// Value of `name`, with the field's default substituted when absent or blank.
    pub fn value(&self, name: &str) -> &str {
        match self.fields.get(name).map(|v| v.as_str()) {
            Some(v) if !v.trim().is_empty() => v,
            _ => self
                .kind
                .field_spec(name)
                .and_then(|spec| spec.default)
                .unwrap_or(""),
        }
    }
}

/// Names of the required fields of `kind` that are missing or blank in `fields`.
pub fn missing_required(kind: TaskKind, fields: &Fields) -> Vec<&'static str> {
    kind.field_specs()
        .iter()
        .filter(|spec| spec.required)
        .filter(|spec| {
            fields
                .get(spec.name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|spec| spec.name)
        .collect()
}
