use crate::dispatcher::{CompletionResult, Dispatcher};
use crate::task::{Fields, TaskKind, missing_required};

/// Outcome of pressing "submit" on the form.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Required fields are blank; nothing was sent.
    Incomplete(Vec<&'static str>),
    Finished(CompletionResult),
}

/// View-model behind the task form: selected task, field values and the
/// single result slot.
#[derive(Debug, Clone)]
pub struct Session {
    selected: TaskKind,
    fields: Fields,
    result: Option<CompletionResult>,
    last_task: Option<TaskKind>,
}

impl Session {
    pub fn new(selected: TaskKind) -> Self {
        Self {
            selected,
            fields: Fields::new(),
            result: None,
            last_task: None,
        }
    }

    pub fn selected(&self) -> TaskKind {
        self.selected
    }

    /// Switch task. Changing to a different task clears the result slot and
    /// the previous field values before the new form is rendered.
    /// Returns true when anything was cleared.
    pub fn select_task(&mut self, kind: TaskKind) -> bool {
        if kind == self.selected {
            return false;
        }
        self.selected = kind;
        self.fields.clear();
        self.result.take().is_some()
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        missing_required(self.selected, &self.fields)
    }

    pub fn result(&self) -> Option<&CompletionResult> {
        self.result.as_ref()
    }

    /// Task that produced the current result.
    pub fn last_task(&self) -> Option<TaskKind> {
        self.last_task
    }

    /// Store a finished result; the newest one always wins.
    pub fn record(&mut self, kind: TaskKind, result: CompletionResult) {
        if kind == self.selected {
            self.result = Some(result);
            self.last_task = Some(kind);
        }
    }

    /// Validate the form, then run the selected task.
    pub async fn submit(&mut self, dispatcher: &Dispatcher, api_key: Option<&str>) -> SubmitOutcome {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return SubmitOutcome::Incomplete(missing);
        }

        let kind = self.selected;
        let result = dispatcher.execute(api_key, kind, &self.fields).await;
        self.record(kind, result.clone());
        SubmitOutcome::Finished(result)
    }
}
