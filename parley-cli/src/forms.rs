//! Modal form dialogs that hand back typed values.

use crate::input::TextInput;
use chrono::{NaiveDate, Utc};
use parley_shared::work::{EmailSubmission, NewDeliverable, NewProject, NewStatusUpdate, Priority};
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub label: &'static str,
    pub required: bool,
    pub multiline: bool,
    pub initial: &'static str,
}

impl FieldSpec {
    const fn required(label: &'static str) -> Self {
        Self {
            label,
            required: true,
            multiline: false,
            initial: "",
        }
    }

    const fn optional(label: &'static str) -> Self {
        Self {
            label,
            required: false,
            multiline: false,
            initial: "",
        }
    }

    const fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    const fn initial(mut self, initial: &'static str) -> Self {
        self.initial = initial;
        self
    }
}

/// A value that can be filled in through a [`FormDialog`].
pub trait FormModel: Sized {
    const TITLE: &'static str;

    fn fields() -> Vec<FieldSpec>;

    /// Build the value from trimmed field contents, in `fields()` order.
    /// Required fields are already known to be non-empty.
    fn from_values(values: &[&str]) -> Result<Self, String>;
}

pub struct FormDialog<T> {
    fields: Vec<(FieldSpec, TextInput)>,
    focus: usize,
    error: Option<String>,
    _model: PhantomData<T>,
}

impl<T: FormModel> FormDialog<T> {
    pub fn new() -> Self {
        let fields = T::fields()
            .into_iter()
            .map(|spec| (spec, TextInput::with_value(spec.initial)))
            .collect();
        Self {
            fields,
            focus: 0,
            error: None,
            _model: PhantomData,
        }
    }

    pub fn title(&self) -> &'static str {
        T::TITLE
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldSpec, &TextInput, bool)> {
        self.fields
            .iter()
            .enumerate()
            .map(move |(i, (spec, input))| (spec, input, i == self.focus))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn focused(&self) -> &FieldSpec {
        &self.fields[self.focus].0
    }

    pub fn input_mut(&mut self) -> &mut TextInput {
        &mut self.fields[self.focus].1
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Validate and convert. On failure the message is kept for display and
    /// the dialog stays open.
    pub fn submit(&mut self) -> Option<T> {
        if let Some((spec, _)) = self
            .fields
            .iter()
            .find(|(spec, input)| spec.required && input.is_blank())
        {
            self.error = Some(format!("{} is required", spec.label));
            return None;
        }

        let values: Vec<&str> = self.fields.iter().map(|(_, input)| input.trimmed()).collect();
        match T::from_values(&values) {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }
}

impl<T: FormModel> Default for FormDialog<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl FormModel for NewProject {
    const TITLE: &'static str = "New Project";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("Project name"),
            FieldSpec::optional("Company"),
            FieldSpec::optional("Description").multiline(),
        ]
    }

    fn from_values(values: &[&str]) -> Result<Self, String> {
        Ok(NewProject {
            name: values[0].to_string(),
            company: optional(values[1]),
            description: optional(values[2]),
        })
    }
}

impl FormModel for EmailSubmission {
    const TITLE: &'static str = "Process Email";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::optional("Subject"),
            FieldSpec::optional("From (email address)"),
            FieldSpec::required("Email content").multiline(),
        ]
    }

    fn from_values(values: &[&str]) -> Result<Self, String> {
        Ok(EmailSubmission {
            subject: values[0].to_string(),
            sender: values[1].to_string(),
            content: values[2].to_string(),
            recipients: Vec::new(),
            received_date: Utc::now(),
        })
    }
}

/// Status update text for the selected project.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDraft {
    pub content: String,
}

impl StatusDraft {
    pub fn for_project(self, project_id: i64) -> NewStatusUpdate {
        NewStatusUpdate {
            project_id,
            content: self.content,
            created_by: "User".to_string(),
        }
    }
}

impl FormModel for StatusDraft {
    const TITLE: &'static str = "Add Status Update";

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::required("Status update").multiline()]
    }

    fn from_values(values: &[&str]) -> Result<Self, String> {
        Ok(StatusDraft {
            content: values[0].to_string(),
        })
    }
}

/// Deliverable details for the selected project.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverableDraft {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl DeliverableDraft {
    pub fn for_project(self, project_id: i64) -> NewDeliverable {
        NewDeliverable {
            project_id,
            title: self.title,
            due_date: self.due_date,
            priority: self.priority,
        }
    }
}

impl FormModel for DeliverableDraft {
    const TITLE: &'static str = "Add Deliverable";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("Deliverable title"),
            FieldSpec::optional("Due date (YYYY-MM-DD)"),
            FieldSpec::optional("Priority (low/medium/high)").initial("medium"),
        ]
    }

    fn from_values(values: &[&str]) -> Result<Self, String> {
        let due_date = match values[1] {
            "" => None,
            text => Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|_| format!("'{text}' is not a date in YYYY-MM-DD form"))?,
            ),
        };
        Ok(DeliverableDraft {
            title: values[0].to_string(),
            due_date,
            priority: values[2].parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into<T: FormModel>(form: &mut FormDialog<T>, text: &str) {
        form.input_mut().insert_str(text);
    }

    #[test]
    fn required_fields_block_submission() {
        let mut form = FormDialog::<NewProject>::new();
        assert!(form.submit().is_none());
        assert_eq!(form.error(), Some("Project name is required"));

        type_into(&mut form, "  Apollo ");
        form.focus_next();
        type_into(&mut form, "Acme");
        let project = form.submit().unwrap();
        assert_eq!(project.name, "Apollo");
        assert_eq!(project.company.as_deref(), Some("Acme"));
        assert_eq!(project.description, None);
        assert!(form.error().is_none());
    }

    #[test]
    fn deliverable_validates_date_and_priority() {
        let mut form = FormDialog::<DeliverableDraft>::new();
        type_into(&mut form, "Launch plan");
        form.focus_next();
        type_into(&mut form, "next friday");
        assert!(form.submit().is_none());
        assert!(form.error().unwrap().contains("YYYY-MM-DD"));

        form.input_mut().clear();
        type_into(&mut form, "2024-07-01");
        let draft = form.submit().unwrap();
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 7, 1));

        let body = draft.for_project(9);
        assert_eq!(body.project_id, 9);
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = FormDialog::<EmailSubmission>::new();
        form.focus_prev();
        assert_eq!(form.focused().label, "Email content");
        form.focus_next();
        assert_eq!(form.focused().label, "Subject");
    }

    #[test]
    fn status_draft_is_attributed_to_user() {
        let mut form = FormDialog::<StatusDraft>::new();
        type_into(&mut form, "Shipped beta");
        let update = form.submit().unwrap().for_project(4);
        assert_eq!(update.created_by, "User");
        assert_eq!(update.content, "Shipped beta");
    }
}
