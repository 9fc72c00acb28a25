//! Work assistant: projects, processed emails, status updates, deliverables
//! and free-text questions about all of them.

use super::{Entry, Tone};
use crate::client::ApiClient;
use crate::error::ConsoleError;
use crate::forms::{DeliverableDraft, FieldSpec, FormDialog, StatusDraft};
use crate::input::TextInput;
use chrono::{Local, NaiveDateTime};
use parley_shared::work::{
    Deliverable, Email, EmailSubmission, NewDeliverable, NewProject, NewStatusUpdate,
    ProcessedEmail, Project, QueryAnswer, StatusUpdate, StatusUpdateCreated,
};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Window for the upcoming-deliverables list.
pub const UPCOMING_DAYS: u32 = 7;

/// How long a success or failure message stays up.
pub const FLASH_FOR: Duration = Duration::from_secs(3);

const RECENT: usize = 3;

/// Network work the app should run on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkRequest {
    LoadProjects,
    LoadProject(i64),
    LoadDeliverables,
    CreateProject(NewProject),
    ProcessEmail(EmailSubmission),
    AddStatus(NewStatusUpdate),
    AddDeliverable(NewDeliverable),
    Query(String),
}

/// Result of a [`WorkRequest`], fed back through [`WorkController::apply`].
#[derive(Debug)]
pub enum WorkEvent {
    Projects(Result<Vec<Project>, ConsoleError>),
    ProjectData {
        project_id: i64,
        result: Result<(Vec<Email>, Vec<StatusUpdate>), ConsoleError>,
    },
    Deliverables(Result<Vec<Deliverable>, ConsoleError>),
    ProjectCreated(Result<Project, ConsoleError>),
    EmailProcessed(Result<ProcessedEmail, ConsoleError>),
    StatusAdded {
        project_id: i64,
        result: Result<StatusUpdateCreated, ConsoleError>,
    },
    DeliverableAdded(Result<Deliverable, ConsoleError>),
    Answered {
        query: String,
        result: Result<QueryAnswer, ConsoleError>,
    },
}

/// Run one request against the server.
pub async fn perform(client: &ApiClient, request: WorkRequest) -> WorkEvent {
    match request {
        WorkRequest::LoadProjects => WorkEvent::Projects(client.projects().await),
        WorkRequest::LoadProject(project_id) => {
            let result = async {
                let emails = client.project_emails(project_id).await?;
                let updates = client.status_updates(project_id).await?;
                Ok::<_, ConsoleError>((emails, updates))
            }
            .await;
            WorkEvent::ProjectData { project_id, result }
        }
        WorkRequest::LoadDeliverables => {
            WorkEvent::Deliverables(client.upcoming_deliverables(UPCOMING_DAYS).await)
        }
        WorkRequest::CreateProject(project) => {
            WorkEvent::ProjectCreated(client.create_project(&project).await)
        }
        WorkRequest::ProcessEmail(email) => {
            WorkEvent::EmailProcessed(client.process_email(&email).await)
        }
        WorkRequest::AddStatus(update) => WorkEvent::StatusAdded {
            project_id: update.project_id,
            result: client.add_status_update(&update).await,
        },
        WorkRequest::AddDeliverable(deliverable) => {
            WorkEvent::DeliverableAdded(client.add_deliverable(&deliverable).await)
        }
        WorkRequest::Query(query) => {
            let result = client.query(&query).await;
            WorkEvent::Answered { query, result }
        }
    }
}

/// The open modal, if any.
pub enum Dialog {
    Project(FormDialog<NewProject>),
    Email(FormDialog<EmailSubmission>),
    Status {
        project: String,
        form: FormDialog<StatusDraft>,
    },
    Deliverable(FormDialog<DeliverableDraft>),
}

/// Borrowed view of a dialog for drawing.
pub struct DialogView<'a> {
    pub title: String,
    pub fields: Vec<(&'a FieldSpec, &'a TextInput, bool)>,
    pub error: Option<&'a str>,
}

impl Dialog {
    pub fn view(&self) -> DialogView<'_> {
        match self {
            Dialog::Project(form) => DialogView {
                title: form.title().to_string(),
                fields: form.fields().collect(),
                error: form.error(),
            },
            Dialog::Email(form) => DialogView {
                title: form.title().to_string(),
                fields: form.fields().collect(),
                error: form.error(),
            },
            Dialog::Status { project, form } => DialogView {
                title: format!("{} for {}", form.title(), project),
                fields: form.fields().collect(),
                error: form.error(),
            },
            Dialog::Deliverable(form) => DialogView {
                title: form.title().to_string(),
                fields: form.fields().collect(),
                error: form.error(),
            },
        }
    }

    pub fn input_mut(&mut self) -> &mut TextInput {
        match self {
            Dialog::Project(form) => form.input_mut(),
            Dialog::Email(form) => form.input_mut(),
            Dialog::Status { form, .. } => form.input_mut(),
            Dialog::Deliverable(form) => form.input_mut(),
        }
    }

    pub fn focused_is_multiline(&self) -> bool {
        match self {
            Dialog::Project(form) => form.focused().multiline,
            Dialog::Email(form) => form.focused().multiline,
            Dialog::Status { form, .. } => form.focused().multiline,
            Dialog::Deliverable(form) => form.focused().multiline,
        }
    }

    pub fn focus_next(&mut self) {
        match self {
            Dialog::Project(form) => form.focus_next(),
            Dialog::Email(form) => form.focus_next(),
            Dialog::Status { form, .. } => form.focus_next(),
            Dialog::Deliverable(form) => form.focus_next(),
        }
    }

    pub fn focus_prev(&mut self) {
        match self {
            Dialog::Project(form) => form.focus_prev(),
            Dialog::Email(form) => form.focus_prev(),
            Dialog::Status { form, .. } => form.focus_prev(),
            Dialog::Deliverable(form) => form.focus_prev(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub text: String,
    pub is_error: bool,
    at: Instant,
}

/// What the output area currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkView {
    Empty,
    Project {
        project: Project,
        updates: Vec<StatusUpdate>,
        emails: Vec<Email>,
    },
    Processed(ProcessedEmail),
    Querying(String),
    Answer(QueryAnswer),
    QueryFailed,
}

pub struct WorkController {
    pub query: TextInput,
    projects: Vec<Project>,
    selected: Option<usize>,
    deliverables: Vec<Deliverable>,
    view: WorkView,
    dialog: Option<Dialog>,
    flash: Option<Flash>,
}

impl Default for WorkController {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkController {
    pub fn new() -> Self {
        Self {
            query: TextInput::new(),
            projects: Vec::new(),
            selected: None,
            deliverables: Vec::new(),
            view: WorkView::Empty,
            dialog: None,
            flash: None,
        }
    }

    /// Requests to issue when the app starts.
    pub fn startup() -> Vec<WorkRequest> {
        vec![WorkRequest::LoadProjects, WorkRequest::LoadDeliverables]
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn selected(&self) -> Option<&Project> {
        self.selected.and_then(|i| self.projects.get(i))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn deliverables(&self) -> &[Deliverable] {
        &self.deliverables
    }

    pub fn view(&self) -> &WorkView {
        &self.view
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut Dialog> {
        self.dialog.as_mut()
    }

    pub fn has_dialog(&self) -> bool {
        self.dialog.is_some()
    }

    fn show_flash(&mut self, text: impl Into<String>, is_error: bool, now: Instant) {
        self.flash = Some(Flash {
            text: text.into(),
            is_error,
            at: now,
        });
    }

    /// Expire the flash message. Returns true if something changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &self.flash {
            Some(flash) if now.duration_since(flash.at) >= FLASH_FOR => {
                self.flash = None;
                true
            }
            _ => false,
        }
    }

    fn select(&mut self, index: usize) -> Option<WorkRequest> {
        let project = self.projects.get(index)?;
        self.selected = Some(index);
        Some(WorkRequest::LoadProject(project.id))
    }

    pub fn select_next(&mut self) -> Option<WorkRequest> {
        if self.projects.is_empty() {
            return None;
        }
        let next = match self.selected {
            Some(i) => (i + 1) % self.projects.len(),
            None => 0,
        };
        self.select(next)
    }

    pub fn select_prev(&mut self) -> Option<WorkRequest> {
        if self.projects.is_empty() {
            return None;
        }
        let len = self.projects.len();
        let prev = match self.selected {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.select(prev)
    }

    pub fn open_project_dialog(&mut self) {
        self.dialog = Some(Dialog::Project(FormDialog::new()));
    }

    pub fn open_email_dialog(&mut self) {
        self.dialog = Some(Dialog::Email(FormDialog::new()));
    }

    pub fn open_status_dialog(&mut self, now: Instant) {
        match self.selected().map(|p| p.name.clone()) {
            Some(project) => {
                self.dialog = Some(Dialog::Status {
                    project,
                    form: FormDialog::new(),
                })
            }
            None => self.show_flash("Please select a project first", true, now),
        }
    }

    pub fn open_deliverable_dialog(&mut self, now: Instant) {
        if self.selected().is_some() {
            self.dialog = Some(Dialog::Deliverable(FormDialog::new()));
        } else {
            self.show_flash("Please select a project first", true, now);
        }
    }

    pub fn cancel_dialog(&mut self) {
        self.dialog = None;
    }

    /// Validate the open dialog. On success it closes and the request to run
    /// is returned; on failure it stays open showing the problem.
    pub fn submit_dialog(&mut self) -> Option<WorkRequest> {
        let project_id = self.selected().map(|p| p.id);
        let request = match self.dialog.as_mut()? {
            Dialog::Project(form) => WorkRequest::CreateProject(form.submit()?),
            Dialog::Email(form) => WorkRequest::ProcessEmail(form.submit()?),
            Dialog::Status { form, .. } => {
                WorkRequest::AddStatus(form.submit()?.for_project(project_id?))
            }
            Dialog::Deliverable(form) => {
                WorkRequest::AddDeliverable(form.submit()?.for_project(project_id?))
            }
        };
        self.dialog = None;
        Some(request)
    }

    pub fn submit_query(&mut self) -> Option<WorkRequest> {
        if self.query.is_blank() {
            return None;
        }
        let query = self.query.trimmed().to_string();
        self.view = WorkView::Querying(query.clone());
        Some(WorkRequest::Query(query))
    }

    /// Fold a finished request into the view. Returns follow-up requests.
    pub fn apply(&mut self, event: WorkEvent, now: Instant) -> Vec<WorkRequest> {
        let mut follow_up = Vec::new();
        match event {
            WorkEvent::Projects(Ok(projects)) => {
                let selected_id = self.selected().map(|p| p.id);
                self.projects = projects;
                self.selected =
                    selected_id.and_then(|id| self.projects.iter().position(|p| p.id == id));
            }
            WorkEvent::Projects(Err(e)) => error!("Failed to load projects: {}", e),

            WorkEvent::ProjectData { project_id, result } => match result {
                Ok((emails, updates)) => {
                    let project = self.selected().filter(|p| p.id == project_id).cloned();
                    if let Some(project) = project {
                        self.view = WorkView::Project {
                            project,
                            updates: updates.into_iter().take(RECENT).collect(),
                            emails: emails.into_iter().take(RECENT).collect(),
                        };
                    }
                }
                Err(e) => error!("Failed to load project data: {}", e),
            },

            WorkEvent::Deliverables(Ok(deliverables)) => self.deliverables = deliverables,
            WorkEvent::Deliverables(Err(e)) => error!("Failed to load deliverables: {}", e),

            WorkEvent::ProjectCreated(Ok(project)) => {
                info!("Created project {} ({})", project.name, project.id);
                self.projects.push(project);
                self.show_flash("Project created successfully", false, now);
            }
            WorkEvent::ProjectCreated(Err(e)) => {
                error!("Failed to create project: {}", e);
                self.show_flash("Failed to create project", true, now);
            }

            WorkEvent::EmailProcessed(Ok(processed)) => {
                if processed.project.is_some() {
                    follow_up.push(WorkRequest::LoadProjects);
                }
                self.view = WorkView::Processed(processed);
            }
            WorkEvent::EmailProcessed(Err(e)) => {
                error!("Failed to process email: {}", e);
                self.show_flash("Failed to process email", true, now);
            }

            WorkEvent::StatusAdded { project_id, result } => match result {
                Ok(_) => {
                    self.show_flash("Status update added successfully", false, now);
                    follow_up.push(WorkRequest::LoadProject(project_id));
                }
                Err(e) => {
                    error!("Failed to add status update: {}", e);
                    self.show_flash("Failed to add status update", true, now);
                }
            },

            WorkEvent::DeliverableAdded(Ok(_)) => {
                self.show_flash("Deliverable added successfully", false, now);
                follow_up.push(WorkRequest::LoadDeliverables);
            }
            WorkEvent::DeliverableAdded(Err(e)) => {
                error!("Failed to add deliverable: {}", e);
                self.show_flash("Failed to add deliverable", true, now);
            }

            WorkEvent::Answered { query, result } => {
                // A newer query owns the view.
                if self.view != WorkView::Querying(query) {
                    return follow_up;
                }
                match result {
                    Ok(answer) => {
                        self.query.clear();
                        self.view = WorkView::Answer(answer);
                    }
                    Err(e) => {
                        error!("Failed to process query: {}", e);
                        self.view = WorkView::QueryFailed;
                    }
                }
            }
        }
        follow_up
    }

    /// Output area contents as styled blocks.
    pub fn output(&self) -> Vec<Entry> {
        let mut out = Vec::new();
        let mut push = |tone: Tone, text: String| out.push(Entry { tone, text });

        match &self.view {
            WorkView::Empty => push(
                Tone::Welcome,
                "Select a project (Tab), process an email (Ctrl-E) or ask a question.".into(),
            ),
            WorkView::Project {
                project,
                updates,
                emails,
            } => {
                push(Tone::User, project.name.clone());
                if !updates.is_empty() {
                    push(Tone::Meta, "Recent Status Updates".into());
                    for update in updates {
                        push(Tone::Meta, short_date(update.created_at));
                        push(Tone::Plain, update.content.clone());
                    }
                }
                if !emails.is_empty() {
                    push(Tone::Meta, "Recent Emails".into());
                    for email in emails {
                        push(
                            Tone::Plain,
                            format!(
                                "{}\nFrom: {}\n{}",
                                email.subject.as_deref().unwrap_or("(no subject)"),
                                email.sender,
                                short_date(email.received_date)
                            ),
                        );
                    }
                }
            }
            WorkView::Processed(processed) => {
                let info = &processed.extracted_info;
                let joined = |items: &Option<Vec<String>>| match items {
                    Some(items) if !items.is_empty() => items.join(", "),
                    _ => "None".to_string(),
                };
                push(Tone::User, "Email Processed".into());
                push(
                    Tone::Plain,
                    format!(
                        "Project: {}\nCompany: {}\nPeople: {}\nKeywords: {}\nImportance: {}\nSummary: {}",
                        info.project_name.as_deref().unwrap_or("Not identified"),
                        info.company.as_deref().unwrap_or("Not identified"),
                        joined(&info.people),
                        joined(&info.keywords),
                        info.importance.as_deref().unwrap_or("-"),
                        info.summary.as_deref().unwrap_or("-"),
                    ),
                );
            }
            WorkView::Querying(_) => push(Tone::Pending, "Processing query...".into()),
            WorkView::QueryFailed => push(Tone::Error, "Failed to process query".into()),
            WorkView::Answer(answer) => {
                push(Tone::User, format!("Query: {}", answer.query));
                push(Tone::Assistant, answer.answer.clone());
                let results = &answer.results;
                if !results.deliverables.is_empty() {
                    push(Tone::Meta, "Deliverables:".into());
                    for d in &results.deliverables {
                        push(
                            Tone::Plain,
                            format!(
                                "{} - {}\nDue: {}\nStatus: {}",
                                d.title,
                                d.project_name.as_deref().unwrap_or("-"),
                                short_date(d.due_date),
                                d.status.as_deref().unwrap_or("-"),
                            ),
                        );
                    }
                }
                if !results.emails.is_empty() {
                    push(Tone::Meta, "Related Emails:".into());
                    for hit in &results.emails {
                        push(
                            Tone::Plain,
                            format!(
                                "{}\nFrom: {}\nRelevance: {}%",
                                hit.metadata.subject.as_deref().unwrap_or("(no subject)"),
                                hit.metadata.sender.as_deref().unwrap_or("-"),
                                hit.relevance_percent()
                            ),
                        );
                    }
                }
                if !results.status_updates.is_empty() {
                    push(Tone::Meta, "Status Updates:".into());
                    for hit in &results.status_updates {
                        let excerpt: String = hit.content.chars().take(200).collect();
                        push(
                            Tone::Plain,
                            format!(
                                "{}...\nProject: {}\nRelevance: {}%",
                                excerpt,
                                hit.metadata.project_name.as_deref().unwrap_or("-"),
                                hit.relevance_percent()
                            ),
                        );
                    }
                }
            }
        }
        out
    }
}

fn short_date(at: Option<NaiveDateTime>) -> String {
    at.map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Whole days from `now` until `due`, rounded up.
pub fn days_until(due: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let secs = (due - now).num_seconds();
    let days = secs.div_euclid(86_400);
    if secs.rem_euclid(86_400) > 0 {
        days + 1
    } else {
        days
    }
}

pub fn due_label(deliverable: &Deliverable, now: NaiveDateTime) -> String {
    match deliverable.due_date {
        Some(due) => format!("Due in {} days", days_until(due, now)),
        None => "No due date".to_string(),
    }
}

/// Local wall clock, as the server stores naive local times.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parley_shared::work::{HitMetadata, QueryResults, SearchHit};

    fn project(id: i64, name: &str) -> Project {
        Project {
            id,
            name: name.into(),
            company: None,
            description: None,
            status: Some("active".into()),
            created_at: None,
            updated_at: None,
        }
    }

    fn loaded() -> WorkController {
        let mut work = WorkController::new();
        work.apply(
            WorkEvent::Projects(Ok(vec![project(1, "Apollo"), project(2, "Gemini")])),
            Instant::now(),
        );
        work
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn selection_cycles_and_requests_project_data() {
        let mut work = loaded();
        assert_eq!(work.select_next(), Some(WorkRequest::LoadProject(1)));
        assert_eq!(work.select_next(), Some(WorkRequest::LoadProject(2)));
        assert_eq!(work.select_next(), Some(WorkRequest::LoadProject(1)));
        assert_eq!(work.select_prev(), Some(WorkRequest::LoadProject(2)));
        assert_eq!(work.selected().unwrap().name, "Gemini");
    }

    #[test]
    fn project_view_keeps_three_most_recent() {
        let mut work = loaded();
        work.select_next();
        let updates = (0..5)
            .map(|i| StatusUpdate {
                id: i,
                project_id: 1,
                project_name: None,
                content: format!("update {i}"),
                update_type: None,
                keywords: None,
                created_by: None,
                created_at: None,
            })
            .collect();
        work.apply(
            WorkEvent::ProjectData {
                project_id: 1,
                result: Ok((Vec::new(), updates)),
            },
            Instant::now(),
        );
        match work.view() {
            WorkView::Project { updates, emails, .. } => {
                assert_eq!(updates.len(), 3);
                assert!(emails.is_empty());
            }
            other => panic!("unexpected view {other:?}"),
        }
        let output = work.output();
        assert_eq!(output[0].text, "Apollo");
        assert_eq!(output[1].text, "Recent Status Updates");
    }

    #[test]
    fn status_dialog_needs_a_project() {
        let mut work = loaded();
        let now = Instant::now();
        work.open_status_dialog(now);
        assert!(!work.has_dialog());
        assert_eq!(work.flash().unwrap().text, "Please select a project first");
        assert!(work.flash().unwrap().is_error);

        work.select_next();
        work.open_status_dialog(now);
        let dialog = work.dialog_mut().unwrap();
        assert_eq!(dialog.view().title, "Add Status Update for Apollo");
        dialog.input_mut().insert_str("Kickoff done");
        let request = work.submit_dialog().unwrap();
        assert_eq!(
            request,
            WorkRequest::AddStatus(NewStatusUpdate {
                project_id: 1,
                content: "Kickoff done".into(),
                created_by: "User".into(),
            })
        );
        assert!(!work.has_dialog());
    }

    #[test]
    fn invalid_dialog_stays_open() {
        let mut work = loaded();
        work.open_project_dialog();
        assert!(work.submit_dialog().is_none());
        assert!(work.has_dialog());
        assert_eq!(
            work.dialog().unwrap().view().error,
            Some("Project name is required")
        );
        work.cancel_dialog();
        assert!(!work.has_dialog());
    }

    #[test]
    fn follow_ups_reload_affected_lists() {
        let mut work = loaded();
        let now = Instant::now();
        let follow = work.apply(
            WorkEvent::StatusAdded {
                project_id: 2,
                result: Err(ConsoleError::Network("down".into())),
            },
            now,
        );
        assert!(follow.is_empty());
        assert_eq!(work.flash().unwrap().text, "Failed to add status update");

        let follow = work.apply(
            WorkEvent::EmailProcessed(Ok(ProcessedEmail {
                email_id: 9,
                extracted_info: Default::default(),
                project: Some(project(3, "Mercury")),
                message: None,
            })),
            now,
        );
        assert_eq!(follow, vec![WorkRequest::LoadProjects]);
        let output = work.output();
        assert!(output[1].text.contains("Project: Not identified"));
        assert!(output[1].text.contains("People: None"));
    }

    #[test]
    fn flash_expires_after_three_seconds() {
        let mut work = WorkController::new();
        let now = Instant::now();
        work.apply(WorkEvent::ProjectCreated(Ok(project(4, "Vega"))), now);
        assert_eq!(work.projects().len(), 1);
        assert!(!work.tick(now + Duration::from_secs(2)));
        assert!(work.tick(now + FLASH_FOR));
        assert!(work.flash().is_none());
    }

    #[test]
    fn stale_query_answers_are_ignored() {
        let mut work = WorkController::new();
        work.query.set("first");
        work.submit_query();
        work.query.set("second");
        assert_eq!(work.submit_query(), Some(WorkRequest::Query("second".into())));

        let answer = |q: &str| QueryAnswer {
            query: q.into(),
            answer: format!("about {q}"),
            results: QueryResults {
                emails: vec![SearchHit {
                    content: "c".into(),
                    metadata: HitMetadata {
                        subject: Some("Kickoff".into()),
                        sender: Some("a@b.c".into()),
                        project_name: None,
                    },
                    similarity_score: 0.42,
                }],
                ..Default::default()
            },
        };
        work.apply(
            WorkEvent::Answered {
                query: "first".into(),
                result: Ok(answer("first")),
            },
            Instant::now(),
        );
        assert_eq!(work.view(), &WorkView::Querying("second".into()));

        work.apply(
            WorkEvent::Answered {
                query: "second".into(),
                result: Ok(answer("second")),
            },
            Instant::now(),
        );
        let output = work.output();
        assert_eq!(output[1].text, "about second");
        assert!(output
            .iter()
            .any(|e| e.text == "Kickoff\nFrom: a@b.c\nRelevance: 42%"));
        assert!(work.query.is_blank());
    }

    #[test]
    fn due_dates_round_up_to_whole_days() {
        let now = at(2024, 6, 1, 12);
        assert_eq!(days_until(at(2024, 6, 3, 12), now), 2);
        assert_eq!(days_until(at(2024, 6, 3, 13), now), 3);
        assert_eq!(days_until(at(2024, 6, 1, 18), now), 1);
        assert_eq!(days_until(at(2024, 5, 31, 12), now), -1);
    }
}
