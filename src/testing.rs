//! In-memory fakes for the capability traits, shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::dispatch::Backends;
use crate::host::{
    CommitStatus, Host, PullRequestContext, RepositoryRef, StatusError, StatusReporter,
    StatusResult,
};
use crate::tracker::{
    CustomField, CustomFieldType, CustomFieldValue, EnumOption, Membership, NewComment,
    ProjectRef, RemoteTask, Section, Story, TaskClient, TaskUpdate, TrackerError, TrackerResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Host that records everything the run reports.
#[derive(Debug, Default)]
pub struct RecordingHost {
    inputs: HashMap<String, String>,
    pull_request: Option<PullRequestContext>,
    repository: Option<RepositoryRef>,
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    outputs: Mutex<Vec<(String, String)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_pull_request(mut self, body: &str) -> Self {
        self.pull_request = Some(PullRequestContext {
            number: Some(1),
            body: body.to_string(),
            head_sha: "abc123".to_string(),
        });
        self
    }

    pub fn with_repository(mut self, owner: &str, repo: &str) -> Self {
        self.repository = Some(RepositoryRef::new(owner, repo));
        self
    }

    pub fn infos(&self) -> Vec<String> {
        lock(&self.infos).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    pub fn outputs(&self) -> Vec<(String, String)> {
        lock(&self.outputs).clone()
    }

    pub fn failure(&self) -> Option<String> {
        lock(&self.failure).clone()
    }
}

impl Host for RecordingHost {
    fn input(&self, name: &str) -> Option<String> {
        self.inputs.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn info(&self, message: &str) {
        lock(&self.infos).push(message.to_string());
    }

    fn warning(&self, message: &str) {
        lock(&self.warnings).push(message.to_string());
    }

    fn error(&self, message: &str) {
        lock(&self.errors).push(message.to_string());
    }

    fn set_failed(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    fn set_output(&self, name: &str, value: &str) {
        lock(&self.outputs).push((name.to_string(), value.to_string()));
    }

    fn pull_request(&self) -> Option<&PullRequestContext> {
        self.pull_request.as_ref()
    }

    fn repository(&self) -> Option<&RepositoryRef> {
        self.repository.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// A mutation that reached the in-memory tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    AddComment { task_id: String, text: String, is_pinned: bool },
    DeleteStory { story_gid: String },
    UpdateTask { task_id: String, update: TaskUpdate },
    AddToSection { section_gid: String, task_id: String },
}

#[derive(Debug, Default)]
struct TrackerState {
    tasks: BTreeMap<String, RemoteTask>,
    sections: HashMap<String, Vec<Section>>,
    stories: HashMap<String, Vec<Story>>,
    writes: Vec<Write>,
    next_story: u64,
    failing_fetches: HashSet<String>,
    failing_writes: bool,
}

/// Builder for tasks stored in an [`InMemoryTracker`].
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: RemoteTask,
}

impl TaskBuilder {
    pub fn completed(mut self, completed: bool) -> Self {
        self.task.completed = completed;
        self
    }

    /// Add a project membership, optionally placed in a section.
    pub fn in_project(mut self, gid: &str, name: &str, section: Option<(&str, &str)>) -> Self {
        let project = ProjectRef { gid: gid.to_string(), name: name.to_string() };
        self.task.memberships.push(Membership {
            project: project.clone(),
            section: section
                .map(|(gid, name)| Section { gid: gid.to_string(), name: name.to_string() }),
        });
        self.task.projects.push(project);
        self
    }

    pub fn with_field(mut self, field: CustomField) -> Self {
        self.task.custom_fields.push(field);
        self
    }
}

impl From<TaskBuilder> for RemoteTask {
    fn from(builder: TaskBuilder) -> Self {
        builder.task
    }
}

/// A text custom field.
pub fn text_field(gid: &str, name: &str, value: Option<&str>) -> CustomField {
    CustomField {
        gid: gid.to_string(),
        name: name.to_string(),
        field_type: CustomFieldType::Text,
        display_value: value.map(str::to_string),
        enum_options: Vec::new(),
    }
}

/// A number custom field.
pub fn number_field(gid: &str, name: &str, value: Option<&str>) -> CustomField {
    CustomField { field_type: CustomFieldType::Number, ..text_field(gid, name, value) }
}

/// A select field with `(gid, name)` options.
pub fn enum_field(
    gid: &str,
    name: &str,
    field_type: CustomFieldType,
    options: &[(&str, &str)],
    value: Option<&str>,
) -> CustomField {
    CustomField {
        gid: gid.to_string(),
        name: name.to_string(),
        field_type,
        display_value: value.map(str::to_string),
        enum_options: options
            .iter()
            .map(|(gid, name)| EnumOption { gid: (*gid).to_string(), name: (*name).to_string() })
            .collect(),
    }
}

/// Task tracker held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a task with no projects or fields.
    pub fn task(gid: &str) -> TaskBuilder {
        TaskBuilder {
            task: RemoteTask {
                gid: gid.to_string(),
                completed: false,
                projects: Vec::new(),
                memberships: Vec::new(),
                custom_fields: Vec::new(),
            },
        }
    }

    pub fn insert_task(&self, task: impl Into<RemoteTask>) {
        let task = task.into();
        lock(&self.state).tasks.insert(task.gid.clone(), task);
    }

    /// Register the sections of a project as `(gid, name)` pairs.
    pub fn add_project_sections(&self, project_gid: &str, sections: &[(&str, &str)]) {
        lock(&self.state).sections.insert(
            project_gid.to_string(),
            sections
                .iter()
                .map(|(gid, name)| Section { gid: (*gid).to_string(), name: (*name).to_string() })
                .collect(),
        );
    }

    pub fn add_story(&self, task_id: &str, gid: &str, text: &str) {
        lock(&self.state)
            .stories
            .entry(task_id.to_string())
            .or_default()
            .push(Story { gid: gid.to_string(), text: text.to_string() });
    }

    /// Make `fetch_task` fail with a server error for `task_id`.
    pub fn fail_fetch(&self, task_id: &str) {
        lock(&self.state).failing_fetches.insert(task_id.to_string());
    }

    /// Make every mutation fail with a server error.
    pub fn fail_writes(&self) {
        lock(&self.state).failing_writes = true;
    }

    pub fn writes(&self) -> Vec<Write> {
        lock(&self.state).writes.clone()
    }

    pub fn stories(&self, task_id: &str) -> Vec<Story> {
        lock(&self.state).stories.get(task_id).cloned().unwrap_or_default()
    }

    pub fn task_snapshot(&self, task_id: &str) -> Option<RemoteTask> {
        lock(&self.state).tasks.get(task_id).cloned()
    }

    fn server_error() -> TrackerError {
        TrackerError::Api { status: 500, message: "simulated failure".to_string() }
    }

    fn begin_write(&self, write: Write) -> TrackerResult<MutexGuard<'_, TrackerState>> {
        let mut state = lock(&self.state);
        if state.failing_writes {
            return Err(Self::server_error());
        }
        state.writes.push(write);
        Ok(state)
    }
}

fn display_of(field: &CustomField, value: &CustomFieldValue) -> String {
    let option_name = |gid: &str| {
        field.enum_options.iter().find(|o| o.gid == gid).map(|o| o.name.clone()).unwrap_or_default()
    };
    match value {
        CustomFieldValue::Text(text) => text.clone(),
        CustomFieldValue::Number(number) => number.to_string(),
        CustomFieldValue::EnumOption(gid) => option_name(gid),
        CustomFieldValue::EnumOptions(gids) => {
            gids.iter().map(|gid| option_name(gid)).collect::<Vec<_>>().join(", ")
        }
    }
}

#[async_trait]
impl TaskClient for InMemoryTracker {
    async fn fetch_task(&self, task_id: &str) -> TrackerResult<RemoteTask> {
        let state = lock(&self.state);
        if state.failing_fetches.contains(task_id) {
            return Err(Self::server_error());
        }
        state.tasks.get(task_id).cloned().ok_or_else(|| TrackerError::NotFound(task_id.to_string()))
    }

    async fn list_sections(&self, project_gid: &str) -> TrackerResult<Vec<Section>> {
        Ok(lock(&self.state).sections.get(project_gid).cloned().unwrap_or_default())
    }

    async fn list_stories(&self, task_id: &str, limit: usize) -> TrackerResult<Vec<Story>> {
        let state = lock(&self.state);
        if !state.tasks.contains_key(task_id) {
            return Err(TrackerError::NotFound(task_id.to_string()));
        }
        Ok(state
            .stories
            .get(task_id)
            .map(|stories| stories.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> TrackerResult<Story> {
        let mut state = self.begin_write(Write::AddComment {
            task_id: task_id.to_string(),
            text: comment.text.clone(),
            is_pinned: comment.is_pinned,
        })?;
        state.next_story += 1;
        let story =
            Story { gid: format!("story-{}", state.next_story), text: comment.text.clone() };
        state.stories.entry(task_id.to_string()).or_default().push(story.clone());
        Ok(story)
    }

    async fn delete_story(&self, story_gid: &str) -> TrackerResult<()> {
        let mut state =
            self.begin_write(Write::DeleteStory { story_gid: story_gid.to_string() })?;
        for stories in state.stories.values_mut() {
            if let Some(index) = stories.iter().position(|s| s.gid == story_gid) {
                stories.remove(index);
                return Ok(());
            }
        }
        Err(TrackerError::NotFound(story_gid.to_string()))
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> TrackerResult<()> {
        let mut state = self.begin_write(Write::UpdateTask {
            task_id: task_id.to_string(),
            update: update.clone(),
        })?;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TrackerError::NotFound(task_id.to_string()))?;

        if let Some(completed) = update.completed {
            task.completed = completed;
        }
        for (gid, value) in &update.custom_fields {
            let field = task
                .custom_fields
                .iter_mut()
                .find(|f| &f.gid == gid)
                .ok_or_else(|| TrackerError::NotFound(gid.clone()))?;
            field.display_value = Some(display_of(field, value));
        }
        Ok(())
    }

    async fn add_task_to_section(&self, section_gid: &str, task_id: &str) -> TrackerResult<()> {
        let mut state = self.begin_write(Write::AddToSection {
            section_gid: section_gid.to_string(),
            task_id: task_id.to_string(),
        })?;
        let (project_gid, section) = state
            .sections
            .iter()
            .find_map(|(project, sections)| {
                sections.iter().find(|s| s.gid == section_gid).map(|s| (project.clone(), s.clone()))
            })
            .ok_or_else(|| TrackerError::NotFound(section_gid.to_string()))?;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TrackerError::NotFound(task_id.to_string()))?;
        let membership = task
            .memberships
            .iter_mut()
            .find(|m| m.project.gid == project_gid)
            .ok_or_else(|| TrackerError::NotFound(project_gid.clone()))?;
        membership.section = Some(section);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Commit statuses
// ---------------------------------------------------------------------------

/// Status reporter that records every status it is asked to create.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatus {
    created: Arc<Mutex<Vec<(RepositoryRef, String, CommitStatus)>>>,
    failing: bool,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter whose every call fails.
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn created(&self) -> Vec<(RepositoryRef, String, CommitStatus)> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingStatus {
    async fn create_status(
        &self,
        repository: &RepositoryRef,
        sha: &str,
        status: &CommitStatus,
    ) -> StatusResult<()> {
        if self.failing {
            return Err(StatusError::Api { status: 422, message: "simulated failure".to_string() });
        }
        lock(&self.created).push((repository.clone(), sha.to_string(), status.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Backends that hand out the in-memory fakes.
#[derive(Debug, Clone, Default)]
pub struct FakeBackends {
    pub tracker: InMemoryTracker,
    pub status: RecordingStatus,
    /// Reject every tracker token.
    pub reject_token: bool,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl FakeBackends {
    pub fn new(tracker: InMemoryTracker) -> Self {
        Self { tracker, ..Self::default() }
    }

    /// Tracker tokens the run connected with.
    pub fn tokens(&self) -> Vec<String> {
        lock(&self.tokens).clone()
    }
}

#[async_trait]
impl Backends for FakeBackends {
    async fn tracker(&self, token: &str) -> TrackerResult<Box<dyn TaskClient>> {
        lock(&self.tokens).push(token.to_string());
        if self.reject_token {
            return Err(TrackerError::Unauthorized);
        }
        Ok(Box::new(self.tracker.clone()))
    }

    fn statuses(&self, _host_token: &str) -> StatusResult<Box<dyn StatusReporter>> {
        Ok(Box::new(self.status.clone()))
    }
}
