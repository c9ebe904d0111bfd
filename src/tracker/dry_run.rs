//! Dry-run decorator: reads go to the wrapped client, writes are only logged.

use async_trait::async_trait;

use super::{NewComment, RemoteTask, Section, Story, TaskClient, TaskUpdate, TrackerResult};

/// Gid reported for comments that were not really created.
pub const DRY_RUN_GID: &str = "dry-run";

/// Wraps a [`TaskClient`] so that no mutation reaches the tracker.
#[derive(Debug, Clone)]
pub struct DryRunClient<C> {
    inner: C,
}

impl<C> DryRunClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: TaskClient> TaskClient for DryRunClient<C> {
    async fn fetch_task(&self, task_id: &str) -> TrackerResult<RemoteTask> {
        self.inner.fetch_task(task_id).await
    }

    async fn list_sections(&self, project_gid: &str) -> TrackerResult<Vec<Section>> {
        self.inner.list_sections(project_gid).await
    }

    async fn list_stories(&self, task_id: &str, limit: usize) -> TrackerResult<Vec<Story>> {
        self.inner.list_stories(task_id, limit).await
    }

    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> TrackerResult<Story> {
        tracing::info!(task = task_id, pinned = comment.is_pinned, "[dry run] would add comment");
        Ok(Story { gid: DRY_RUN_GID.to_string(), text: comment.text.clone() })
    }

    async fn delete_story(&self, story_gid: &str) -> TrackerResult<()> {
        tracing::info!(story = story_gid, "[dry run] would delete story");
        Ok(())
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> TrackerResult<()> {
        tracing::info!(task = task_id, ?update, "[dry run] would update task");
        Ok(())
    }

    async fn add_task_to_section(&self, section_gid: &str, task_id: &str) -> TrackerResult<()> {
        tracing::info!(task = task_id, section = section_gid, "[dry run] would move task");
        Ok(())
    }
}
