//! `complete-task`.

use super::ActionEngine;
use crate::core::TaskReference;
use crate::tracker::TaskUpdate;

impl ActionEngine<'_> {
    /// Set the completion state of every reference flagged close-on-merge.
    /// Returns the ids of the updated tasks.
    pub async fn complete_tasks(
        &self,
        references: &[TaskReference],
        is_complete: bool,
    ) -> Vec<String> {
        let update = TaskUpdate::completed(is_complete);
        let label = if is_complete { "complete" } else { "incomplete" };
        let mut updated = Vec::new();

        for reference in references.iter().filter(|r| r.close_on_merge) {
            let task_id = &reference.task_id;
            self.host.info(&format!("marking task {task_id} {label}"));
            match self.client.update_task(task_id, &update).await {
                Ok(()) => updated.push(task_id.clone()),
                Err(e) => self.host.error(&format!("Failed to update task {task_id}: {e}")),
            }
        }

        updated
    }
}
