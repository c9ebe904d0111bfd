//! `move-section`.

use futures::future::join_all;

use super::ActionEngine;
use crate::core::{MoveTarget, TaskReference};
use crate::tracker::{RemoteTask, TrackerResult};

/// Result of resolving one [`MoveTarget`] for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The task is not a member of the target project.
    ProjectNotFound,
    /// The project has no section with the target name.
    SectionNotFound,
    /// The task already sits in the target section; nothing was written.
    AlreadyInSection,
    Moved,
    /// A tracker call failed.
    Failed,
}

impl ActionEngine<'_> {
    /// Move every referenced task to every target.
    ///
    /// A reference is listed once its task could be fetched, whatever
    /// happened to the individual targets.
    pub async fn move_sections(
        &self,
        references: &[TaskReference],
        targets: &[MoveTarget],
    ) -> Vec<String> {
        let mut processed = Vec::new();

        for reference in references {
            match self.move_task(&reference.task_id, targets).await {
                Ok(_) => processed.push(reference.task_id.clone()),
                Err(e) => {
                    self.host.error(&format!("Failed to fetch task {}: {}", reference.task_id, e));
                }
            }
        }

        processed
    }

    /// Fetch one task and resolve all targets for it concurrently.
    ///
    /// Outcomes are returned in target order.
    pub async fn move_task(
        &self,
        task_id: &str,
        targets: &[MoveTarget],
    ) -> TrackerResult<Vec<MoveOutcome>> {
        let task = self.client.fetch_task(task_id).await?;
        let moves = targets.iter().map(|target| self.move_to_target(&task, target));
        Ok(join_all(moves).await)
    }

    async fn move_to_target(&self, task: &RemoteTask, target: &MoveTarget) -> MoveOutcome {
        let project = match task.project_named(&target.project) {
            Some(project) => project,
            None => {
                self.host
                    .info(&format!("This task does not exist in \"{}\" project", target.project));
                return MoveOutcome::ProjectNotFound;
            }
        };

        let sections = match self.client.list_sections(&project.gid).await {
            Ok(sections) => sections,
            Err(e) => {
                self.host.error(&format!(
                    "Failed to list sections of \"{}\": {}",
                    target.project, e
                ));
                return MoveOutcome::Failed;
            }
        };

        let section = match sections.into_iter().find(|section| section.name == target.section) {
            Some(section) => section,
            None => {
                self.host.error(&format!("Asana section {} not found.", target.section));
                return MoveOutcome::SectionNotFound;
            }
        };

        if task.section_in(&project.gid).is_some_and(|current| current.gid == section.gid) {
            self.host.info(&format!("Already in: {target}"));
            return MoveOutcome::AlreadyInSection;
        }

        match self.client.add_task_to_section(&section.gid, &task.gid).await {
            Ok(()) => {
                self.host.info(&format!("Moved to: {target}"));
                MoveOutcome::Moved
            }
            Err(e) => {
                self.host.error(&format!("Failed to move task {} to {}: {}", task.gid, target, e));
                MoveOutcome::Failed
            }
        }
    }
}
