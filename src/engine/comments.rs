//! `add-comment` and `remove-comment`.

use super::{ActionEngine, COMMENT_SCAN_LIMIT};
use crate::core::TaskReference;
use crate::tracker::{NewComment, Story, TrackerResult};

/// Append the marker on its own line so a later run can find the comment.
fn marked_text(text: &str, marker: Option<&str>) -> String {
    match marker {
        Some(marker) => format!("{text}\n{marker}\n"),
        None => text.to_string(),
    }
}

impl ActionEngine<'_> {
    /// First story among the task's earliest [`COMMENT_SCAN_LIMIT`] whose
    /// text contains `marker`.
    pub async fn find_comment(&self, task_id: &str, marker: &str) -> TrackerResult<Option<Story>> {
        let stories = self.client.list_stories(task_id, COMMENT_SCAN_LIMIT).await?;
        Ok(stories.into_iter().find(|story| story.text.contains(marker)))
    }

    /// Post `text` on every referenced task.
    ///
    /// With a marker, tasks that already carry a comment containing it are
    /// skipped. Returns the gids of the created comments.
    pub async fn add_comment(
        &self,
        references: &[TaskReference],
        marker: Option<&str>,
        text: &str,
        is_pinned: bool,
    ) -> Vec<String> {
        let comment = NewComment::new(marked_text(text, marker), is_pinned);
        let mut created = Vec::new();

        for reference in references {
            let task_id = reference.task_id.as_str();

            if let Some(marker) = marker {
                match self.find_comment(task_id, marker).await {
                    Ok(Some(existing)) => {
                        self.host.info(&format!("found existing comment {}", existing.gid));
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.host.error(&format!("Failed to list comments of task {task_id}: {e}"));
                        continue;
                    }
                }
            }

            match self.client.add_comment(task_id, &comment).await {
                Ok(story) => {
                    self.host.info(&format!("added comment {} to task {}", story.gid, task_id));
                    created.push(story.gid);
                }
                Err(e) => self.host.error(&format!("Failed to comment on task {task_id}: {e}")),
            }
        }

        created
    }

    /// Delete the comment containing `marker` from every referenced task.
    /// Returns the gids of the deleted comments.
    pub async fn remove_comment(&self, references: &[TaskReference], marker: &str) -> Vec<String> {
        let mut removed = Vec::new();

        for reference in references {
            let task_id = reference.task_id.as_str();
            let comment = match self.find_comment(task_id, marker).await {
                Ok(Some(comment)) => comment,
                Ok(None) => continue,
                Err(e) => {
                    self.host.error(&format!("Failed to list comments of task {task_id}: {e}"));
                    continue;
                }
            };

            self.host.info(&format!("removing comment {}", comment.gid));
            match self.client.delete_story(&comment.gid).await {
                Ok(()) => removed.push(comment.gid),
                Err(e) => {
                    self.host.error(&format!("Failed to remove comment {}: {}", comment.gid, e));
                }
            }
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryTracker, RecordingHost, Write};

    fn tracker_with_tasks(ids: &[&str]) -> InMemoryTracker {
        let tracker = InMemoryTracker::new();
        for id in ids {
            tracker.insert_task(InMemoryTracker::task(id));
        }
        tracker
    }

    #[test]
    fn test_marked_text() {
        assert_eq!(marked_text("hello", Some("<!-- pr-1 -->")), "hello\n<!-- pr-1 -->\n");
        assert_eq!(marked_text("hello", None), "hello");
    }

    #[tokio::test]
    async fn test_add_comment_is_idempotent_by_marker() {
        let tracker = tracker_with_tasks(&["1"]);
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);
        let refs = vec![TaskReference::new("1", false)];

        let first = engine.add_comment(&refs, Some("pr-42"), "rad stuff", true).await;
        assert_eq!(first.len(), 1);

        let second = engine.add_comment(&refs, Some("pr-42"), "rad stuff", true).await;
        assert!(second.is_empty());

        assert_eq!(tracker.stories("1").len(), 1);
        assert_eq!(
            tracker.writes(),
            vec![Write::AddComment {
                task_id: "1".to_string(),
                text: "rad stuff\npr-42\n".to_string(),
                is_pinned: true
            }]
        );
    }

    #[tokio::test]
    async fn test_add_comment_without_marker_always_posts() {
        let tracker = tracker_with_tasks(&["1"]);
        tracker.add_story("1", "s1", "rad stuff");
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);

        let refs = [TaskReference::new("1", false)];
        let created = engine.add_comment(&refs, None, "rad stuff", false).await;
        assert_eq!(created.len(), 1);
        assert_eq!(tracker.stories("1").len(), 2);
    }

    #[tokio::test]
    async fn test_add_comment_continues_after_failure() {
        let tracker = tracker_with_tasks(&["2"]);
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);
        let refs = vec![TaskReference::new("missing", false), TaskReference::new("2", false)];

        let created = engine.add_comment(&refs, Some("marker"), "hi", false).await;
        assert_eq!(created.len(), 1);
        assert_eq!(host.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_add_comment_write_failure_is_not_listed() {
        let tracker = tracker_with_tasks(&["1"]);
        tracker.fail_writes();
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);

        let refs = [TaskReference::new("1", false)];
        let created = engine.add_comment(&refs, None, "hi", false).await;
        assert!(created.is_empty());
        assert_eq!(host.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_comment() {
        let tracker = tracker_with_tasks(&["1", "2"]);
        tracker.add_story("1", "s1", "unrelated");
        tracker.add_story("1", "s2", "hello\npr-42\n");
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);
        let refs = vec![TaskReference::new("1", false), TaskReference::new("2", false)];

        let removed = engine.remove_comment(&refs, "pr-42").await;
        assert_eq!(removed, vec!["s2".to_string()]);
        assert_eq!(tracker.stories("1").len(), 1);

        // A second run finds nothing to remove.
        assert!(engine.remove_comment(&refs, "pr-42").await.is_empty());
        assert_eq!(tracker.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_find_comment_first_match_wins() {
        let tracker = tracker_with_tasks(&["1"]);
        tracker.add_story("1", "s1", "marker one");
        tracker.add_story("1", "s2", "marker two");
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);

        let found = engine.find_comment("1", "marker").await.unwrap().unwrap();
        assert_eq!(found.gid, "s1");
    }

    #[tokio::test]
    async fn test_find_comment_scan_is_bounded() {
        let tracker = tracker_with_tasks(&["1"]);
        for i in 0..COMMENT_SCAN_LIMIT {
            tracker.add_story("1", &format!("s{i}"), "noise");
        }
        tracker.add_story("1", "late", "marker");
        let host = RecordingHost::new();
        let engine = ActionEngine::new(&tracker, &host);

        assert!(engine.find_comment("1", "marker").await.unwrap().is_none());
    }
}
