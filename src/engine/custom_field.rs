//! `update-custom-field` and the deprecated `change-task-progress`.

use super::{ActionEngine, TASK_PROGRESS_FIELD};
use crate::core::TaskReference;
use crate::tracker::{CustomField, CustomFieldType, CustomFieldValue, TaskUpdate, TrackerError};

const DEPRECATION_WARNING: &str = "Setting the custom Task Progress field is deprecated!\n\
    Instead, move the task to the appropriate section using the `move-section` action.";

/// Why a custom field could not be written for one task.
#[derive(Debug, thiserror::Error)]
pub enum FieldUpdateError {
    #[error("Enum option \"{option}\" not found for field \"{field}\"")]
    EnumOptionNotFound { field: String, option: String },

    #[error("\"{content}\" is not a valid number for field \"{field}\"")]
    InvalidNumber { field: String, content: String },

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// What happened to one task's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    Updated,
    /// The field already showed the requested content.
    Unchanged,
    /// The task has no field with that name.
    FieldMissing,
}

/// Translate user-facing content into the value the field type expects.
///
/// Select fields take option names; a multi-select takes a comma-separated
/// list of them.
pub fn resolve_value(
    field: &CustomField,
    content: &str,
) -> Result<CustomFieldValue, FieldUpdateError> {
    let option_gid = |name: &str| {
        field.enum_option(name).map(|option| option.gid.clone()).ok_or_else(|| {
            FieldUpdateError::EnumOptionNotFound {
                field: field.name.clone(),
                option: name.to_string(),
            }
        })
    };

    match field.field_type {
        CustomFieldType::Enum => option_gid(content).map(CustomFieldValue::EnumOption),
        CustomFieldType::MultiEnum => content
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(option_gid)
            .collect::<Result<Vec<_>, _>>()
            .map(CustomFieldValue::EnumOptions),
        CustomFieldType::Number => {
            content.trim().parse::<f64>().map(CustomFieldValue::Number).map_err(|_| {
                FieldUpdateError::InvalidNumber {
                    field: field.name.clone(),
                    content: content.to_string(),
                }
            })
        }
        CustomFieldType::Text | CustomFieldType::Other => {
            Ok(CustomFieldValue::Text(content.to_string()))
        }
    }
}

impl ActionEngine<'_> {
    /// Write `content` into the named field of one task unless it already
    /// shows that content.
    pub async fn set_custom_field(
        &self,
        task_id: &str,
        field_name: &str,
        content: &str,
    ) -> Result<FieldUpdate, FieldUpdateError> {
        let task = self.client.fetch_task(task_id).await?;

        let field = match task.custom_field(field_name) {
            Some(field) => field,
            None => {
                self.host
                    .info(&format!("The custom field \"{field_name}\" does not exist in project"));
                return Ok(FieldUpdate::FieldMissing);
            }
        };

        if field.display_value.as_deref() == Some(content) {
            tracing::debug!(task = task_id, field = field_name, "custom field already up to date");
            return Ok(FieldUpdate::Unchanged);
        }

        let value = resolve_value(field, content)?;
        let update = TaskUpdate::default().with_custom_field(field.gid.clone(), value);
        self.client.update_task(task_id, &update).await?;

        self.host.info(&format!("Custom fields {field_name} updated to: {content}"));
        Ok(FieldUpdate::Updated)
    }

    /// Set the named field on every referenced task. Returns the ids of the
    /// tasks handled without error.
    pub async fn update_custom_field(
        &self,
        references: &[TaskReference],
        field_name: &str,
        content: &str,
    ) -> Vec<String> {
        let mut processed = Vec::new();

        for reference in references {
            match self.set_custom_field(&reference.task_id, field_name, content).await {
                Ok(_) => processed.push(reference.task_id.clone()),
                Err(e) => self.host.error(&format!(
                    "Error updating custom field {} on task {}: {}",
                    field_name, reference.task_id, e
                )),
            }
        }

        processed
    }

    /// Deprecated: set "Task Progress" on close-on-merge references.
    pub async fn change_task_progress(
        &self,
        references: &[TaskReference],
        state: &str,
    ) -> Vec<String> {
        self.host.warning(DEPRECATION_WARNING);

        let closing: Vec<TaskReference> =
            references.iter().filter(|r| r.close_on_merge).cloned().collect();
        self.update_custom_field(&closing, TASK_PROGRESS_FIELD, state).await
    }
}
