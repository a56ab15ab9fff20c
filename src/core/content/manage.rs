use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::ContentPipeline;
use crate::core::error::{LauncherError, LauncherResult, OperationResult};
use crate::core::instance::{ContentCategory, Instance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub file_name: String,
    pub enabled: bool,
    /// False when the file was already where it belonged.
    pub moved: bool,
}

/// A bare file name; anything that could leave the content folder is refused.
fn checked_name(file_name: &str) -> LauncherResult<&str> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(file_name),
        _ => Err(LauncherError::Unsupported(format!(
            "content file name {:?}",
            file_name
        ))),
    }
}

fn locations(instance: &Instance, category: ContentCategory, file_name: &str) -> (PathBuf, PathBuf) {
    (
        instance.content_dir(category).join(file_name),
        instance.disabled_dir(category).join(file_name),
    )
}

impl ContentPipeline<'_> {
    /// Move a file between its content folder and the `disabled` sibling.
    pub async fn toggle(
        &self,
        instance_id: &str,
        category: ContentCategory,
        file_name: &str,
        enabled: bool,
    ) -> OperationResult<ToggleOutcome> {
        let result = self.try_toggle(instance_id, category, file_name, enabled).await;
        self.finish("toggle", Some(instance_id), result)
    }

    async fn try_toggle(
        &self,
        instance_id: &str,
        category: ContentCategory,
        file_name: &str,
        enabled: bool,
    ) -> LauncherResult<ToggleOutcome> {
        let file_name = checked_name(file_name)?;
        let instance = self.catalog.get(instance_id).await?;
        let (active, disabled) = locations(&instance, category, file_name);
        let (from, to) = if enabled {
            (disabled, active)
        } else {
            (active, disabled)
        };

        let moved = if to.exists() {
            false
        } else if from.exists() {
            if let Some(parent) = to.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LauncherError::io(parent, e))?;
            }
            tokio::fs::rename(&from, &to)
                .await
                .map_err(|e| LauncherError::io(&from, e))?;
            true
        } else {
            return Err(LauncherError::NotFound {
                kind: "content file",
                id: file_name.to_string(),
            });
        };

        let name = file_name.to_string();
        self.catalog
            .update(
                instance_id,
                Box::new(move |i| {
                    if let Some(record) = i.content_mut(category).iter_mut().find(|m| m.file_name == name) {
                        record.enabled = enabled;
                    }
                }),
            )
            .await?;

        info!(
            "{} {} in {}",
            if enabled { "Enabled" } else { "Disabled" },
            file_name,
            instance_id
        );
        Ok(ToggleOutcome {
            file_name: file_name.to_string(),
            enabled,
            moved,
        })
    }

    /// Delete a content file, enabled or not, together with its record.
    pub async fn remove_content(
        &self,
        instance_id: &str,
        category: ContentCategory,
        file_name: &str,
    ) -> OperationResult<()> {
        let result = self.try_remove(instance_id, category, file_name).await;
        self.finish("remove", Some(instance_id), result)
    }

    async fn try_remove(
        &self,
        instance_id: &str,
        category: ContentCategory,
        file_name: &str,
    ) -> LauncherResult<()> {
        let file_name = checked_name(file_name)?;
        let instance = self.catalog.get(instance_id).await?;
        let (active, disabled) = locations(&instance, category, file_name);

        let mut deleted = false;
        for path in [active, disabled] {
            let result = if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else if path.exists() {
                tokio::fs::remove_file(&path).await
            } else {
                continue;
            };
            result.map_err(|e| LauncherError::io(&path, e))?;
            deleted = true;
        }

        let had_record = instance
            .content(category)
            .iter()
            .any(|m| m.file_name == file_name);
        if !deleted && !had_record {
            return Err(LauncherError::NotFound {
                kind: "content file",
                id: file_name.to_string(),
            });
        }

        let name = file_name.to_string();
        self.catalog
            .update(
                instance_id,
                Box::new(move |i| i.content_mut(category).retain(|m| m.file_name != name)),
            )
            .await?;
        info!("Removed {} from {}", file_name, instance_id);
        Ok(())
    }
}
