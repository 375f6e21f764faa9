use std::fmt;
use std::str::FromStr;

use box_models::schema::{FOLDER_PAGE_LIMIT, ROOT_FOLDER_ID};
use box_models::{CreateFolderRequest, FolderEntry, Page, ParentRef, UpdateFolderRequest};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BoxControlPlane, ControlError, ControlResult, require_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderAction {
    Create,
    Delete,
    Update,
}

impl fmt::Display for FolderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
        })
    }
}

impl FromStr for FolderAction {
    type Err = ControlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "update" => Ok(Self::Update),
            _ => Err(ControlError::invalid(format!(
                "Invalid action: {value}. Must be one of: create, delete, update."
            ))),
        }
    }
}

/// Input for creating, deleting or updating a folder.
///
/// Blank strings count as absent, so callers may send `""` for unused fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManageFolderRequest {
    pub action: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderOutcome {
    pub action: FolderAction,
    pub folder_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl BoxControlPlane {
    /// Lists a folder's entries; recursive listings walk sub-folders depth first,
    /// each folder followed by its own content.
    ///
    /// # Errors
    /// Returns `ControlError` if any page cannot be listed.
    pub async fn list_folder_content(
        &self,
        folder_id: &str,
        recursive: bool,
    ) -> ControlResult<Vec<FolderEntry>> {
        require_id("folder_id", folder_id)?;
        let mut entries = Vec::new();
        self.collect_folder(folder_id.to_string(), recursive, &mut entries)
            .await?;
        debug!(folder_id, count = entries.len(), "listed folder content");
        Ok(entries)
    }

    fn collect_folder<'a>(
        &'a self,
        folder_id: String,
        recursive: bool,
        entries: &'a mut Vec<FolderEntry>,
    ) -> BoxFuture<'a, ControlResult<()>> {
        async move {
            let mut page = Page::new(None, Some(FOLDER_PAGE_LIMIT));
            loop {
                let items = self.client.list_folder_items(&folder_id, &page).await?;
                let next = items.next_page_marker().map(str::to_string);
                for item in items.entries {
                    let descend = recursive && item.is_folder();
                    let child_id = item.id.clone();
                    entries.push(FolderEntry::from(item));
                    if descend {
                        self.collect_folder(child_id, true, entries).await?;
                    }
                }
                match next {
                    Some(marker) => page.marker = Some(marker),
                    None => return Ok(()),
                }
            }
        }
        .boxed()
    }

    /// Creates, deletes or updates a folder.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` for an unknown action or missing
    /// required fields, before any remote call.
    pub async fn manage_folder(&self, request: ManageFolderRequest) -> ControlResult<FolderOutcome> {
        let action: FolderAction = request.action.parse()?;
        let folder_id = present(request.folder_id);
        let name = present(request.name);
        let parent_id = present(request.parent_id);
        let description = present(request.description);

        match action {
            FolderAction::Create => {
                let name = name.ok_or_else(|| {
                    ControlError::invalid("name is required for create action")
                })?;
                let create = CreateFolderRequest {
                    name,
                    parent: ParentRef {
                        id: parent_id.unwrap_or_else(|| ROOT_FOLDER_ID.to_string()),
                    },
                };
                let folder = self.client.create_folder(&create).await?;
                let name = folder.name.clone().unwrap_or(create.name);
                info!(folder_id = %folder.id, "folder created");
                Ok(FolderOutcome {
                    action,
                    message: format!(
                        "Folder created successfully. Folder ID: {}, Name: {name}",
                        folder.id
                    ),
                    folder_id: folder.id,
                    name: Some(name),
                })
            }
            FolderAction::Delete => {
                let folder_id = folder_id.ok_or_else(|| {
                    ControlError::invalid("folder_id is required for delete action")
                })?;
                self.client.delete_folder(&folder_id, request.recursive).await?;
                info!(folder_id = %folder_id, recursive = request.recursive, "folder deleted");
                Ok(FolderOutcome {
                    action,
                    message: format!("Folder with ID {folder_id} deleted successfully"),
                    folder_id,
                    name: None,
                })
            }
            FolderAction::Update => {
                let folder_id = folder_id.ok_or_else(|| {
                    ControlError::invalid("folder_id is required for update action")
                })?;
                let update = UpdateFolderRequest {
                    name,
                    description,
                    parent: parent_id.map(|id| ParentRef { id }),
                };
                if update.is_empty() {
                    return Err(ControlError::invalid(
                        "update needs at least one of name, description or parent_id",
                    ));
                }
                let folder = self.client.update_folder(&folder_id, &update).await?;
                let name = folder.name.clone().unwrap_or_default();
                Ok(FolderOutcome {
                    action,
                    message: format!(
                        "Folder updated successfully. Folder ID: {}, Name: {name}",
                        folder.id
                    ),
                    folder_id: folder.id,
                    name: Some(name),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::RecordingApi;

    fn manage(action: &str) -> ManageFolderRequest {
        ManageFolderRequest {
            action: action.to_string(),
            ..ManageFolderRequest::default()
        }
    }

    #[tokio::test]
    async fn unknown_action_never_reaches_the_client() {
        let api = Arc::new(RecordingApi::new());
        let err = BoxControlPlane::new(api.clone())
            .manage_folder(manage("rename"))
            .await
            .expect_err("invalid action");
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().starts_with("Invalid action: rename."));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn create_defaults_to_root_and_accepts_any_case() {
        let api = Arc::new(
            RecordingApi::new().respond("create_folder", json!({"type": "folder", "id": "31", "name": "Plans"})),
        );
        let outcome = BoxControlPlane::new(api.clone())
            .manage_folder(ManageFolderRequest {
                name: Some("Plans".to_string()),
                parent_id: Some(String::new()),
                ..manage("CREATE")
            })
            .await
            .expect("create");
        assert_eq!(outcome.message, "Folder created successfully. Folder ID: 31, Name: Plans");
        assert_eq!(
            api.calls_to("create_folder")[0],
            json!({"name": "Plans", "parent": {"id": "0"}})
        );
    }

    #[tokio::test]
    async fn delete_and_update_require_a_folder_id() {
        let api = Arc::new(RecordingApi::new());
        let control = BoxControlPlane::new(api.clone());
        for action in ["delete", "update"] {
            let err = control
                .manage_folder(ManageFolderRequest {
                    folder_id: Some("  ".to_string()),
                    ..manage(action)
                })
                .await
                .expect_err("missing id");
            assert_eq!(err.to_string(), format!("folder_id is required for {action} action"));
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_forwards_the_recursive_flag() {
        let api = Arc::new(RecordingApi::new().respond("delete_folder", serde_json::Value::Null));
        let outcome = BoxControlPlane::new(api.clone())
            .manage_folder(ManageFolderRequest {
                folder_id: Some("77".to_string()),
                recursive: true,
                ..manage("delete")
            })
            .await
            .expect("delete");
        assert_eq!(outcome.message, "Folder with ID 77 deleted successfully");
        assert_eq!(
            api.calls_to("delete_folder")[0],
            json!({"folder_id": "77", "recursive": true})
        );
    }

    #[tokio::test]
    async fn recursive_listing_is_depth_first_and_paged() {
        let api = Arc::new(
            RecordingApi::new()
                .respond(
                    "list_folder_items",
                    json!({"entries": [
                        {"type": "folder", "id": "1", "name": "Sub"},
                    ], "next_marker": "m2"}),
                )
                .respond(
                    "list_folder_items",
                    json!({"entries": [
                        {"type": "file", "id": "11", "name": "inner.txt", "description": "nested"}
                    ]}),
                )
                .respond(
                    "list_folder_items",
                    json!({"entries": [
                        {"type": "file", "id": "2", "name": "top.txt"}
                    ], "next_marker": ""}),
                ),
        );
        let entries = BoxControlPlane::new(api.clone())
            .list_folder_content("0", true)
            .await
            .expect("listing");

        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "11", "2"]);
        assert_eq!(entries[1].description.as_deref(), Some("nested"));

        let calls = api.calls_to("list_folder_items");
        assert_eq!(calls[0]["folder_id"], json!("0"));
        assert_eq!(calls[1]["folder_id"], json!("1"));
        assert_eq!(calls[2]["folder_id"], json!("0"));
        assert_eq!(calls[2]["page"]["marker"], json!("m2"));
    }

    #[tokio::test]
    async fn flat_listing_does_not_descend() {
        let api = Arc::new(RecordingApi::new().respond(
            "list_folder_items",
            json!({"entries": [{"type": "folder", "id": "1", "name": "Sub"}]}),
        ));
        let entries = BoxControlPlane::new(api.clone())
            .list_folder_content("0", false)
            .await
            .expect("listing");
        assert_eq!(entries.len(), 1);
        assert_eq!(api.calls_to("list_folder_items").len(), 1);
    }
}
