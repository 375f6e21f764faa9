use box_core::control::ManageFolderRequest;
use box_models::BoxId;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{BoxMcp, helpers};

/// Parameters for listing a folder.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListFolderParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub folder_id: BoxId,
    /// Walk sub-folders as well.
    #[serde(default)]
    pub is_recursive: Option<bool>,
}

/// Parameters for creating, deleting or updating a folder.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ManageFolderParams {
    /// One of `create`, `delete`, `update`.
    pub action: String,
    /// Required for delete and update.
    #[serde(default)]
    #[schemars(with = "Option<crate::helpers::IdSchema>")]
    pub folder_id: Option<BoxId>,
    /// Required for create; the new name for update.
    #[serde(default)]
    pub name: Option<String>,
    /// Parent for create (root when omitted), or the move target for update.
    #[serde(default)]
    #[schemars(with = "Option<crate::helpers::IdSchema>")]
    pub parent_id: Option<BoxId>,
    #[serde(default)]
    pub description: Option<String>,
    /// Delete non-empty folders with their content.
    #[serde(default)]
    pub recursive: Option<bool>,
}

#[tool_router(router = tool_router_folders, vis = "pub")]
impl BoxMcp {
    #[tool(description = "List the items of a Box folder as {id, name, type, description}, optionally recursively.")]
    async fn box_list_folder_content_by_folder_id(
        &self,
        Parameters(params): Parameters<ListFolderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .list_folder_content(params.folder_id.as_str(), params.is_recursive.unwrap_or(false))
                .await,
        )
    }

    #[tool(description = "Create, delete or update a Box folder.")]
    async fn box_manage_folder(
        &self,
        Parameters(params): Parameters<ManageFolderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .manage_folder(ManageFolderRequest {
                    action: params.action,
                    folder_id: params.folder_id.map(BoxId::into_string),
                    name: params.name,
                    parent_id: params.parent_id.map(BoxId::into_string),
                    description: params.description,
                    recursive: params.recursive.unwrap_or(false),
                })
                .await,
        )
    }
}
