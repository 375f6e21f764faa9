use box_core::control::SearchRequest;
use box_models::BoxId;
use box_models::ids::into_strings;
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

/// Parameters for a content search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Text to search for.
    pub query: String,
    /// Restrict results to these extensions, e.g. `pdf` or `.docx`.
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,
    /// Any of `NAME`, `DESCRIPTION`, `FILE_CONTENT`, `COMMENTS`, `TAG`.
    #[serde(default)]
    pub where_to_look_for_query: Option<Vec<String>>,
    #[serde(default)]
    #[schemars(with = "Option<Vec<crate::helpers::IdSchema>>")]
    pub ancestor_folder_ids: Option<Vec<BoxId>>,
}

/// Parameters for locating folders by name.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchFolderByNameParams {
    pub folder_name: String,
    /// Folder to search under; the root folder when omitted.
    #[serde(default)]
    #[schemars(with = "Option<crate::helpers::IdSchema>")]
    pub parent_folder_id: Option<BoxId>,
}

#[tool_router(router = tool_router_search, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Search Box for files and folders matching a query.")]
    async fn box_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        let request = SearchRequest {
            query: params.query,
            file_extensions: params.file_extensions.unwrap_or_default(),
            where_to_look_for_query: params.where_to_look_for_query.unwrap_or_default(),
            ancestor_folder_ids: into_strings(params.ancestor_folder_ids.unwrap_or_default()),
        };
        helpers::render(control.search(request).await)
    }

    #[tool(description = "Find folders whose name contains the given text (case-insensitive).")]
    async fn box_search_folder_by_name(
        &self,
        Parameters(params): Parameters<SearchFolderByNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        let parent = params.parent_folder_id.filter(|id| !id.is_blank());
        helpers::render(
            control
                .locate_folder_by_name(&params.folder_name, parent.as_ref().map(BoxId::as_str))
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use box_core::testing::RecordingApi;
    use serde_json::json;

    use super::*;
    use crate::tests::{json_body, ready_server};

    #[tokio::test]
    async fn numeric_ancestor_ids_are_sent_as_strings() {
        let api = Arc::new(RecordingApi::new().respond("search", json!({"entries": []})));
        let params: SearchParams = serde_json::from_value(json!({
            "query": "budget",
            "ancestor_folder_ids": [123, "456"]
        }))
        .expect("params");
        let result = ready_server(api.clone())
            .box_search(Parameters(params))
            .await
            .expect("tool result");
        assert_eq!(json_body(&result), json!([]));
        assert_eq!(
            api.calls_to("search")[0]["ancestor_folder_ids"],
            json!(["123", "456"])
        );
    }

    #[tokio::test]
    async fn unknown_search_location_is_an_input_error() {
        let api = Arc::new(RecordingApi::new());
        let params = SearchParams {
            query: "budget".to_string(),
            file_extensions: None,
            where_to_look_for_query: Some(vec!["EVERYWHERE".to_string()]),
            ancestor_folder_ids: None,
        };
        let result = ready_server(api.clone())
            .box_search(Parameters(params))
            .await
            .expect("tool result");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(json_body(&result)["error"], json!("invalid_input"));
        assert!(api.calls().is_empty());
    }
}
