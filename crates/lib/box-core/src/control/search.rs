use box_models::schema::{ITEM_TYPE_FOLDER, ROOT_FOLDER_ID};
use box_models::{Item, SearchContentType, SearchQuery};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BoxControlPlane, ControlError, ControlResult};

/// Input for a content search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    /// Location names such as `NAME` or `FILE_CONTENT`.
    #[serde(default)]
    pub where_to_look_for_query: Vec<String>,
    #[serde(default)]
    pub ancestor_folder_ids: Vec<String>,
}

impl BoxControlPlane {
    /// Searches for items matching a query.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` for an unknown search location, or
    /// `ControlError::Api` if the search fails.
    pub async fn search(&self, request: SearchRequest) -> ControlResult<Vec<Item>> {
        let SearchRequest {
            query,
            file_extensions,
            where_to_look_for_query,
            ancestor_folder_ids,
        } = request;

        let content_types = where_to_look_for_query
            .iter()
            .map(|location| location.parse::<SearchContentType>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ControlError::invalid(err.to_string()))?;

        let query = SearchQuery {
            query,
            file_extensions: normalize_extensions(file_extensions),
            content_types,
            ancestor_folder_ids,
            item_type: None,
            limit: None,
        };
        debug!(query = %query.query, "searching content");
        Ok(self.client.search(&query).await?.entries)
    }

    /// Finds folders whose name contains `folder_name`, ignoring case.
    ///
    /// # Errors
    /// Returns `ControlError` if the name is blank or the search fails.
    pub async fn locate_folder_by_name(
        &self,
        folder_name: &str,
        parent_folder_id: Option<&str>,
    ) -> ControlResult<Vec<Item>> {
        let needle = folder_name.trim();
        if needle.is_empty() {
            return Err(ControlError::invalid("folder_name is required"));
        }
        let query = SearchQuery {
            query: needle.to_string(),
            file_extensions: Vec::new(),
            content_types: vec![SearchContentType::Name],
            ancestor_folder_ids: vec![parent_folder_id.unwrap_or(ROOT_FOLDER_ID).to_string()],
            item_type: Some(ITEM_TYPE_FOLDER.to_string()),
            limit: None,
        };
        let needle = needle.to_lowercase();
        let found = self.client.search(&query).await?;
        Ok(found
            .entries
            .into_iter()
            .filter(|item| {
                item.is_folder()
                    && item
                        .name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .collect())
    }
}

/// Accepts `pdf`, `.pdf` and `*.pdf` alike.
fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|extension| {
            extension
                .trim()
                .trim_start_matches('*')
                .trim_start_matches('.')
                .to_string()
        })
        .filter(|extension| !extension.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::RecordingApi;

    #[tokio::test]
    async fn search_maps_locations_and_extensions() {
        let api = Arc::new(RecordingApi::new().respond(
            "search",
            json!({"entries": [{"type": "file", "id": "1", "name": "q3.pdf"}], "total_count": 1}),
        ));
        let control = BoxControlPlane::new(api.clone());

        let items = control
            .search(SearchRequest {
                query: "quarterly".to_string(),
                file_extensions: vec!["*.pdf".to_string(), ".docx".to_string()],
                where_to_look_for_query: vec!["NAME".to_string(), "FILE_CONTENT".to_string()],
                ancestor_folder_ids: vec!["77".to_string()],
            })
            .await
            .expect("search");
        assert_eq!(items.len(), 1);

        let call = &api.calls_to("search")[0];
        assert_eq!(call["file_extensions"], json!(["pdf", "docx"]));
        assert_eq!(call["content_types"], json!(["name", "file_content"]));
        assert_eq!(call["ancestor_folder_ids"], json!(["77"]));
    }

    #[tokio::test]
    async fn unknown_location_is_rejected_before_searching() {
        let api = Arc::new(RecordingApi::new());
        let control = BoxControlPlane::new(api.clone());

        let err = control
            .search(SearchRequest {
                query: "x".to_string(),
                where_to_look_for_query: vec!["EVERYWHERE".to_string()],
                ..SearchRequest::default()
            })
            .await
            .expect_err("unknown location");
        assert_eq!(err.kind(), "invalid_input");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn folder_lookup_matches_names_case_insensitively() {
        let api = Arc::new(RecordingApi::new().respond(
            "search",
            json!({"entries": [
                {"type": "folder", "id": "1", "name": "Quarterly Reports"},
                {"type": "folder", "id": "2", "name": "Archive"},
                {"type": "file", "id": "3", "name": "reports.txt"}
            ]}),
        ));
        let control = BoxControlPlane::new(api.clone());

        let folders = control
            .locate_folder_by_name("reports", None)
            .await
            .expect("folders");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, "1");

        let call = &api.calls_to("search")[0];
        assert_eq!(call["item_type"], json!("folder"));
        assert_eq!(call["ancestor_folder_ids"], json!(["0"]));
    }
}
