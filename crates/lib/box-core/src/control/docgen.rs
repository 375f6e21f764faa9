use box_models::schema::{DEFAULT_DOCGEN_OUTPUT_TYPE, DOCGEN_INPUT_SOURCE, TEMPLATE_SCAN_PAGE_LIMIT};
use box_models::{
    Collection,
    DocGenBatch,
    DocGenBatchRequest,
    DocGenDocument,
    DocGenJob,
    DocGenTag,
    DocGenTemplate,
    ItemRef,
    Page,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Acknowledgement, BoxControlPlane, ControlError, ControlResult, require_id};

const OUTPUT_TYPES: [&str; 2] = ["pdf", "docx"];

/// Input for a doc gen batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocGenBatchInput {
    pub docgen_template_id: String,
    pub destination_folder_id: String,
    pub document_generation_data: Vec<DocGenDocument>,
    #[serde(default)]
    pub output_type: Option<String>,
}

/// Input for generating one document from user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocGenSingleInput {
    pub docgen_template_id: String,
    pub destination_folder_id: String,
    pub user_input: Map<String, Value>,
    #[serde(default)]
    pub generated_file_name: Option<String>,
    #[serde(default)]
    pub output_type: Option<String>,
}

fn output_type(requested: Option<String>) -> ControlResult<String> {
    let output_type = requested
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DOCGEN_OUTPUT_TYPE.to_string());
    if OUTPUT_TYPES.contains(&output_type.as_str()) {
        Ok(output_type)
    } else {
        Err(ControlError::invalid(format!(
            "output_type must be pdf or docx, got {output_type}"
        )))
    }
}

/// Accepts the data either bare or wrapped in a single `user_input` key.
fn unwrap_user_input(mut user_input: Map<String, Value>) -> Map<String, Value> {
    if user_input.len() == 1 && matches!(user_input.get("user_input"), Some(Value::Object(_))) {
        if let Some(Value::Object(inner)) = user_input.remove("user_input") {
            return inner;
        }
    }
    user_input
}

impl BoxControlPlane {
    /// Marks a file as a doc gen template.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn create_docgen_template(&self, file_id: &str) -> ControlResult<DocGenTemplate> {
        require_id("file_id", file_id)?;
        Ok(self.client.create_docgen_template(file_id).await?)
    }

    /// Lists doc gen templates, one page at a time.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn list_docgen_templates(
        &self,
        page: Page,
    ) -> ControlResult<Collection<DocGenTemplate>> {
        Ok(self.client.list_docgen_templates(&page).await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn get_docgen_template(&self, template_id: &str) -> ControlResult<DocGenTemplate> {
        require_id("template_id", template_id)?;
        Ok(self.client.get_docgen_template(template_id).await?)
    }

    /// Finds a template by its file name, scanning every page.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` when no template has that name.
    pub async fn get_docgen_template_by_name(
        &self,
        template_name: &str,
    ) -> ControlResult<DocGenTemplate> {
        let wanted = template_name.trim();
        if wanted.is_empty() {
            return Err(ControlError::invalid("template_name is required"));
        }
        let mut page = Page::new(None, Some(TEMPLATE_SCAN_PAGE_LIMIT));
        loop {
            let templates = self.client.list_docgen_templates(&page).await?;
            let next = templates.next_page_marker().map(str::to_string);
            if let Some(found) = templates
                .entries
                .into_iter()
                .find(|template| template.file_name.as_deref() == Some(wanted))
            {
                return Ok(found);
            }
            match next {
                Some(marker) => page.marker = Some(marker),
                None => {
                    return Err(ControlError::NotFound(format!(
                        "no doc gen template named {wanted}"
                    )));
                }
            }
        }
    }

    /// Unmarks a doc gen template.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn delete_docgen_template(&self, template_id: &str) -> ControlResult<Acknowledgement> {
        require_id("template_id", template_id)?;
        self.client.delete_docgen_template(template_id).await?;
        info!(template_id, "doc gen template removed");
        Ok(Acknowledgement::new(
            template_id,
            format!("Template {template_id} deleted successfully"),
        ))
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn list_docgen_template_tags(
        &self,
        template_id: &str,
        template_version_id: Option<&str>,
        page: Page,
    ) -> ControlResult<Collection<DocGenTag>> {
        require_id("template_id", template_id)?;
        Ok(self
            .client
            .list_docgen_template_tags(template_id, template_version_id, &page)
            .await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn list_docgen_template_jobs(
        &self,
        template_id: &str,
        page: Page,
    ) -> ControlResult<Collection<DocGenJob>> {
        require_id("template_id", template_id)?;
        Ok(self.client.list_docgen_template_jobs(template_id, &page).await?)
    }

    /// Starts a batch generating one document per data entry.
    ///
    /// # Errors
    /// Returns `ControlError` for an unsupported output type or a failed request.
    pub async fn create_docgen_batch(&self, input: DocGenBatchInput) -> ControlResult<DocGenBatch> {
        let DocGenBatchInput {
            docgen_template_id,
            destination_folder_id,
            document_generation_data,
            output_type: requested,
        } = input;
        require_id("docgen_template_id", &docgen_template_id)?;
        require_id("destination_folder_id", &destination_folder_id)?;
        if document_generation_data.is_empty() {
            return Err(ControlError::invalid(
                "document_generation_data must contain at least one entry",
            ));
        }
        let request = DocGenBatchRequest {
            file: ItemRef::file(docgen_template_id),
            input_source: DOCGEN_INPUT_SOURCE.to_string(),
            destination_folder: ItemRef::folder(destination_folder_id),
            output_type: output_type(requested)?,
            document_generation_data,
        };
        debug!(documents = request.document_generation_data.len(), "creating doc gen batch");
        Ok(self.client.create_docgen_batch(&request).await?)
    }

    /// Generates a single document from user input.
    ///
    /// # Errors
    /// Returns `ControlError` for an unsupported output type or a failed request.
    pub async fn create_docgen_single(&self, input: DocGenSingleInput) -> ControlResult<DocGenBatch> {
        let DocGenSingleInput {
            docgen_template_id,
            destination_folder_id,
            user_input,
            generated_file_name,
            output_type,
        } = input;
        let document = DocGenDocument {
            generated_file_name: generated_file_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            user_input: unwrap_user_input(user_input),
        };
        self.create_docgen_batch(DocGenBatchInput {
            docgen_template_id,
            destination_folder_id,
            document_generation_data: vec![document],
            output_type,
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn get_docgen_job(&self, job_id: &str) -> ControlResult<DocGenJob> {
        require_id("job_id", job_id)?;
        Ok(self.client.get_docgen_job(job_id).await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn list_docgen_jobs(&self, page: Page) -> ControlResult<Collection<DocGenJob>> {
        Ok(self.client.list_docgen_jobs(&page).await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn list_docgen_batch_jobs(
        &self,
        batch_id: &str,
        page: Page,
    ) -> ControlResult<Collection<DocGenJob>> {
        require_id("batch_id", batch_id)?;
        Ok(self.client.list_docgen_batch_jobs(batch_id, &page).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::RecordingApi;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn paging_arguments_are_forwarded_unchanged() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("list_docgen_jobs", json!({"entries": []}))
                .respond("list_docgen_jobs", json!({"entries": []})),
        );
        let control = BoxControlPlane::new(api.clone());

        control.list_docgen_jobs(Page::default()).await.expect("jobs");
        control
            .list_docgen_jobs(Page::new(Some("abc".into()), Some(25)))
            .await
            .expect("jobs");

        let calls = api.calls_to("list_docgen_jobs");
        assert_eq!(calls[0], json!({"marker": null, "limit": null}));
        assert_eq!(calls[1], json!({"marker": "abc", "limit": 25}));
    }

    #[tokio::test]
    async fn single_document_becomes_a_one_entry_batch() {
        let api = Arc::new(RecordingApi::new().respond("create_docgen_batch", json!({"id": "b1", "type": "docgen_batch"})));
        let control = BoxControlPlane::new(api.clone());

        let batch = control
            .create_docgen_single(DocGenSingleInput {
                docgen_template_id: "t1".to_string(),
                destination_folder_id: "0".to_string(),
                user_input: object(json!({"user_input": {"order": {"id": "12305"}}})),
                generated_file_name: Some("Order 12305".to_string()),
                output_type: None,
            })
            .await
            .expect("batch");
        assert_eq!(batch.id, "b1");

        let call = &api.calls_to("create_docgen_batch")[0];
        assert_eq!(call["file"], json!({"id": "t1", "type": "file"}));
        assert_eq!(call["destination_folder"], json!({"id": "0", "type": "folder"}));
        assert_eq!(call["input_source"], json!("api"));
        assert_eq!(call["output_type"], json!("pdf"));
        assert_eq!(
            call["document_generation_data"],
            json!([{"generated_file_name": "Order 12305", "user_input": {"order": {"id": "12305"}}}])
        );
    }

    #[tokio::test]
    async fn unsupported_output_type_is_rejected() {
        let api = Arc::new(RecordingApi::new());
        let control = BoxControlPlane::new(api.clone());
        let err = control
            .create_docgen_single(DocGenSingleInput {
                docgen_template_id: "t1".to_string(),
                destination_folder_id: "0".to_string(),
                user_input: Map::new(),
                generated_file_name: None,
                output_type: Some("xlsx".to_string()),
            })
            .await
            .expect_err("xlsx");
        assert_eq!(err.kind(), "invalid_input");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn template_lookup_by_name_follows_markers() {
        let api = Arc::new(
            RecordingApi::new()
                .respond(
                    "list_docgen_templates",
                    json!({"entries": [{"file": {"id": "1", "type": "file"}, "file_name": "Invoice.docx"}], "next_marker": "p2"}),
                )
                .respond(
                    "list_docgen_templates",
                    json!({"entries": [{"file": {"id": "2", "type": "file"}, "file_name": "Order.docx"}]}),
                ),
        );
        let control = BoxControlPlane::new(api.clone());

        let template = control
            .get_docgen_template_by_name("Order.docx")
            .await
            .expect("template");
        assert_eq!(template.file_id(), Some("2"));

        let calls = api.calls_to("list_docgen_templates");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1]["marker"], json!("p2"));
    }

    #[tokio::test]
    async fn missing_template_name_is_not_found() {
        let api = Arc::new(RecordingApi::new().respond("list_docgen_templates", json!({"entries": []})));
        let err = BoxControlPlane::new(api)
            .get_docgen_template_by_name("Nope.docx")
            .await
            .expect_err("not found");
        assert_eq!(err.kind(), "not_found");
    }
}
