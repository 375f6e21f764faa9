use box_core::control::{DocGenBatchInput, DocGenSingleInput};
use box_models::{BoxId, DocGenDocument, Page};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BoxMcp, helpers};

/// Marker-based paging, forwarded unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PageParams {
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Self::new(params.marker, params.limit)
    }
}

/// Parameters for generating a batch of documents.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateBatchParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub docgen_template_id: BoxId,
    #[schemars(with = "crate::helpers::IdSchema")]
    pub destination_folder_id: BoxId,
    /// One entry per document: `{"generated_file_name": ..., "user_input": {...}}`.
    #[schemars(with = "Vec<Value>")]
    pub document_generation_data: Vec<DocGenDocument>,
    /// `pdf` (default) or `docx`.
    #[serde(default)]
    pub output_type: Option<String>,
}

/// Parameters for generating one document from user input.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateSingleParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub docgen_template_id: BoxId,
    #[schemars(with = "crate::helpers::IdSchema")]
    pub destination_folder_id: BoxId,
    /// Values for the template tags.
    pub user_input: Map<String, Value>,
    #[serde(default)]
    pub generated_file_name: Option<String>,
    #[serde(default)]
    pub output_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct JobIdParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub job_id: BoxId,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BatchJobsParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub batch_id: BoxId,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateFileParams {
    /// File to mark as a Doc Gen template.
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateIdParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub template_id: BoxId,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateNameParams {
    pub template_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateTagsParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub template_id: BoxId,
    #[serde(default)]
    pub template_version_id: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateJobsParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub template_id: BoxId,
    #[serde(flatten)]
    pub page: PageParams,
}

#[tool_router(router = tool_router_docgen, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Generate documents from a Doc Gen template, one per entry of document_generation_data.")]
    async fn box_docgen_create_batch(
        &self,
        Parameters(params): Parameters<CreateBatchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .create_docgen_batch(DocGenBatchInput {
                    docgen_template_id: params.docgen_template_id.into_string(),
                    destination_folder_id: params.destination_folder_id.into_string(),
                    document_generation_data: params.document_generation_data,
                    output_type: params.output_type,
                })
                .await,
        )
    }

    #[tool(description = "Generate a single document from a Doc Gen template and user input.")]
    async fn box_docgen_create_single_file_from_user_input(
        &self,
        Parameters(params): Parameters<CreateSingleParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .create_docgen_single(DocGenSingleInput {
                    docgen_template_id: params.docgen_template_id.into_string(),
                    destination_folder_id: params.destination_folder_id.into_string(),
                    user_input: params.user_input,
                    generated_file_name: params.generated_file_name,
                    output_type: params.output_type,
                })
                .await,
        )
    }

    #[tool(description = "Fetch a Doc Gen job by id.")]
    async fn box_docgen_get_job_by_id(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.get_docgen_job(params.job_id.as_str()).await)
    }

    #[tool(description = "List Doc Gen jobs of the current user.")]
    async fn box_docgen_list_jobs(
        &self,
        Parameters(params): Parameters<PageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.list_docgen_jobs(params.into()).await)
    }

    #[tool(description = "List the jobs of a Doc Gen batch.")]
    async fn box_docgen_list_jobs_by_batch(
        &self,
        Parameters(params): Parameters<BatchJobsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .list_docgen_batch_jobs(params.batch_id.as_str(), params.page.into())
                .await,
        )
    }

    #[tool(description = "Mark a file as a Doc Gen template.")]
    async fn box_docgen_template_create(
        &self,
        Parameters(params): Parameters<TemplateFileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.create_docgen_template(params.file_id.as_str()).await)
    }

    #[tool(description = "List Doc Gen templates.")]
    async fn box_docgen_template_list(
        &self,
        Parameters(params): Parameters<PageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.list_docgen_templates(params.into()).await)
    }

    #[tool(description = "Fetch a Doc Gen template by id.")]
    async fn box_docgen_template_get_by_id(
        &self,
        Parameters(params): Parameters<TemplateIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.get_docgen_template(params.template_id.as_str()).await)
    }

    #[tool(description = "Find a Doc Gen template by its file name.")]
    async fn box_docgen_template_get_by_name(
        &self,
        Parameters(params): Parameters<TemplateNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.get_docgen_template_by_name(&params.template_name).await)
    }

    #[tool(description = "Unmark a file as a Doc Gen template.")]
    async fn box_docgen_template_delete(
        &self,
        Parameters(params): Parameters<TemplateIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.delete_docgen_template(params.template_id.as_str()).await)
    }

    #[tool(description = "List the tags of a Doc Gen template.")]
    async fn box_docgen_template_list_tags(
        &self,
        Parameters(params): Parameters<TemplateTagsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .list_docgen_template_tags(
                    params.template_id.as_str(),
                    params.template_version_id.as_deref(),
                    params.page.into(),
                )
                .await,
        )
    }

    #[tool(description = "List the jobs that used a Doc Gen template.")]
    async fn box_docgen_template_list_jobs(
        &self,
        Parameters(params): Parameters<TemplateJobsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .list_docgen_template_jobs(params.template_id.as_str(), params.page.into())
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
    async fn omitted_paging_is_forwarded_as_absent() {
        let api = Arc::new(RecordingApi::new().respond("list_docgen_jobs", json!({"entries": []})));
        let params: PageParams = serde_json::from_value(json!({})).expect("params");
        ready_server(api.clone())
            .box_docgen_list_jobs(Parameters(params))
            .await
            .expect("tool result");
        assert_eq!(
            api.calls_to("list_docgen_jobs")[0],
            json!({"marker": null, "limit": null})
        );
    }

    #[tokio::test]
    async fn single_file_generation_defaults_to_pdf() {
        let api = Arc::new(
            RecordingApi::new().respond("create_docgen_batch", json!({"id": "b1", "type": "docgen_batch"})),
        );
        let params: CreateSingleParams = serde_json::from_value(json!({
            "docgen_template_id": 55,
            "destination_folder_id": "0",
            "user_input": {"name": "Ada"}
        }))
        .expect("params");
        let result = ready_server(api.clone())
            .box_docgen_create_single_file_from_user_input(Parameters(params))
            .await
            .expect("tool result");
        assert_eq!(json_body(&result)["id"], json!("b1"));
        let request = &api.calls_to("create_docgen_batch")[0];
        assert_eq!(request["file"]["id"], json!("55"));
        assert_eq!(request["output_type"], json!("pdf"));
        assert_eq!(request["document_generation_data"][0]["user_input"], json!({"name": "Ada"}));
    }
}
