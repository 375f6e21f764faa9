use box_core::control::{AskRequest, ExtractRequest, StructuredExtractRequest};
use box_models::ids::into_strings;
use box_models::{AiExtractField, BoxId};
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

/// Parameters for a question about one file.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AskFileParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Parameters for a question spanning several files.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AskFilesParams {
    #[schemars(with = "Vec<crate::helpers::IdSchema>")]
    pub file_ids: Vec<BoxId>,
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Parameters for a question about a hub.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AskHubParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub hubs_id: BoxId,
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Parameters for freeform extraction.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractFreeformParams {
    #[schemars(with = "Vec<crate::helpers::IdSchema>")]
    pub file_ids: Vec<BoxId>,
    /// What to extract, in natural language.
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Parameters for structured extraction with explicit fields.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractFieldsParams {
    #[schemars(with = "Vec<crate::helpers::IdSchema>")]
    pub file_ids: Vec<BoxId>,
    /// Field definitions: `key`, optional `type`, `displayName`, `description`,
    /// `prompt` and `options`.
    #[schemars(with = "Vec<serde_json::Value>")]
    pub fields: Vec<AiExtractField>,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Parameters for structured extraction against an enterprise metadata template.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractTemplateParams {
    #[schemars(with = "Vec<crate::helpers::IdSchema>")]
    pub file_ids: Vec<BoxId>,
    pub template_key: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

impl From<ExtractFieldsParams> for StructuredExtractRequest {
    fn from(params: ExtractFieldsParams) -> Self {
        Self::Fields {
            file_ids: into_strings(params.file_ids),
            fields: params.fields,
            ai_agent_id: params.ai_agent_id,
        }
    }
}

impl From<ExtractTemplateParams> for StructuredExtractRequest {
    fn from(params: ExtractTemplateParams) -> Self {
        Self::Template {
            file_ids: into_strings(params.file_ids),
            template_key: params.template_key,
            ai_agent_id: params.ai_agent_id,
        }
    }
}

#[tool_router(router = tool_router_ai, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Ask Box AI a question about a single file.")]
    async fn box_ai_ask_file_single(
        &self,
        Parameters(params): Parameters<AskFileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .ask_file(params.file_id.as_str(), &params.prompt, params.ai_agent_id)
                .await,
        )
    }

    #[tool(description = "Ask Box AI one question across multiple files.")]
    async fn box_ai_ask_file_multi(
        &self,
        Parameters(params): Parameters<AskFilesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .ask_files(AskRequest {
                    ids: into_strings(params.file_ids),
                    prompt: params.prompt,
                    ai_agent_id: params.ai_agent_id,
                })
                .await,
        )
    }

    #[tool(description = "Ask Box AI a question about a Box hub.")]
    async fn box_ai_ask_hub(
        &self,
        Parameters(params): Parameters<AskHubParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .ask_hub(params.hubs_id.as_str(), &params.prompt, params.ai_agent_id)
                .await,
        )
    }

    #[tool(description = "Extract information from files as freeform text using a prompt.")]
    async fn box_ai_extract_freeform(
        &self,
        Parameters(params): Parameters<ExtractFreeformParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .extract_freeform(ExtractRequest {
                    file_ids: into_strings(params.file_ids),
                    prompt: params.prompt,
                    ai_agent_id: params.ai_agent_id,
                })
                .await,
        )
    }

    #[tool(description = "Extract structured data from files using explicit field definitions.")]
    async fn box_ai_extract_structured_using_fields(
        &self,
        Parameters(params): Parameters<ExtractFieldsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.extract_structured(params.into()).await)
    }

    #[tool(description = "Extract structured data from files using an enterprise metadata template.")]
    async fn box_ai_extract_structured_using_template(
        &self,
        Parameters(params): Parameters<ExtractTemplateParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.extract_structured(params.into()).await)
    }

    #[tool(description = "Extract structured data using field definitions and the enhanced extract agent.")]
    async fn box_ai_extract_structured_enhanced_using_fields(
        &self,
        Parameters(params): Parameters<ExtractFieldsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.extract_structured_enhanced(params.into()).await)
    }

    #[tool(description = "Extract structured data using a metadata template and the enhanced extract agent.")]
    async fn box_ai_extract_structured_enhanced_using_template(
        &self,
        Parameters(params): Parameters<ExtractTemplateParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.extract_structured_enhanced(params.into()).await)
    }
}
