use box_core::control::MetadataTemplateInput;
use box_models::{BoxId, MetadataInstance, MetadataTemplateField};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BoxMcp, helpers};

/// Parameters for creating an enterprise metadata template.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateTemplateParams {
    pub display_name: String,
    /// Derived from the display name when omitted.
    #[serde(default)]
    pub template_key: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    /// Field definitions: `type`, `key`, `displayName`, optional `description`,
    /// `hidden` and `options`.
    #[serde(default)]
    #[schemars(with = "Vec<Value>")]
    pub fields: Vec<MetadataTemplateField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TemplateKeyParams {
    pub template_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MetadataTemplateNameParams {
    /// Display name, matched ignoring case.
    pub template_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstanceParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
    pub template_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SetInstanceParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
    pub template_key: String,
    /// Values keyed by template field key.
    pub metadata: MetadataInstance,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateInstanceParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
    pub template_key: String,
    pub metadata: MetadataInstance,
    /// Remove existing values that are not part of `metadata`.
    #[serde(default)]
    pub remove_non_included_data: Option<bool>,
}

#[tool_router(router = tool_router_metadata, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Create an enterprise metadata template.")]
    async fn box_metadata_template_create(
        &self,
        Parameters(params): Parameters<CreateTemplateParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .create_metadata_template(MetadataTemplateInput {
                    display_name: params.display_name,
                    template_key: params.template_key,
                    hidden: params.hidden,
                    fields: params.fields,
                })
                .await,
        )
    }

    #[tool(description = "Fetch an enterprise metadata template by key.")]
    async fn box_metadata_template_get_by_key(
        &self,
        Parameters(params): Parameters<TemplateKeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.get_metadata_template(&params.template_key).await)
    }

    #[tool(description = "Find an enterprise metadata template by display name.")]
    async fn box_metadata_template_get_by_name(
        &self,
        Parameters(params): Parameters<MetadataTemplateNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.get_metadata_template_by_name(&params.template_name).await)
    }

    #[tool(description = "Delete an enterprise metadata template.")]
    async fn box_metadata_template_delete(
        &self,
        Parameters(params): Parameters<TemplateKeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.delete_metadata_template(&params.template_key).await)
    }

    #[tool(description = "Apply metadata from a template to a file.")]
    async fn box_metadata_set_instance_on_file(
        &self,
        Parameters(params): Parameters<SetInstanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .set_metadata_instance(params.file_id.as_str(), &params.template_key, params.metadata)
                .await,
        )
    }

    #[tool(description = "Fetch the metadata of a template applied to a file.")]
    async fn box_metadata_get_instance_on_file(
        &self,
        Parameters(params): Parameters<InstanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .get_metadata_instance(params.file_id.as_str(), &params.template_key)
                .await,
        )
    }

    #[tool(description = "Update the metadata of a template applied to a file.")]
    async fn box_metadata_update_instance_on_file(
        &self,
        Parameters(params): Parameters<UpdateInstanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .update_metadata_instance(
                    params.file_id.as_str(),
                    &params.template_key,
                    params.metadata,
                    params.remove_non_included_data.unwrap_or(false),
                )
                .await,
        )
    }

    #[tool(description = "Remove the metadata of a template from a file.")]
    async fn box_metadata_delete_instance_on_file(
        &self,
        Parameters(params): Parameters<InstanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .delete_metadata_instance(params.file_id.as_str(), &params.template_key)
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
    async fn update_with_removal_prunes_missing_keys() {
        let api = Arc::new(
            RecordingApi::new()
                .respond(
                    "get_metadata_instance",
                    json!({"$id": "x", "vendor": "Acme", "amount": 5}),
                )
                .respond("update_metadata_instance", json!({"$id": "x", "amount": 6})),
        );
        let params: UpdateInstanceParams = serde_json::from_value(json!({
            "file_id": 300,
            "template_key": "invoice",
            "metadata": {"amount": 6},
            "remove_non_included_data": true
        }))
        .expect("params");
        let result = ready_server(api.clone())
            .box_metadata_update_instance_on_file(Parameters(params))
            .await
            .expect("tool result");

        assert_eq!(json_body(&result), json!({"$id": "x", "amount": 6}));
        let call = &api.calls_to("update_metadata_instance")[0];
        assert_eq!(call["file_id"], json!("300"));
        assert_eq!(
            call["operations"],
            json!([
                {"op": "replace", "path": "/amount", "value": 6},
                {"op": "remove", "path": "/vendor"}
            ])
        );
    }

    #[tokio::test]
    async fn missing_template_name_is_not_found() {
        let api = Arc::new(RecordingApi::new().respond("list_metadata_templates", json!({"entries": []})));
        let params = MetadataTemplateNameParams {
            template_name: "Contracts".to_string(),
        };
        let result = ready_server(api)
            .box_metadata_template_get_by_name(Parameters(params))
            .await
            .expect("tool result");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(json_body(&result)["error"], json!("not_found"));
    }
}
