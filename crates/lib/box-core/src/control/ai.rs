use box_models::schema::ENHANCED_EXTRACT_AGENT_ID;
use box_models::{
    AiAgentReference,
    AiAskMode,
    AiAskRequest,
    AiExtractField,
    AiExtractRequest,
    AiExtractStructuredRequest,
    AiExtractStructuredResponse,
    AiItem,
    AiResponse,
    MetadataTemplateReference,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BoxControlPlane, ControlError, ControlResult, require_id, require_ids};

/// Question about one or more items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub ids: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Freeform extraction over one or more files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub file_ids: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
}

/// Structured extraction, either by explicit fields or by a metadata template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructuredExtractRequest {
    Fields {
        file_ids: Vec<String>,
        fields: Vec<AiExtractField>,
        ai_agent_id: Option<String>,
    },
    Template {
        file_ids: Vec<String>,
        template_key: String,
        ai_agent_id: Option<String>,
    },
}

fn agent(ai_agent_id: Option<String>) -> Option<AiAgentReference> {
    ai_agent_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(AiAgentReference::by_id)
}

fn require_prompt(prompt: &str) -> ControlResult<()> {
    if prompt.trim().is_empty() {
        return Err(ControlError::invalid("prompt is required"));
    }
    Ok(())
}

impl BoxControlPlane {
    /// Asks a question about a single file.
    ///
    /// # Errors
    /// Returns `ControlError` if input is missing or the request fails.
    pub async fn ask_file(
        &self,
        file_id: &str,
        prompt: &str,
        ai_agent_id: Option<String>,
    ) -> ControlResult<AiResponse> {
        require_id("file_id", file_id)?;
        require_prompt(prompt)?;
        let request = AiAskRequest {
            mode: AiAskMode::SingleItemQa,
            prompt: prompt.to_string(),
            items: vec![AiItem::file(file_id)],
            ai_agent: agent(ai_agent_id),
        };
        Ok(self.client.ai_ask(&request).await?)
    }

    /// Asks one question across several files with a single request.
    ///
    /// # Errors
    /// Returns `ControlError` if the id list is empty or the request fails.
    pub async fn ask_files(&self, request: AskRequest) -> ControlResult<AiResponse> {
        let AskRequest {
            ids,
            prompt,
            ai_agent_id,
        } = request;
        require_ids("file_ids", &ids)?;
        require_prompt(&prompt)?;
        debug!(files = ids.len(), "asking about multiple files");
        let request = AiAskRequest {
            mode: AiAskMode::MultipleItemQa,
            prompt,
            items: ids.into_iter().map(AiItem::file).collect(),
            ai_agent: agent(ai_agent_id),
        };
        Ok(self.client.ai_ask(&request).await?)
    }

    /// Asks a question about a hub.
    ///
    /// # Errors
    /// Returns `ControlError` if input is missing or the request fails.
    pub async fn ask_hub(
        &self,
        hubs_id: &str,
        prompt: &str,
        ai_agent_id: Option<String>,
    ) -> ControlResult<AiResponse> {
        require_id("hubs_id", hubs_id)?;
        require_prompt(prompt)?;
        let request = AiAskRequest {
            mode: AiAskMode::SingleItemQa,
            prompt: prompt.to_string(),
            items: vec![AiItem::hub(hubs_id)],
            ai_agent: agent(ai_agent_id),
        };
        Ok(self.client.ai_ask(&request).await?)
    }

    /// Extracts information described by a freeform prompt.
    ///
    /// # Errors
    /// Returns `ControlError` if input is missing or the request fails.
    pub async fn extract_freeform(&self, request: ExtractRequest) -> ControlResult<AiResponse> {
        let ExtractRequest {
            file_ids,
            prompt,
            ai_agent_id,
        } = request;
        require_ids("file_ids", &file_ids)?;
        require_prompt(&prompt)?;
        let request = AiExtractRequest {
            prompt,
            items: file_ids.into_iter().map(AiItem::file).collect(),
            ai_agent: agent(ai_agent_id),
        };
        Ok(self.client.ai_extract(&request).await?)
    }

    /// Extracts structured values by fields or template.
    ///
    /// # Errors
    /// Returns `ControlError` if input is missing or the request fails.
    pub async fn extract_structured(
        &self,
        request: StructuredExtractRequest,
    ) -> ControlResult<AiExtractStructuredResponse> {
        let request = match request {
            StructuredExtractRequest::Fields {
                file_ids,
                fields,
                ai_agent_id,
            } => {
                require_ids("file_ids", &file_ids)?;
                if fields.is_empty() {
                    return Err(ControlError::invalid("fields must contain at least one field"));
                }
                if fields.iter().any(|field| field.key.trim().is_empty()) {
                    return Err(ControlError::invalid("every field needs a key"));
                }
                AiExtractStructuredRequest {
                    items: file_ids.into_iter().map(AiItem::file).collect(),
                    fields: Some(fields),
                    metadata_template: None,
                    ai_agent: agent(ai_agent_id),
                }
            }
            StructuredExtractRequest::Template {
                file_ids,
                template_key,
                ai_agent_id,
            } => {
                require_ids("file_ids", &file_ids)?;
                require_id("template_key", &template_key)?;
                AiExtractStructuredRequest {
                    items: file_ids.into_iter().map(AiItem::file).collect(),
                    fields: None,
                    metadata_template: Some(MetadataTemplateReference::enterprise(template_key)),
                    ai_agent: agent(ai_agent_id),
                }
            }
        };
        Ok(self.client.ai_extract_structured(&request).await?)
    }

    /// Structured extraction using the enhanced extract agent.
    ///
    /// # Errors
    /// Returns `ControlError` if input is missing or the request fails.
    pub async fn extract_structured_enhanced(
        &self,
        request: StructuredExtractRequest,
    ) -> ControlResult<AiExtractStructuredResponse> {
        let enhanced = Some(ENHANCED_EXTRACT_AGENT_ID.to_string());
        let request = match request {
            StructuredExtractRequest::Fields {
                file_ids, fields, ..
            } => StructuredExtractRequest::Fields {
                file_ids,
                fields,
                ai_agent_id: enhanced,
            },
            StructuredExtractRequest::Template {
                file_ids,
                template_key,
                ..
            } => StructuredExtractRequest::Template {
                file_ids,
                template_key,
                ai_agent_id: enhanced,
            },
        };
        self.extract_structured(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::RecordingApi;

    fn answer() -> serde_json::Value {
        json!({"answer": "42", "completion_reason": "done", "created_at": "2024-01-01T00:00:00Z"})
    }

    #[tokio::test]
    async fn multi_file_ask_makes_one_call_with_every_id() {
        let api = Arc::new(RecordingApi::new().respond("ai_ask", answer()));
        let control = BoxControlPlane::new(api.clone());

        let response = control
            .ask_files(AskRequest {
                ids: vec!["1".into(), "2".into(), "3".into()],
                prompt: "Summarize".to_string(),
                ai_agent_id: None,
            })
            .await
            .expect("answer");
        assert_eq!(serde_json::to_value(&response).expect("json"), answer());

        let calls = api.calls_to("ai_ask");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["mode"], json!("multiple_item_qa"));
        assert_eq!(
            calls[0]["items"],
            json!([
                {"id": "1", "type": "file"},
                {"id": "2", "type": "file"},
                {"id": "3", "type": "file"}
            ])
        );
        assert!(calls[0].get("ai_agent").is_none());
    }

    #[tokio::test]
    async fn empty_id_list_is_rejected_locally() {
        let api = Arc::new(RecordingApi::new());
        let control = BoxControlPlane::new(api.clone());
        let err = control
            .ask_files(AskRequest {
                ids: Vec::new(),
                prompt: "Summarize".to_string(),
                ai_agent_id: None,
            })
            .await
            .expect_err("empty ids");
        assert_eq!(err.kind(), "invalid_input");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn hub_ask_uses_hubs_item_type_and_agent() {
        let api = Arc::new(RecordingApi::new().respond("ai_ask", answer()));
        let control = BoxControlPlane::new(api.clone());
        control
            .ask_hub("55", "What is this hub about?", Some("agent-1".to_string()))
            .await
            .expect("answer");

        let call = &api.calls_to("ai_ask")[0];
        assert_eq!(call["items"][0], json!({"id": "55", "type": "hubs"}));
        assert_eq!(call["ai_agent"], json!({"type": "ai_agent_id", "id": "agent-1"}));
    }

    #[tokio::test]
    async fn enhanced_template_extraction_forces_the_enhanced_agent() {
        let api = Arc::new(
            RecordingApi::new().respond("ai_extract_structured", json!({"answer": {"total": 10}})),
        );
        let control = BoxControlPlane::new(api.clone());
        let response = control
            .extract_structured_enhanced(StructuredExtractRequest::Template {
                file_ids: vec!["8".into()],
                template_key: "invoice".to_string(),
                ai_agent_id: Some("ignored".to_string()),
            })
            .await
            .expect("extract");
        assert_eq!(response.answer, Some(json!({"total": 10})));

        let call = &api.calls_to("ai_extract_structured")[0];
        assert_eq!(
            call["metadata_template"],
            json!({"template_key": "invoice", "type": "metadata_template", "scope": "enterprise"})
        );
        assert_eq!(call["ai_agent"]["id"], json!("enhanced_extract_agent"));
        assert!(call.get("fields").is_none());
    }
}
