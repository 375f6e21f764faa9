use box_models::schema::{ENTERPRISE_SCOPE, TEMPLATE_SCAN_PAGE_LIMIT};
use box_models::{
    CreateMetadataTemplateRequest,
    MetadataInstance,
    MetadataPatchOperation,
    MetadataTemplate,
    MetadataTemplateField,
    Page,
    PatchOp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Acknowledgement, BoxControlPlane, ControlError, ControlResult, require_id};

/// Input for creating an enterprise metadata template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataTemplateInput {
    pub display_name: String,
    #[serde(default)]
    pub template_key: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub fields: Vec<MetadataTemplateField>,
}

fn is_system_key(key: &str) -> bool {
    key.starts_with('$')
}

/// JSON pointer for a top-level key.
fn pointer(key: &str) -> String {
    format!("/{}", key.replace('~', "~0").replace('/', "~1"))
}

/// Builds the JSON-Patch operations that bring `current` in line with `updates`.
///
/// Keys present in `current` are replaced, new keys are added, and with
/// `remove_missing` every user key of `current` absent from `updates` is
/// removed. System keys (leading `$`) are never touched.
#[must_use]
pub fn metadata_patch(
    current: &MetadataInstance,
    updates: &MetadataInstance,
    remove_missing: bool,
) -> Vec<MetadataPatchOperation> {
    let mut operations: Vec<MetadataPatchOperation> = updates
        .iter()
        .filter(|(key, _)| !is_system_key(key))
        .map(|(key, value)| MetadataPatchOperation {
            op: if current.contains_key(key) {
                PatchOp::Replace
            } else {
                PatchOp::Add
            },
            path: pointer(key),
            value: Some(value.clone()),
        })
        .collect();

    if remove_missing {
        operations.extend(
            current
                .keys()
                .filter(|key| !is_system_key(key) && !updates.contains_key(*key))
                .map(|key| MetadataPatchOperation {
                    op: PatchOp::Remove,
                    path: pointer(key),
                    value: None,
                }),
        );
    }
    operations
}

impl BoxControlPlane {
    /// Creates an enterprise metadata template.
    ///
    /// # Errors
    /// Returns `ControlError` if the display name is blank or the request fails.
    pub async fn create_metadata_template(
        &self,
        input: MetadataTemplateInput,
    ) -> ControlResult<MetadataTemplate> {
        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(ControlError::invalid("display_name is required"));
        }
        let request = CreateMetadataTemplateRequest {
            scope: ENTERPRISE_SCOPE.to_string(),
            display_name,
            template_key: input
                .template_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            hidden: input.hidden,
            fields: input.fields,
        };
        let template = self.client.create_metadata_template(&request).await?;
        info!(template_key = ?template.template_key, "metadata template created");
        Ok(template)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn get_metadata_template(&self, template_key: &str) -> ControlResult<MetadataTemplate> {
        require_id("template_key", template_key)?;
        Ok(self.client.get_metadata_template(template_key).await?)
    }

    /// Finds an enterprise template by display name, ignoring case.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` when no template has that name.
    pub async fn get_metadata_template_by_name(
        &self,
        display_name: &str,
    ) -> ControlResult<MetadataTemplate> {
        let wanted = display_name.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(ControlError::invalid("template_name is required"));
        }
        let mut page = Page::new(None, Some(TEMPLATE_SCAN_PAGE_LIMIT));
        loop {
            let templates = self.client.list_metadata_templates(&page).await?;
            let next = templates.next_page_marker().map(str::to_string);
            if let Some(found) = templates.entries.into_iter().find(|template| {
                template
                    .display_name
                    .as_deref()
                    .is_some_and(|name| name.trim().to_lowercase() == wanted)
            }) {
                return Ok(found);
            }
            match next {
                Some(marker) => page.marker = Some(marker),
                None => {
                    return Err(ControlError::NotFound(format!(
                        "no metadata template named {}",
                        display_name.trim()
                    )));
                }
            }
        }
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn delete_metadata_template(&self, template_key: &str) -> ControlResult<Acknowledgement> {
        require_id("template_key", template_key)?;
        self.client.delete_metadata_template(template_key).await?;
        Ok(Acknowledgement::new(
            template_key,
            format!("Metadata template {template_key} deleted successfully"),
        ))
    }

    /// Applies a metadata instance to a file.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn set_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        metadata: MetadataInstance,
    ) -> ControlResult<MetadataInstance> {
        require_id("file_id", file_id)?;
        require_id("template_key", template_key)?;
        Ok(self
            .client
            .create_metadata_instance(file_id, template_key, &metadata)
            .await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn get_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
    ) -> ControlResult<MetadataInstance> {
        require_id("file_id", file_id)?;
        require_id("template_key", template_key)?;
        Ok(self.client.get_metadata_instance(file_id, template_key).await?)
    }

    /// Updates an instance in place from the given values.
    ///
    /// An update that changes nothing returns the current instance without
    /// a write.
    ///
    /// # Errors
    /// Returns `ControlError` if reading or patching the instance fails.
    pub async fn update_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        metadata: MetadataInstance,
        remove_non_included_data: bool,
    ) -> ControlResult<MetadataInstance> {
        require_id("file_id", file_id)?;
        require_id("template_key", template_key)?;
        let current = self.client.get_metadata_instance(file_id, template_key).await?;
        let operations = metadata_patch(&current, &metadata, remove_non_included_data);
        if operations.is_empty() {
            return Ok(current);
        }
        debug!(file_id, template_key, operations = operations.len(), "patching metadata instance");
        Ok(self
            .client
            .update_metadata_instance(file_id, template_key, &operations)
            .await?)
    }

    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn delete_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
    ) -> ControlResult<Acknowledgement> {
        require_id("file_id", file_id)?;
        require_id("template_key", template_key)?;
        self.client.delete_metadata_instance(file_id, template_key).await?;
        Ok(Acknowledgement::new(
            file_id,
            format!("Metadata instance {template_key} removed from file {file_id}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::testing::RecordingApi;

    fn instance(value: Value) -> MetadataInstance {
        serde_json::from_value(value).expect("instance")
    }

    #[test]
    fn patch_replaces_adds_and_optionally_removes() {
        let current = instance(json!({
            "$id": "abc", "$template": "invoice",
            "amount": 10, "vendor": "Acme", "notes": "old"
        }));
        let updates = instance(json!({"amount": 12, "due": "2024-10-01", "$type": "x"}));

        let keep = metadata_patch(&current, &updates, false);
        assert_eq!(
            serde_json::to_value(&keep).expect("json"),
            json!([
                {"op": "replace", "path": "/amount", "value": 12},
                {"op": "add", "path": "/due", "value": "2024-10-01"}
            ])
        );

        let prune = metadata_patch(&current, &updates, true);
        let mut removed: Vec<&str> = prune
            .iter()
            .filter(|operation| operation.op == PatchOp::Remove)
            .map(|operation| operation.path.as_str())
            .collect();
        removed.sort_unstable();
        assert_eq!(removed, vec!["/notes", "/vendor"]);
    }

    #[test]
    fn pointer_escapes_reserved_characters() {
        assert_eq!(pointer("a/b~c"), "/a~1b~0c");
    }

    #[tokio::test]
    async fn update_reads_then_patches() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_metadata_instance", json!({"$template": "invoice", "amount": 10}))
                .respond("update_metadata_instance", json!({"$template": "invoice", "amount": 11})),
        );
        let updated = BoxControlPlane::new(api.clone())
            .update_metadata_instance("12", "invoice", instance(json!({"amount": 11})), false)
            .await
            .expect("update");
        assert_eq!(updated.get("amount"), Some(&json!(11)));
        assert_eq!(
            api.calls_to("update_metadata_instance")[0]["operations"],
            json!([{"op": "replace", "path": "/amount", "value": 11}])
        );
    }

    #[tokio::test]
    async fn template_lookup_by_display_name() {
        let api = Arc::new(RecordingApi::new().respond(
            "list_metadata_templates",
            json!({"entries": [
                {"templateKey": "invoice", "displayName": "Invoice Data", "scope": "enterprise_1", "fields": []}
            ]}),
        ));
        let template = BoxControlPlane::new(api)
            .get_metadata_template_by_name("invoice data")
            .await
            .expect("template");
        assert_eq!(template.template_key.as_deref(), Some("invoice"));
    }

    #[tokio::test]
    async fn create_scopes_templates_to_the_enterprise() {
        let api = Arc::new(RecordingApi::new().respond(
            "create_metadata_template",
            json!({"templateKey": "contract", "displayName": "Contract", "fields": []}),
        ));
        BoxControlPlane::new(api.clone())
            .create_metadata_template(MetadataTemplateInput {
                display_name: "Contract".to_string(),
                template_key: Some(" ".to_string()),
                hidden: None,
                fields: vec![MetadataTemplateField {
                    field_type: "string".to_string(),
                    key: "party".to_string(),
                    display_name: "Party".to_string(),
                    description: None,
                    hidden: None,
                    options: None,
                    extra: serde_json::Map::new(),
                }],
            })
            .await
            .expect("template");
        assert_eq!(
            api.calls_to("create_metadata_template")[0],
            json!({
                "scope": "enterprise",
                "displayName": "Contract",
                "fields": [{"type": "string", "key": "party", "displayName": "Party"}]
            })
        );
    }
}
