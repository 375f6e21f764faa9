//! In-memory `BoxApi` that records calls and replays canned responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use box_models::{
    AiAskRequest,
    AiExtractRequest,
    AiExtractStructuredRequest,
    AiExtractStructuredResponse,
    AiResponse,
    ApiErrorBody,
    AuthorizeOutcome,
    Collection,
    CreateFolderRequest,
    CreateMetadataTemplateRequest,
    DocGenBatch,
    DocGenBatchRequest,
    DocGenJob,
    DocGenTag,
    DocGenTemplate,
    DownloadedFile,
    Item,
    MetadataInstance,
    MetadataPatchOperation,
    MetadataTemplate,
    Page,
    SearchQuery,
    UpdateFolderRequest,
    UploadRequest,
    User,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::{ApiError, ApiResult, BoxApi};

enum Reply {
    Value(Value),
    Error(u16, ApiErrorBody),
}

/// A recorded call: method name and its arguments as JSON.
pub type RecordedCall = (String, Value);

#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    downloads: Mutex<VecDeque<DownloadedFile>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response for the next call to `method`.
    pub fn respond(self, method: &str, value: Value) -> Self {
        self.push(method, Reply::Value(value));
        self
    }

    /// Queues a platform error for the next call to `method`.
    pub fn fail(self, method: &str, status: u16, code: &str) -> Self {
        let body = ApiErrorBody {
            status: Some(status),
            code: Some(code.to_string()),
            message: Some(format!("{code} ({status})")),
            ..ApiErrorBody::default()
        };
        self.push(method, Reply::Error(status, body));
        self
    }

    pub fn download(self, content: &[u8], mime_type: Option<&str>) -> Self {
        self.downloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(DownloadedFile {
                content: content.to_vec(),
                mime_type: mime_type.map(str::to_string),
            });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Arguments of every call to `method`, in order.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == method)
            .map(|(_, args)| args)
            .collect()
    }

    fn push(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    fn record(&self, method: &str, args: Value) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((method.to_string(), args));
    }

    fn reply<T: DeserializeOwned>(&self, method: &str, args: Value) -> ApiResult<T> {
        self.record(method, args);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Value(value)) => {
                serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
            }
            Some(Reply::Error(status, body)) => Err(ApiError::status(status, body)),
            None => Err(ApiError::status(
                404,
                ApiErrorBody {
                    status: Some(404),
                    code: Some("not_found".to_string()),
                    message: Some(format!("no canned response for {method}")),
                    ..ApiErrorBody::default()
                },
            )),
        }
    }

    fn reply_unit(&self, method: &str, args: Value) -> ApiResult<()> {
        let _: Value = self.reply(method, args)?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn page_json(page: &Page) -> Value {
    json!({"marker": page.marker, "limit": page.limit})
}

#[async_trait]
impl BoxApi for RecordingApi {
    async fn current_user(&self) -> ApiResult<User> {
        self.reply("current_user", Value::Null)
    }

    async fn authorize(&self) -> ApiResult<AuthorizeOutcome> {
        self.reply("authorize", Value::Null)
    }

    async fn search(&self, query: &SearchQuery) -> ApiResult<Collection<Item>> {
        self.reply("search", to_json(query))
    }

    async fn ai_ask(&self, request: &AiAskRequest) -> ApiResult<AiResponse> {
        self.reply("ai_ask", to_json(request))
    }

    async fn ai_extract(&self, request: &AiExtractRequest) -> ApiResult<AiResponse> {
        self.reply("ai_extract", to_json(request))
    }

    async fn ai_extract_structured(
        &self,
        request: &AiExtractStructuredRequest,
    ) -> ApiResult<AiExtractStructuredResponse> {
        self.reply("ai_extract_structured", to_json(request))
    }

    async fn create_docgen_template(&self, file_id: &str) -> ApiResult<DocGenTemplate> {
        self.reply("create_docgen_template", json!({"file_id": file_id}))
    }

    async fn list_docgen_templates(&self, page: &Page) -> ApiResult<Collection<DocGenTemplate>> {
        self.reply("list_docgen_templates", page_json(page))
    }

    async fn get_docgen_template(&self, template_id: &str) -> ApiResult<DocGenTemplate> {
        self.reply("get_docgen_template", json!({"template_id": template_id}))
    }

    async fn delete_docgen_template(&self, template_id: &str) -> ApiResult<()> {
        self.reply_unit("delete_docgen_template", json!({"template_id": template_id}))
    }

    async fn list_docgen_template_tags(
        &self,
        template_id: &str,
        template_version_id: Option<&str>,
        page: &Page,
    ) -> ApiResult<Collection<DocGenTag>> {
        self.reply(
            "list_docgen_template_tags",
            json!({
                "template_id": template_id,
                "template_version_id": template_version_id,
                "page": page_json(page),
            }),
        )
    }

    async fn list_docgen_template_jobs(
        &self,
        template_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>> {
        self.reply(
            "list_docgen_template_jobs",
            json!({"template_id": template_id, "page": page_json(page)}),
        )
    }

    async fn create_docgen_batch(&self, request: &DocGenBatchRequest) -> ApiResult<DocGenBatch> {
        self.reply("create_docgen_batch", to_json(request))
    }

    async fn get_docgen_job(&self, job_id: &str) -> ApiResult<DocGenJob> {
        self.reply("get_docgen_job", json!({"job_id": job_id}))
    }

    async fn list_docgen_jobs(&self, page: &Page) -> ApiResult<Collection<DocGenJob>> {
        self.reply("list_docgen_jobs", page_json(page))
    }

    async fn list_docgen_batch_jobs(
        &self,
        batch_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>> {
        self.reply(
            "list_docgen_batch_jobs",
            json!({"batch_id": batch_id, "page": page_json(page)}),
        )
    }

    async fn get_file(&self, file_id: &str) -> ApiResult<Item> {
        self.reply("get_file", json!({"file_id": file_id}))
    }

    async fn file_text(&self, file_id: &str) -> ApiResult<String> {
        self.reply("file_text", json!({"file_id": file_id}))
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<DownloadedFile> {
        self.record("download_file", json!({"file_id": file_id}));
        self.downloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| ApiError::Unavailable("no canned download".to_string()))
    }

    async fn upload_file(&self, request: &UploadRequest) -> ApiResult<Item> {
        self.reply(
            "upload_file",
            json!({
                "file_name": request.file_name,
                "folder_id": request.folder_id,
                "content": String::from_utf8_lossy(&request.content),
            }),
        )
    }

    async fn list_folder_items(&self, folder_id: &str, page: &Page) -> ApiResult<Collection<Item>> {
        self.reply(
            "list_folder_items",
            json!({"folder_id": folder_id, "page": page_json(page)}),
        )
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResult<Item> {
        self.reply("create_folder", to_json(request))
    }

    async fn update_folder(
        &self,
        folder_id: &str,
        request: &UpdateFolderRequest,
    ) -> ApiResult<Item> {
        self.reply(
            "update_folder",
            json!({"folder_id": folder_id, "request": to_json(request)}),
        )
    }

    async fn delete_folder(&self, folder_id: &str, recursive: bool) -> ApiResult<()> {
        self.reply_unit(
            "delete_folder",
            json!({"folder_id": folder_id, "recursive": recursive}),
        )
    }

    async fn create_metadata_template(
        &self,
        request: &CreateMetadataTemplateRequest,
    ) -> ApiResult<MetadataTemplate> {
        self.reply("create_metadata_template", to_json(request))
    }

    async fn get_metadata_template(&self, template_key: &str) -> ApiResult<MetadataTemplate> {
        self.reply("get_metadata_template", json!({"template_key": template_key}))
    }

    async fn list_metadata_templates(
        &self,
        page: &Page,
    ) -> ApiResult<Collection<MetadataTemplate>> {
        self.reply("list_metadata_templates", page_json(page))
    }

    async fn delete_metadata_template(&self, template_key: &str) -> ApiResult<()> {
        self.reply_unit("delete_metadata_template", json!({"template_key": template_key}))
    }

    async fn create_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        values: &MetadataInstance,
    ) -> ApiResult<MetadataInstance> {
        self.reply(
            "create_metadata_instance",
            json!({"file_id": file_id, "template_key": template_key, "values": values}),
        )
    }

    async fn get_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
    ) -> ApiResult<MetadataInstance> {
        self.reply(
            "get_metadata_instance",
            json!({"file_id": file_id, "template_key": template_key}),
        )
    }

    async fn update_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        operations: &[MetadataPatchOperation],
    ) -> ApiResult<MetadataInstance> {
        self.reply(
            "update_metadata_instance",
            json!({
                "file_id": file_id,
                "template_key": template_key,
                "operations": to_json(&operations),
            }),
        )
    }

    async fn delete_metadata_instance(&self, file_id: &str, template_key: &str) -> ApiResult<()> {
        self.reply_unit(
            "delete_metadata_instance",
            json!({"file_id": file_id, "template_key": template_key}),
        )
    }
}
