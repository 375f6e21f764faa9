//! Box API client interface and its HTTP implementation.
//!
//! `BoxApi` is the seam between the control plane and the network: one method
//! per remote call, typed requests in, typed records out.

pub mod http;

use async_trait::async_trait;
use box_models::schema::{
    DEFAULT_API_BASE_URL,
    DEFAULT_AUTHORIZE_URL,
    DEFAULT_UPLOAD_BASE_URL,
};
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

pub use http::HttpBoxClient;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to Box failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Box API returned {status}: {}", error_message(.body))]
    Status { status: u16, body: Box<ApiErrorBody> },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("unexpected response from Box: {0}")]
    Decode(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    #[must_use]
    pub fn status(status: u16, body: ApiErrorBody) -> Self {
        Self::Status {
            status,
            body: Box::new(body),
        }
    }

    /// HTTP status reported by the platform, if this error came from a response.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Platform error code such as `not_found` or `item_name_in_use`.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body.code.as_deref(),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn error_message(body: &ApiErrorBody) -> &str {
    body.message
        .as_deref()
        .or(body.code.as_deref())
        .unwrap_or("no error message")
}

/// Hosts the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxEndpoints {
    pub api_base: String,
    pub upload_base: String,
    pub authorize_url: String,
}

impl BoxEndpoints {
    /// Points API and upload calls at a single host, as test servers do.
    #[must_use]
    pub fn single_host(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            api_base: base.clone(),
            upload_base: base.clone(),
            authorize_url: format!("{}/oauth2/authorize", base.trim_end_matches('/')),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_upload_base(mut self, upload_base: impl Into<String>) -> Self {
        self.upload_base = upload_base.into();
        self
    }

    #[must_use]
    pub fn with_authorize_url(mut self, authorize_url: impl Into<String>) -> Self {
        self.authorize_url = authorize_url.into();
        self
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base.trim_end_matches('/'),
            box_models::schema::PATH_TOKEN
        )
    }
}

impl Default for BoxEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE_URL.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
        }
    }
}

/// Remote operations used by the control plane.
#[async_trait]
pub trait BoxApi: Send + Sync {
    async fn current_user(&self) -> ApiResult<User>;

    /// Starts or refreshes authorization of the application.
    async fn authorize(&self) -> ApiResult<AuthorizeOutcome>;

    async fn search(&self, query: &SearchQuery) -> ApiResult<Collection<Item>>;

    async fn ai_ask(&self, request: &AiAskRequest) -> ApiResult<AiResponse>;

    async fn ai_extract(&self, request: &AiExtractRequest) -> ApiResult<AiResponse>;

    async fn ai_extract_structured(
        &self,
        request: &AiExtractStructuredRequest,
    ) -> ApiResult<AiExtractStructuredResponse>;

    async fn create_docgen_template(&self, file_id: &str) -> ApiResult<DocGenTemplate>;

    async fn list_docgen_templates(&self, page: &Page) -> ApiResult<Collection<DocGenTemplate>>;

    async fn get_docgen_template(&self, template_id: &str) -> ApiResult<DocGenTemplate>;

    async fn delete_docgen_template(&self, template_id: &str) -> ApiResult<()>;

    async fn list_docgen_template_tags(
        &self,
        template_id: &str,
        template_version_id: Option<&str>,
        page: &Page,
    ) -> ApiResult<Collection<DocGenTag>>;

    async fn list_docgen_template_jobs(
        &self,
        template_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>>;

    async fn create_docgen_batch(&self, request: &DocGenBatchRequest) -> ApiResult<DocGenBatch>;

    async fn get_docgen_job(&self, job_id: &str) -> ApiResult<DocGenJob>;

    async fn list_docgen_jobs(&self, page: &Page) -> ApiResult<Collection<DocGenJob>>;

    async fn list_docgen_batch_jobs(
        &self,
        batch_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>>;

    async fn get_file(&self, file_id: &str) -> ApiResult<Item>;

    /// Plain text of a file, from its extracted text representation.
    async fn file_text(&self, file_id: &str) -> ApiResult<String>;

    async fn download_file(&self, file_id: &str) -> ApiResult<DownloadedFile>;

    async fn upload_file(&self, request: &UploadRequest) -> ApiResult<Item>;

    async fn list_folder_items(&self, folder_id: &str, page: &Page) -> ApiResult<Collection<Item>>;

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResult<Item>;

    async fn update_folder(&self, folder_id: &str, request: &UpdateFolderRequest)
    -> ApiResult<Item>;

    async fn delete_folder(&self, folder_id: &str, recursive: bool) -> ApiResult<()>;

    async fn create_metadata_template(
        &self,
        request: &CreateMetadataTemplateRequest,
    ) -> ApiResult<MetadataTemplate>;

    async fn get_metadata_template(&self, template_key: &str) -> ApiResult<MetadataTemplate>;

    async fn list_metadata_templates(&self, page: &Page)
    -> ApiResult<Collection<MetadataTemplate>>;

    async fn delete_metadata_template(&self, template_key: &str) -> ApiResult<()>;

    async fn create_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        values: &MetadataInstance,
    ) -> ApiResult<MetadataInstance>;

    async fn get_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
    ) -> ApiResult<MetadataInstance>;

    async fn update_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        operations: &[MetadataPatchOperation],
    ) -> ApiResult<MetadataInstance>;

    async fn delete_metadata_instance(&self, file_id: &str, template_key: &str) -> ApiResult<()>;
}
