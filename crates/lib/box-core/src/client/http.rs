use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use box_models::schema::{
    DOCGEN_API_VERSION,
    ENTERPRISE_SCOPE,
    EXTRACTED_TEXT_REPRESENTATION,
    FOLDER_ITEM_FIELDS,
    HEADER_BOX_VERSION,
    HEADER_REP_HINTS,
    MIME_OCTET_STREAM,
    PATH_AI_ASK,
    PATH_AI_EXTRACT,
    PATH_AI_EXTRACT_STRUCTURED,
    PATH_DOCGEN_BATCHES,
    PATH_DOCGEN_BATCH_JOBS,
    PATH_DOCGEN_JOBS,
    PATH_DOCGEN_TEMPLATES,
    PATH_DOCGEN_TEMPLATE_JOBS,
    PATH_FILES,
    PATH_FOLDERS,
    PATH_METADATA_TEMPLATES,
    PATH_SEARCH,
    PATH_UPLOAD,
    PATH_USERS_ME,
    REPRESENTATION_ASSET_PLACEHOLDER,
    guess_mime_type,
    is_textual_mime,
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
    DocGenTemplateRequest,
    DownloadedFile,
    FileRepresentations,
    Item,
    ItemRef,
    MetadataInstance,
    MetadataPatchOperation,
    MetadataTemplate,
    Page,
    ParentRef,
    Representation,
    SearchQuery,
    UpdateFolderRequest,
    UploadAttributes,
    UploadRequest,
    User,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{ApiError, ApiResult, BoxApi, BoxEndpoints};
use crate::auth::Authenticator;

const DEFAULT_REPRESENTATION_ATTEMPTS: u32 = 10;
const DEFAULT_REPRESENTATION_INTERVAL: Duration = Duration::from_secs(1);
const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// `BoxApi` over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpBoxClient {
    http: reqwest::Client,
    endpoints: BoxEndpoints,
    auth: Arc<Authenticator>,
    representation_attempts: u32,
    representation_interval: Duration,
}

impl HttpBoxClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoints: BoxEndpoints, auth: Arc<Authenticator>) -> Self {
        Self {
            http,
            endpoints,
            auth,
            representation_attempts: DEFAULT_REPRESENTATION_ATTEMPTS,
            representation_interval: DEFAULT_REPRESENTATION_INTERVAL,
        }
    }

    /// Overrides how long text extraction waits for a pending representation.
    #[must_use]
    pub const fn with_representation_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.representation_attempts = attempts;
        self.representation_interval = interval;
        self
    }

    #[must_use]
    pub const fn endpoints(&self) -> &BoxEndpoints {
        &self.endpoints
    }

    fn api_url(&self, path: &str, segments: &[&str]) -> ApiResult<Url> {
        build_url(&self.endpoints.api_base, path, segments)
    }

    fn upload_url(&self, path: &str, segments: &[&str]) -> ApiResult<Url> {
        build_url(&self.endpoints.upload_base, path, segments)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let token = self.auth.bearer().await?;
        let response = request.bearer_auth(token).send().await?;
        check(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        decode(self.send(self.http.get(url)).await?).await
    }

    async fn docgen_get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let request = self
            .http
            .get(url)
            .header(HEADER_BOX_VERSION, DOCGEN_API_VERSION);
        decode(self.send(request).await?).await
    }

    async fn upload_new_version(
        &self,
        file_id: &str,
        request: &UploadRequest,
    ) -> ApiResult<Item> {
        info!(file_id, name = %request.file_name, "uploading a new version of an existing file");
        let url = self.upload_url(PATH_FILES, &[file_id, "content"])?;
        let attributes = serde_json::json!({ "name": request.file_name });
        let form = upload_form(&attributes, request)?;
        let response = self.send(self.http.post(url).multipart(form)).await?;
        first_uploaded_entry(decode(response).await?)
    }

    async fn await_representation(&self, mut representation: Representation) -> ApiResult<Representation> {
        let mut attempts = 0;
        loop {
            let state = representation
                .status
                .as_ref()
                .map_or("none", |status| status.state.as_str());
            match state {
                "success" => return Ok(representation),
                "error" => {
                    return Err(ApiError::Unavailable(
                        "text extraction failed for this file".to_string(),
                    ));
                }
                _ if attempts >= self.representation_attempts => {
                    return Err(ApiError::Unavailable(
                        "text extraction did not finish in time; try again shortly".to_string(),
                    ));
                }
                _ => {}
            }

            let info_url = representation
                .info
                .as_ref()
                .map(|info| info.url.clone())
                .ok_or_else(|| ApiError::Decode("representation without info url".to_string()))?;
            if attempts > 0 {
                tokio::time::sleep(self.representation_interval).await;
            }
            attempts += 1;
            debug!(state, attempts, "waiting for extracted text representation");
            let url = Url::parse(&info_url)
                .map_err(|err| ApiError::InvalidUrl(format!("{info_url}: {err}")))?;
            representation = self.get_json(url).await?;
        }
    }

    async fn download_text(&self, file_id: &str, file_name: Option<&str>) -> ApiResult<String> {
        let downloaded = self.download_file(file_id).await?;
        let textual = downloaded
            .mime_type
            .as_deref()
            .filter(|mime| *mime != MIME_OCTET_STREAM)
            .or_else(|| file_name.and_then(guess_mime_type))
            .is_some_and(is_textual_mime);
        if !textual {
            return Err(ApiError::Unavailable(
                "no text representation is available for this file".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&downloaded.content).into_owned())
    }
}

fn build_url(base: &str, path: &str, segments: &[&str]) -> ApiResult<Url> {
    let raw = format!("{}{path}", base.trim_end_matches('/'));
    let mut url = Url::parse(&raw).map_err(|err| ApiError::InvalidUrl(format!("{raw}: {err}")))?;
    if !segments.is_empty() {
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(raw.clone()))?
            .extend(segments);
    }
    Ok(url)
}

fn with_page(mut url: Url, page: &Page) -> Url {
    {
        let mut query = url.query_pairs_mut();
        if let Some(marker) = page.marker.as_deref() {
            query.append_pair("marker", marker);
        }
        if let Some(limit) = page.limit {
            query.append_pair("limit", &limit.to_string());
        }
    }
    strip_empty_query(url)
}

/// `query_pairs_mut` leaves a dangling `?` when nothing was appended.
fn strip_empty_query(mut url: Url) -> Url {
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

async fn check(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ApiErrorBody>(&raw).unwrap_or_else(|_| ApiErrorBody {
        status: Some(status.as_u16()),
        message: (!raw.trim().is_empty()).then_some(raw),
        ..ApiErrorBody::default()
    });
    Err(ApiError::status(status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
}

fn upload_form<A: serde::Serialize>(attributes: &A, request: &UploadRequest) -> ApiResult<Form> {
    let attributes =
        serde_json::to_string(attributes).map_err(|err| ApiError::Decode(err.to_string()))?;
    let part = Part::bytes(request.content.clone()).file_name(request.file_name.clone());
    Ok(Form::new().text("attributes", attributes).part("file", part))
}

fn first_uploaded_entry(uploaded: Collection<Item>) -> ApiResult<Item> {
    uploaded
        .entries
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Decode("upload response contained no entries".to_string()))
}

fn metadata_instance_segments<'a>(file_id: &'a str, template_key: &'a str) -> [&'a str; 4] {
    [file_id, "metadata", ENTERPRISE_SCOPE, template_key]
}

#[async_trait]
impl BoxApi for HttpBoxClient {
    async fn current_user(&self) -> ApiResult<User> {
        self.get_json(self.api_url(PATH_USERS_ME, &[])?).await
    }

    async fn authorize(&self) -> ApiResult<AuthorizeOutcome> {
        self.auth.authorize().await
    }

    async fn search(&self, query: &SearchQuery) -> ApiResult<Collection<Item>> {
        let mut url = self.api_url(PATH_SEARCH, &[])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &query.query);
            if !query.file_extensions.is_empty() {
                pairs.append_pair("file_extensions", &query.file_extensions.join(","));
            }
            if !query.content_types.is_empty() {
                let content_types: Vec<&str> =
                    query.content_types.iter().map(|kind| kind.as_str()).collect();
                pairs.append_pair("content_types", &content_types.join(","));
            }
            if !query.ancestor_folder_ids.is_empty() {
                pairs.append_pair("ancestor_folder_ids", &query.ancestor_folder_ids.join(","));
            }
            if let Some(item_type) = query.item_type.as_deref() {
                pairs.append_pair("type", item_type);
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        self.get_json(url).await
    }

    async fn ai_ask(&self, request: &AiAskRequest) -> ApiResult<AiResponse> {
        let url = self.api_url(PATH_AI_ASK, &[])?;
        decode(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn ai_extract(&self, request: &AiExtractRequest) -> ApiResult<AiResponse> {
        let url = self.api_url(PATH_AI_EXTRACT, &[])?;
        decode(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn ai_extract_structured(
        &self,
        request: &AiExtractStructuredRequest,
    ) -> ApiResult<AiExtractStructuredResponse> {
        let url = self.api_url(PATH_AI_EXTRACT_STRUCTURED, &[])?;
        decode(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn create_docgen_template(&self, file_id: &str) -> ApiResult<DocGenTemplate> {
        let url = self.api_url(PATH_DOCGEN_TEMPLATES, &[])?;
        let body = DocGenTemplateRequest {
            file: ItemRef::file(file_id),
        };
        let request = self
            .http
            .post(url)
            .header(HEADER_BOX_VERSION, DOCGEN_API_VERSION)
            .json(&body);
        decode(self.send(request).await?).await
    }

    async fn list_docgen_templates(&self, page: &Page) -> ApiResult<Collection<DocGenTemplate>> {
        let url = with_page(self.api_url(PATH_DOCGEN_TEMPLATES, &[])?, page);
        self.docgen_get(url).await
    }

    async fn get_docgen_template(&self, template_id: &str) -> ApiResult<DocGenTemplate> {
        self.docgen_get(self.api_url(PATH_DOCGEN_TEMPLATES, &[template_id])?)
            .await
    }

    async fn delete_docgen_template(&self, template_id: &str) -> ApiResult<()> {
        let url = self.api_url(PATH_DOCGEN_TEMPLATES, &[template_id])?;
        let request = self
            .http
            .delete(url)
            .header(HEADER_BOX_VERSION, DOCGEN_API_VERSION);
        self.send(request).await?;
        Ok(())
    }

    async fn list_docgen_template_tags(
        &self,
        template_id: &str,
        template_version_id: Option<&str>,
        page: &Page,
    ) -> ApiResult<Collection<DocGenTag>> {
        let mut url = self.api_url(PATH_DOCGEN_TEMPLATES, &[template_id, "tags"])?;
        if let Some(version) = template_version_id {
            url.query_pairs_mut()
                .append_pair("template_version_id", version);
        }
        self.docgen_get(with_page(url, page)).await
    }

    async fn list_docgen_template_jobs(
        &self,
        template_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>> {
        let url = self.api_url(PATH_DOCGEN_TEMPLATE_JOBS, &[template_id])?;
        self.docgen_get(with_page(url, page)).await
    }

    async fn create_docgen_batch(&self, request: &DocGenBatchRequest) -> ApiResult<DocGenBatch> {
        let url = self.api_url(PATH_DOCGEN_BATCHES, &[])?;
        let request = self
            .http
            .post(url)
            .header(HEADER_BOX_VERSION, DOCGEN_API_VERSION)
            .json(request);
        decode(self.send(request).await?).await
    }

    async fn get_docgen_job(&self, job_id: &str) -> ApiResult<DocGenJob> {
        self.docgen_get(self.api_url(PATH_DOCGEN_JOBS, &[job_id])?)
            .await
    }

    async fn list_docgen_jobs(&self, page: &Page) -> ApiResult<Collection<DocGenJob>> {
        let url = with_page(self.api_url(PATH_DOCGEN_JOBS, &[])?, page);
        self.docgen_get(url).await
    }

    async fn list_docgen_batch_jobs(
        &self,
        batch_id: &str,
        page: &Page,
    ) -> ApiResult<Collection<DocGenJob>> {
        let url = self.api_url(PATH_DOCGEN_BATCH_JOBS, &[batch_id])?;
        self.docgen_get(with_page(url, page)).await
    }

    async fn get_file(&self, file_id: &str) -> ApiResult<Item> {
        self.get_json(self.api_url(PATH_FILES, &[file_id])?).await
    }

    async fn file_text(&self, file_id: &str) -> ApiResult<String> {
        let mut url = self.api_url(PATH_FILES, &[file_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "name,representations");
        let request = self
            .http
            .get(url)
            .header(HEADER_REP_HINTS, format!("[{EXTRACTED_TEXT_REPRESENTATION}]"));
        let file: FileRepresentations = decode(self.send(request).await?).await?;

        let representation = file.representations.and_then(|list| {
            list.entries
                .into_iter()
                .find(|entry| entry.representation == EXTRACTED_TEXT_REPRESENTATION)
        });
        let Some(representation) = representation else {
            debug!(file_id, "no extracted text representation, downloading content");
            return self.download_text(file_id, file.name.as_deref()).await;
        };

        let representation = self.await_representation(representation).await?;
        let template = representation
            .content
            .map(|content| content.url_template)
            .ok_or_else(|| ApiError::Decode("representation without content url".to_string()))?;
        let content_url = template.replace(REPRESENTATION_ASSET_PLACEHOLDER, "");
        let url = Url::parse(&content_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{content_url}: {err}")))?;
        let response = self.send(self.http.get(url)).await?;
        Ok(response.text().await?)
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<DownloadedFile> {
        let url = self.api_url(PATH_FILES, &[file_id, "content"])?;
        let response = self.send(self.http.get(url)).await?;
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());
        let content = response.bytes().await?.to_vec();
        Ok(DownloadedFile { content, mime_type })
    }

    async fn upload_file(&self, request: &UploadRequest) -> ApiResult<Item> {
        let url = self.upload_url(PATH_UPLOAD, &[])?;
        let attributes = UploadAttributes {
            name: request.file_name.clone(),
            parent: ParentRef {
                id: request.folder_id.clone(),
            },
        };
        let form = upload_form(&attributes, request)?;
        match self.send(self.http.post(url).multipart(form)).await {
            Ok(response) => first_uploaded_entry(decode(response).await?),
            Err(ApiError::Status { status: 409, body }) => match body.conflicting_item_id() {
                Some(existing) => self.upload_new_version(&existing, request).await,
                None => Err(ApiError::Status { status: 409, body }),
            },
            Err(err) => Err(err),
        }
    }

    async fn list_folder_items(&self, folder_id: &str, page: &Page) -> ApiResult<Collection<Item>> {
        let mut url = self.api_url(PATH_FOLDERS, &[folder_id, "items"])?;
        url.query_pairs_mut()
            .append_pair("fields", FOLDER_ITEM_FIELDS)
            .append_pair("usemarker", "true");
        self.get_json(with_page(url, page)).await
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResult<Item> {
        let url = self.api_url(PATH_FOLDERS, &[])?;
        decode(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn update_folder(
        &self,
        folder_id: &str,
        request: &UpdateFolderRequest,
    ) -> ApiResult<Item> {
        let url = self.api_url(PATH_FOLDERS, &[folder_id])?;
        decode(self.send(self.http.put(url).json(request)).await?).await
    }

    async fn delete_folder(&self, folder_id: &str, recursive: bool) -> ApiResult<()> {
        let mut url = self.api_url(PATH_FOLDERS, &[folder_id])?;
        url.query_pairs_mut()
            .append_pair("recursive", if recursive { "true" } else { "false" });
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_metadata_template(
        &self,
        request: &CreateMetadataTemplateRequest,
    ) -> ApiResult<MetadataTemplate> {
        let url = self.api_url(PATH_METADATA_TEMPLATES, &["schema"])?;
        decode(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn get_metadata_template(&self, template_key: &str) -> ApiResult<MetadataTemplate> {
        let url = self.api_url(
            PATH_METADATA_TEMPLATES,
            &[ENTERPRISE_SCOPE, template_key, "schema"],
        )?;
        self.get_json(url).await
    }

    async fn list_metadata_templates(
        &self,
        page: &Page,
    ) -> ApiResult<Collection<MetadataTemplate>> {
        let url = self.api_url(PATH_METADATA_TEMPLATES, &[ENTERPRISE_SCOPE])?;
        self.get_json(with_page(url, page)).await
    }

    async fn delete_metadata_template(&self, template_key: &str) -> ApiResult<()> {
        let url = self.api_url(
            PATH_METADATA_TEMPLATES,
            &[ENTERPRISE_SCOPE, template_key, "schema"],
        )?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        values: &MetadataInstance,
    ) -> ApiResult<MetadataInstance> {
        let url = self.api_url(
            PATH_FILES,
            &metadata_instance_segments(file_id, template_key),
        )?;
        decode(self.send(self.http.post(url).json(values)).await?).await
    }

    async fn get_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
    ) -> ApiResult<MetadataInstance> {
        let url = self.api_url(
            PATH_FILES,
            &metadata_instance_segments(file_id, template_key),
        )?;
        self.get_json(url).await
    }

    async fn update_metadata_instance(
        &self,
        file_id: &str,
        template_key: &str,
        operations: &[MetadataPatchOperation],
    ) -> ApiResult<MetadataInstance> {
        let url = self.api_url(
            PATH_FILES,
            &metadata_instance_segments(file_id, template_key),
        )?;
        let body =
            serde_json::to_vec(operations).map_err(|err| ApiError::Decode(err.to_string()))?;
        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
            .body(body);
        decode(self.send(request).await?).await
    }

    async fn delete_metadata_instance(&self, file_id: &str, template_key: &str) -> ApiResult<()> {
        let url = self.api_url(
            PATH_FILES,
            &metadata_instance_segments(file_id, template_key),
        )?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}
