use box_core::control::{DownloadContent, DownloadRequest, UploadContentRequest, UploadPathRequest};
use box_models::BoxId;
use box_models::schema::MIME_OCTET_STREAM;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ErrorCode},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{BoxMcp, helpers};

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FileIdParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
}

/// Parameters for uploading a file from the server's filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UploadFromPathParams {
    /// Local path; `~` expands to the home directory.
    pub file_path: String,
    /// Destination folder; the root folder when omitted.
    #[serde(default)]
    #[schemars(with = "Option<crate::helpers::IdSchema>")]
    pub folder_id: Option<BoxId>,
    /// Name in Box; the local file name when omitted.
    #[serde(default)]
    pub new_file_name: Option<String>,
}

/// Parameters for uploading inline content.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UploadFromContentParams {
    pub content: String,
    pub file_name: String,
    #[serde(default)]
    #[schemars(with = "Option<crate::helpers::IdSchema>")]
    pub folder_id: Option<BoxId>,
    /// Set when `content` is base64 encoded binary data.
    #[serde(default)]
    pub is_base64: Option<bool>,
}

/// Parameters for downloading a file.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DownloadParams {
    #[schemars(with = "crate::helpers::IdSchema")]
    pub file_id: BoxId,
    /// Also write the file to the local filesystem.
    #[serde(default)]
    pub save_file: Option<bool>,
    /// Target file or directory; the temp directory when omitted.
    #[serde(default)]
    pub save_path: Option<String>,
}

fn optional_id(id: Option<BoxId>) -> Option<String> {
    id.map(BoxId::into_string)
}

#[tool_router(router = tool_router_files, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Read the text content of a Box file.")]
    async fn box_read(
        &self,
        Parameters(params): Parameters<FileIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.read_text(params.file_id.as_str()).await)
    }

    #[tool(description = "Upload a local file to a Box folder.")]
    async fn box_upload_file_from_path(
        &self,
        Parameters(params): Parameters<UploadFromPathParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .upload_from_path(UploadPathRequest {
                    file_path: params.file_path,
                    folder_id: optional_id(params.folder_id),
                    new_file_name: params.new_file_name,
                })
                .await,
        )
    }

    #[tool(description = "Upload text or base64 content as a file to a Box folder.")]
    async fn box_upload_file_from_content(
        &self,
        Parameters(params): Parameters<UploadFromContentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(
            control
                .upload_from_content(UploadContentRequest {
                    content: params.content,
                    file_name: params.file_name,
                    folder_id: optional_id(params.folder_id),
                    is_base64: params.is_base64.unwrap_or(false),
                })
                .await,
        )
    }

    #[tool(description = "Download a Box file. Text is returned inline, images as image content; other types can be saved locally.")]
    async fn box_download_file(
        &self,
        Parameters(params): Parameters<DownloadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        let request = DownloadRequest {
            file_id: params.file_id.into_string(),
            save_file: params.save_file.unwrap_or(false),
            save_path: params.save_path,
        };
        let outcome = match control.download(request).await {
            Ok(outcome) => outcome,
            Err(err) => return Ok(helpers::failure(&err)),
        };
        let image = match &outcome.content {
            DownloadContent::Image { base64 } => Some(base64.clone()),
            _ => None,
        };
        let Some(base64) = image else {
            return helpers::render(Ok(outcome));
        };
        // The image travels as image content; the JSON summary omits its payload.
        let mut summary = serde_json::to_value(&outcome)
            .map_err(|err| helpers::mcp_err(ErrorCode::INTERNAL_ERROR, err.to_string()))?;
        if let Some(fields) = summary.as_object_mut() {
            fields.remove("base64");
        }
        let mime_type = outcome.mime_type.as_deref().unwrap_or(MIME_OCTET_STREAM);
        Ok(CallToolResult::success(vec![
            Content::json(summary)?,
            Content::image(base64, mime_type.to_string()),
        ]))
    }
}
