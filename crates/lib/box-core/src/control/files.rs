use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use box_models::schema::{MIME_OCTET_STREAM, ROOT_FOLDER_ID, guess_mime_type, is_image_mime, is_textual_mime};
use box_models::UploadRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BoxControlPlane, ControlError, ControlResult, require_id};
use crate::paths::{expand_home, file_name};

/// Upload of a file from the server's filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPathRequest {
    pub file_path: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub new_file_name: Option<String>,
}

/// Upload of inline content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadContentRequest {
    pub content: String,
    pub file_name: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub is_base64: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadOutcome {
    pub id: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub file_id: String,
    #[serde(default)]
    pub save_file: bool,
    #[serde(default)]
    pub save_path: Option<String>,
}

/// What the download returned, by content class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadContent {
    Text { text: String },
    Image { base64: String },
    /// Textual type whose bytes are not valid UTF-8.
    Undecodable,
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub file_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    pub message: String,
    #[serde(flatten)]
    pub content: DownloadContent,
}

fn folder_or_root(folder_id: Option<String>) -> String {
    folder_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ROOT_FOLDER_ID.to_string())
}

fn uploaded(id: String, name: String) -> UploadOutcome {
    let message = format!("File uploaded successfully. File ID: {id}, Name: {name}");
    UploadOutcome { id, name, message }
}

/// Where a downloaded file is written: the temp directory by default, or
/// inside `save_path` when it names an existing directory.
fn save_target(save_path: Option<&str>, file_name: &str) -> PathBuf {
    let Some(save_path) = save_path.map(str::trim).filter(|path| !path.is_empty()) else {
        return std::env::temp_dir().join(file_name);
    };
    let path = expand_home(save_path);
    if path.is_dir() {
        path.join(file_name)
    } else {
        path
    }
}

fn classify(content: &[u8], mime_type: Option<&str>) -> DownloadContent {
    match mime_type {
        Some(mime) if is_textual_mime(mime) => match std::str::from_utf8(content) {
            Ok(text) => DownloadContent::Text {
                text: text.to_string(),
            },
            Err(_) => DownloadContent::Undecodable,
        },
        Some(mime) if is_image_mime(mime) => DownloadContent::Image {
            base64: STANDARD.encode(content),
        },
        _ => DownloadContent::Unsupported,
    }
}

fn download_message(
    content: &DownloadContent,
    file_name: &str,
    mime_type: Option<&str>,
    saved_to: Option<&Path>,
) -> String {
    let mut message = saved_to
        .map(|path| format!("File saved to: {}\n\n", path.display()))
        .unwrap_or_default();
    let mime = mime_type.unwrap_or("unknown");
    match content {
        DownloadContent::Text { .. } => {
            message.push_str(&format!("File downloaded successfully: {file_name}"));
        }
        DownloadContent::Image { .. } => {
            message.push_str(&format!(
                "Image downloaded successfully: {file_name}\nMIME type: {mime}"
            ));
        }
        DownloadContent::Undecodable => message.push_str(&format!(
            "File {file_name} is a document but couldn't be decoded as text. It may be in a binary format."
        )),
        DownloadContent::Unsupported if saved_to.is_some() => message.push_str(&format!(
            "File {file_name} has unsupported type ({mime}) for content display, but was saved successfully."
        )),
        DownloadContent::Unsupported => message.push_str(&format!(
            "File {file_name} has unsupported type ({mime}). Only text and image files are supported for content display."
        )),
    }
    message
}

impl BoxControlPlane {
    /// Returns the text content of a file.
    ///
    /// # Errors
    /// Returns `ControlError` if no text can be produced for the file.
    pub async fn read_text(&self, file_id: &str) -> ControlResult<String> {
        require_id("file_id", file_id)?;
        Ok(self.client.file_text(file_id).await?)
    }

    /// Uploads a local file.
    ///
    /// The file is read before any remote call; a missing file fails locally.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` when the path is not a file,
    /// `ControlError::Io` when it cannot be read, or `ControlError::Api`.
    pub async fn upload_from_path(&self, request: UploadPathRequest) -> ControlResult<UploadOutcome> {
        let UploadPathRequest {
            file_path,
            folder_id,
            new_file_name,
        } = request;
        let path = expand_home(file_path.trim());
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ControlError::invalid(format!("file '{file_path}' not found")));
        }

        let name = new_file_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| file_name(&path))
            .ok_or_else(|| ControlError::invalid(format!("cannot derive a file name from '{file_path}'")))?;
        let content = tokio::fs::read(&path)
            .await
            .map_err(|err| ControlError::io(format!("reading {}", path.display()), err))?;

        let request = UploadRequest {
            file_name: name,
            folder_id: folder_or_root(folder_id),
            content,
        };
        debug!(name = %request.file_name, bytes = request.content.len(), "uploading local file");
        let item = self.client.upload_file(&request).await?;
        let name = item.name.clone().unwrap_or(request.file_name);
        info!(file_id = %item.id, "file uploaded");
        Ok(uploaded(item.id, name))
    }

    /// Uploads text or base64-encoded bytes as a new file.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` for bad base64 or a blank name.
    pub async fn upload_from_content(
        &self,
        request: UploadContentRequest,
    ) -> ControlResult<UploadOutcome> {
        let UploadContentRequest {
            content,
            file_name,
            folder_id,
            is_base64,
        } = request;
        let file_name = file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(ControlError::invalid("file_name is required"));
        }
        let content = if is_base64 {
            STANDARD
                .decode(content.trim())
                .map_err(|err| ControlError::invalid(format!("content is not valid base64: {err}")))?
        } else {
            content.into_bytes()
        };

        let request = UploadRequest {
            file_name,
            folder_id: folder_or_root(folder_id),
            content,
        };
        let item = self.client.upload_file(&request).await?;
        let name = item.name.clone().unwrap_or(request.file_name);
        info!(file_id = %item.id, "content uploaded");
        Ok(uploaded(item.id, name))
    }

    /// Downloads a file, optionally saving it, and classifies its content.
    ///
    /// Text is returned inline, images as base64; other types are reported
    /// as unsupported without decoding.
    ///
    /// # Errors
    /// Returns `ControlError` if the download or the local write fails.
    pub async fn download(&self, request: DownloadRequest) -> ControlResult<DownloadOutcome> {
        let DownloadRequest {
            file_id,
            save_file,
            save_path,
        } = request;
        require_id("file_id", &file_id)?;

        let info = self.client.get_file(&file_id).await?;
        let file_name = info.name_or_id().to_string();
        let downloaded = self.client.download_file(&file_id).await?;

        let mime_type = downloaded
            .mime_type
            .filter(|mime| mime != MIME_OCTET_STREAM)
            .or_else(|| guess_mime_type(&file_name).map(str::to_string));

        let saved_to = if save_file {
            let target = save_target(save_path.as_deref(), &file_name);
            tokio::fs::write(&target, &downloaded.content)
                .await
                .map_err(|err| ControlError::io(format!("saving {}", target.display()), err))?;
            info!(path = %target.display(), "downloaded file saved");
            Some(target)
        } else {
            None
        };

        let content = classify(&downloaded.content, mime_type.as_deref());
        let message = download_message(&content, &file_name, mime_type.as_deref(), saved_to.as_deref());
        Ok(DownloadOutcome {
            file_id,
            file_name,
            mime_type,
            saved_to: saved_to.map(|path| path.display().to_string()),
            message,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::RecordingApi;

    fn file_info(name: &str) -> serde_json::Value {
        json!({"type": "file", "id": "5", "name": name})
    }

    #[tokio::test]
    async fn content_is_decoded_only_when_flagged() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("upload_file", json!({"type": "file", "id": "1", "name": "raw.txt"}))
                .respond("upload_file", json!({"type": "file", "id": "2", "name": "a.txt"})),
        );
        let control = BoxControlPlane::new(api.clone());

        control
            .upload_from_content(UploadContentRequest {
                content: "aGVsbG8=".to_string(),
                file_name: "raw.txt".to_string(),
                folder_id: None,
                is_base64: false,
            })
            .await
            .expect("upload");
        let decoded = control
            .upload_from_content(UploadContentRequest {
                content: "aGVsbG8=".to_string(),
                file_name: "a.txt".to_string(),
                folder_id: Some("9".to_string()),
                is_base64: true,
            })
            .await
            .expect("upload");
        assert_eq!(decoded.message, "File uploaded successfully. File ID: 2, Name: a.txt");

        let calls = api.calls_to("upload_file");
        assert_eq!(calls[0]["content"], json!("aGVsbG8="));
        assert_eq!(calls[0]["folder_id"], json!("0"));
        assert_eq!(calls[1]["content"], json!("hello"));
        assert_eq!(calls[1]["folder_id"], json!("9"));
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected_locally() {
        let api = Arc::new(RecordingApi::new());
        let err = BoxControlPlane::new(api.clone())
            .upload_from_content(UploadContentRequest {
                content: "not base64!".to_string(),
                file_name: "x.bin".to_string(),
                folder_id: None,
                is_base64: true,
            })
            .await
            .expect_err("bad base64");
        assert_eq!(err.kind(), "invalid_input");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_local_file_fails_before_any_remote_call() {
        let api = Arc::new(RecordingApi::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.txt");

        let err = BoxControlPlane::new(api.clone())
            .upload_from_path(UploadPathRequest {
                file_path: missing.display().to_string(),
                folder_id: None,
                new_file_name: None,
            })
            .await
            .expect_err("missing file");
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("not found"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_from_path_uses_basename_unless_renamed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.md");
        std::fs::write(&path, "# Q3").expect("write");

        let api = Arc::new(
            RecordingApi::new()
                .respond("upload_file", json!({"type": "file", "id": "10", "name": "report.md"}))
                .respond("upload_file", json!({"type": "file", "id": "11", "name": "final.md"})),
        );
        let control = BoxControlPlane::new(api.clone());
        control
            .upload_from_path(UploadPathRequest {
                file_path: path.display().to_string(),
                folder_id: Some("42".to_string()),
                new_file_name: Some("   ".to_string()),
            })
            .await
            .expect("upload");
        control
            .upload_from_path(UploadPathRequest {
                file_path: path.display().to_string(),
                folder_id: None,
                new_file_name: Some(" final.md ".to_string()),
            })
            .await
            .expect("upload");

        let calls = api.calls_to("upload_file");
        assert_eq!(calls[0]["file_name"], json!("report.md"));
        assert_eq!(calls[0]["folder_id"], json!("42"));
        assert_eq!(calls[0]["content"], json!("# Q3"));
        assert_eq!(calls[1]["file_name"], json!("final.md"));
    }

    #[tokio::test]
    async fn text_downloads_are_returned_inline() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_file", file_info("notes.txt"))
                .download(b"hello world", Some("text/plain")),
        );
        let outcome = BoxControlPlane::new(api)
            .download(DownloadRequest {
                file_id: "5".to_string(),
                ..DownloadRequest::default()
            })
            .await
            .expect("download");
        assert_eq!(
            outcome.content,
            DownloadContent::Text {
                text: "hello world".to_string()
            }
        );
        assert_eq!(outcome.message, "File downloaded successfully: notes.txt");
        assert!(outcome.saved_to.is_none());
    }

    #[tokio::test]
    async fn images_are_base64_encoded() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_file", file_info("logo.png"))
                .download(&[0x89, 0x50, 0x4e, 0x47], Some("image/png")),
        );
        let outcome = BoxControlPlane::new(api)
            .download(DownloadRequest {
                file_id: "5".to_string(),
                ..DownloadRequest::default()
            })
            .await
            .expect("download");
        assert_eq!(
            outcome.content,
            DownloadContent::Image {
                base64: "iVBORw==".to_string()
            }
        );
        assert_eq!(outcome.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn other_types_are_not_decoded() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_file", file_info("deck.pdf"))
                .download(b"%PDF-1.7", Some("application/pdf")),
        );
        let outcome = BoxControlPlane::new(api)
            .download(DownloadRequest {
                file_id: "5".to_string(),
                ..DownloadRequest::default()
            })
            .await
            .expect("download");
        assert_eq!(outcome.content, DownloadContent::Unsupported);
        assert!(outcome.message.contains("unsupported type (application/pdf)"));
    }

    #[tokio::test]
    async fn octet_stream_falls_back_to_the_file_name() {
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_file", file_info("data.csv"))
                .download(b"a,b\n1,2\n", Some("application/octet-stream")),
        );
        let outcome = BoxControlPlane::new(api)
            .download(DownloadRequest {
                file_id: "5".to_string(),
                ..DownloadRequest::default()
            })
            .await
            .expect("download");
        assert_eq!(outcome.mime_type.as_deref(), Some("text/csv"));
        assert!(matches!(outcome.content, DownloadContent::Text { .. }));
    }

    #[tokio::test]
    async fn saved_downloads_land_in_the_given_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = Arc::new(
            RecordingApi::new()
                .respond("get_file", file_info("archive.zip"))
                .download(b"PK", Some("application/zip")),
        );
        let outcome = BoxControlPlane::new(api)
            .download(DownloadRequest {
                file_id: "5".to_string(),
                save_file: true,
                save_path: Some(dir.path().display().to_string()),
            })
            .await
            .expect("download");

        let expected = dir.path().join("archive.zip");
        assert_eq!(std::fs::read(&expected).expect("saved"), b"PK");
        assert_eq!(outcome.saved_to, Some(expected.display().to_string()));
        assert!(outcome.message.starts_with("File saved to: "));
        assert!(outcome.message.ends_with("but was saved successfully."));
    }
}
