use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::{ApiError, BoxApi};

pub mod ai;
pub mod docgen;
pub mod files;
pub mod folders;
pub mod identity;
pub mod metadata;
pub mod search;

pub use ai::{AskRequest, ExtractRequest, StructuredExtractRequest};
pub use docgen::{DocGenBatchInput, DocGenSingleInput};
pub use files::{
    DownloadContent,
    DownloadOutcome,
    DownloadRequest,
    UploadContentRequest,
    UploadOutcome,
    UploadPathRequest,
};
pub use folders::{FolderAction, FolderOutcome, ManageFolderRequest};
pub use metadata::{MetadataTemplateInput, metadata_patch};
pub use search::SearchRequest;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ControlError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short machine-readable name of the failure class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Api(_) => "api_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Io { .. } => "io_error",
        }
    }

    /// HTTP status reported by the platform, for remote failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.http_status(),
            _ => None,
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Confirmation returned by operations whose remote call has no body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgement {
    pub id: String,
    pub message: String,
}

impl Acknowledgement {
    pub(crate) fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Normalizes tool input and delegates to the Box client.
#[derive(Clone)]
pub struct BoxControlPlane {
    client: Arc<dyn BoxApi>,
}

impl BoxControlPlane {
    #[must_use]
    pub fn new(client: Arc<dyn BoxApi>) -> Self {
        Self { client }
    }
}

/// Rejects empty identifiers before any remote call.
pub(crate) fn require_id(field: &str, value: &str) -> ControlResult<()> {
    if value.trim().is_empty() {
        return Err(ControlError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// Rejects empty identifier lists before any remote call.
pub(crate) fn require_ids(field: &str, values: &[String]) -> ControlResult<()> {
    if values.is_empty() {
        return Err(ControlError::invalid(format!("{field} must contain at least one id")));
    }
    values.iter().try_for_each(|value| require_id(field, value))
}
