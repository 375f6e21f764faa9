use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields of a remote record that are not modelled explicitly.
pub type Extra = Map<String, Value>;

/// Error body returned by the platform with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApiErrorBody {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_info: Option<Value>,
}

impl ApiErrorBody {
    /// Id of the item that caused a name conflict, when reported.
    #[must_use]
    pub fn conflicting_item_id(&self) -> Option<String> {
        let conflicts = self.context_info.as_ref()?.get("conflicts")?;
        let conflict = match conflicts {
            Value::Array(items) => items.first()?,
            other => other,
        };
        conflict.get("id")?.as_str().map(str::to_string)
    }
}

/// A page of entries returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Collection<T> {
    #[serde(default)]
    pub entries: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_marker: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl<T> Collection<T> {
    /// Marker of the following page, if there is one.
    #[must_use]
    pub fn next_page_marker(&self) -> Option<&str> {
        self.next_marker
            .as_deref()
            .filter(|marker| !marker.is_empty())
    }
}

/// Marker-based pagination, forwarded as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub marker: Option<String>,
    pub limit: Option<i64>,
}

impl Page {
    #[must_use]
    pub const fn new(marker: Option<String>, limit: Option<i64>) -> Self {
        Self { marker, limit }
    }
}

/// Reference to a remote item by id and type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
}

impl ItemRef {
    #[must_use]
    pub fn file(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: crate::schema::ITEM_TYPE_FILE.to_string(),
        }
    }

    #[must_use]
    pub fn folder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: crate::schema::ITEM_TYPE_FOLDER.to_string(),
        }
    }
}

/// Parent reference used by folder and upload requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentRef {
    pub id: String,
}

/// The authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A file, folder or web link as returned by item endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Item {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.item_type == crate::schema::ITEM_TYPE_FOLDER
    }

    #[must_use]
    pub fn name_or_id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Flat view of one entry in a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<Item> for FolderEntry {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            item_type: item.item_type,
            name: item.name,
            description: item.description,
        }
    }
}

/// Where search should look for the query text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchContentType {
    Name,
    Description,
    FileContent,
    Comments,
    Tags,
}

impl SearchContentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::FileContent => "file_content",
            Self::Comments => "comments",
            Self::Tags => "tags",
        }
    }
}

/// Returned when a search content type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContentType(pub String);

impl fmt::Display for UnknownContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown search location '{}' (expected NAME, DESCRIPTION, FILE_CONTENT, COMMENTS or TAG)",
            self.0
        )
    }
}

impl std::error::Error for UnknownContentType {}

impl FromStr for SearchContentType {
    type Err = UnknownContentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NAME" => Ok(Self::Name),
            "DESCRIPTION" => Ok(Self::Description),
            "FILE_CONTENT" => Ok(Self::FileContent),
            "COMMENTS" => Ok(Self::Comments),
            "TAG" | "TAGS" => Ok(Self::Tags),
            _ => Err(UnknownContentType(value.to_string())),
        }
    }
}

/// Search request; empty lists are left out of the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub file_extensions: Vec<String>,
    pub content_types: Vec<SearchContentType>,
    pub ancestor_folder_ids: Vec<String>,
    pub item_type: Option<String>,
    pub limit: Option<i64>,
}

/// Item passed to AI endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AiItem {
    #[must_use]
    pub fn file(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: crate::schema::ITEM_TYPE_FILE.to_string(),
            content: None,
        }
    }

    #[must_use]
    pub fn hub(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: crate::schema::ITEM_TYPE_HUBS.to_string(),
            content: None,
        }
    }
}

/// Reference to a configured AI agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiAgentReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl AiAgentReference {
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            kind: crate::schema::AI_AGENT_ID_TYPE.to_string(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AiAskMode {
    SingleItemQa,
    MultipleItemQa,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiAskRequest {
    pub mode: AiAskMode,
    pub prompt: String,
    pub items: Vec<AiItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_agent: Option<AiAgentReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiExtractRequest {
    pub prompt: String,
    pub items: Vec<AiItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_agent: Option<AiAgentReference>,
}

/// Option of an enum or multi-select field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldOption {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Field to extract with structured AI extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiExtractField {
    pub key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataTemplateReference {
    pub template_key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub scope: String,
}

impl MetadataTemplateReference {
    #[must_use]
    pub fn enterprise(template_key: impl Into<String>) -> Self {
        Self {
            template_key: template_key.into(),
            kind: crate::schema::METADATA_TEMPLATE_TYPE.to_string(),
            scope: crate::schema::ENTERPRISE_SCOPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiExtractStructuredRequest {
    pub items: Vec<AiItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<AiExtractField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_template: Option<MetadataTemplateReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_agent: Option<AiAgentReference>,
}

/// Answer from the ask and freeform extract endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Answer from the structured extraction endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiExtractStructuredResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<ItemRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl DocGenTemplate {
    #[must_use]
    pub fn file_id(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_paths: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenJob {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<ItemRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<ItemRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<ItemRef>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenBatch {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocGenTemplateRequest {
    pub file: ItemRef,
}

/// One document to produce in a doc gen batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_file_name: Option<String>,
    pub user_input: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGenBatchRequest {
    pub file: ItemRef,
    pub input_source: String,
    pub destination_folder: ItemRef,
    pub output_type: String,
    pub document_generation_data: Vec<DocGenDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent: ParentRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateFolderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl UpdateFolderRequest {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.parent.is_none()
    }
}

/// Attributes part of a multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadAttributes {
    pub name: String,
    pub parent: ParentRef,
}

/// Upload payload handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub folder_id: String,
    pub content: Vec<u8>,
}

/// Raw bytes of a downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Representation listing used for text extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRepresentations {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub representations: Option<RepresentationList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepresentationList {
    #[serde(default)]
    pub entries: Vec<Representation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Representation {
    pub representation: String,
    #[serde(default)]
    pub info: Option<UrlRef>,
    #[serde(default)]
    pub status: Option<RepresentationStatus>,
    #[serde(default)]
    pub content: Option<RepresentationContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRef {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepresentationStatus {
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepresentationContent {
    pub url_template: String,
}

/// Field definition of a metadata template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataTemplateField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub key: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(rename = "templateKey", skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub fields: Vec<MetadataTemplateField>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMetadataTemplateRequest {
    pub scope: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "templateKey", skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    pub fields: Vec<MetadataTemplateField>,
}

/// Metadata instance values keyed by field key; `$`-prefixed keys are system fields.
pub type MetadataInstance = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// One JSON-Patch operation applied to a metadata instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataPatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Outcome of an authorization request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizeOutcome {
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    pub message: String,
}
