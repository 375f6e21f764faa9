/// Production API host. Paths below are appended to it.
pub const DEFAULT_API_BASE_URL: &str = "https://api.box.com";
/// Upload host. Paths below are appended to it.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.box.com/api";
/// Browser endpoint for the interactive OAuth flow.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://account.box.com/api/oauth2/authorize";

pub const PATH_TOKEN: &str = "/oauth2/token";
pub const PATH_USERS_ME: &str = "/2.0/users/me";
pub const PATH_SEARCH: &str = "/2.0/search";
pub const PATH_AI_ASK: &str = "/2.0/ai/ask";
pub const PATH_AI_EXTRACT: &str = "/2.0/ai/extract";
pub const PATH_AI_EXTRACT_STRUCTURED: &str = "/2.0/ai/extract_structured";
pub const PATH_FILES: &str = "/2.0/files";
pub const PATH_FOLDERS: &str = "/2.0/folders";
pub const PATH_UPLOAD: &str = "/2.0/files/content";
pub const PATH_METADATA_TEMPLATES: &str = "/2.0/metadata_templates";
pub const PATH_DOCGEN_TEMPLATES: &str = "/2.0/docgen_templates";
pub const PATH_DOCGEN_TEMPLATE_JOBS: &str = "/2.0/docgen_template_jobs";
pub const PATH_DOCGEN_BATCHES: &str = "/2.0/docgen_batches";
pub const PATH_DOCGEN_BATCH_JOBS: &str = "/2.0/docgen_batch_jobs";
pub const PATH_DOCGEN_JOBS: &str = "/2.0/docgen_jobs";

/// Header and value selecting the doc gen API version.
pub const HEADER_BOX_VERSION: &str = "box-version";
pub const DOCGEN_API_VERSION: &str = "2025.0";

/// Header used to request file representations.
pub const HEADER_REP_HINTS: &str = "x-rep-hints";
pub const EXTRACTED_TEXT_REPRESENTATION: &str = "extracted_text";
pub const REPRESENTATION_ASSET_PLACEHOLDER: &str = "{+asset_path}";

pub const ROOT_FOLDER_ID: &str = "0";
pub const ENTERPRISE_SCOPE: &str = "enterprise";
pub const ENHANCED_EXTRACT_AGENT_ID: &str = "enhanced_extract_agent";
pub const AI_AGENT_ID_TYPE: &str = "ai_agent_id";
pub const METADATA_TEMPLATE_TYPE: &str = "metadata_template";
pub const DOCGEN_INPUT_SOURCE: &str = "api";
pub const DEFAULT_DOCGEN_OUTPUT_TYPE: &str = "pdf";

pub const ITEM_TYPE_FILE: &str = "file";
pub const ITEM_TYPE_FOLDER: &str = "folder";
pub const ITEM_TYPE_HUBS: &str = "hubs";

/// Fields requested when listing folder content.
pub const FOLDER_ITEM_FIELDS: &str = "id,type,name,description";
/// Page size used when walking folder content.
pub const FOLDER_PAGE_LIMIT: i64 = 1000;
/// Page size used when scanning metadata or doc gen templates by name.
pub const TEMPLATE_SCAN_PAGE_LIMIT: i64 = 100;

pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("xml", "text/xml"),
    ("json", "application/json"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("js", "text/javascript"),
    ("py", "text/x-python"),
    ("rs", "text/x-rust"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("zip", "application/zip"),
];

/// Guesses a MIME type from a file name's extension.
#[must_use]
pub fn guess_mime_type(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    MIME_BY_EXTENSION
        .iter()
        .find(|(candidate, _)| *candidate == extension)
        .map(|(_, mime)| *mime)
}

/// True for MIME types whose bodies can be shown as text.
#[must_use]
pub fn is_textual_mime(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
}

/// True for MIME types shown as base64 image data.
#[must_use]
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}
