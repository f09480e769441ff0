use serde::{Deserialize, Serialize};

/// One alternate location for a candidate, labelled by provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUrl {
    pub provider: String,
    pub url: String,
}

/// A scored search hit.
///
/// The serialized field names are a stable contract for consumers:
/// `{folder, file, path, extension, score, url, urls}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCandidate {
    /// Bucket the file lives in
    pub folder: String,
    /// Object name, including any sub-path within the bucket
    pub file: String,
    /// Unique key within a search: `folder/file`
    pub path: String,
    /// Declared content type, or a filename-derived fallback
    pub extension: String,
    /// Relevance against the search hint; only positive scores survive
    pub score: f64,
    /// Canonical public URL (the first entry of `urls`)
    pub url: String,
    /// Alternate URLs in preference order
    pub urls: Vec<ProviderUrl>,
}

impl FileCandidate {
    /// Bare file name without the folder part, for display and download
    /// filenames.
    pub fn file_name(&self) -> &str {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }
}
