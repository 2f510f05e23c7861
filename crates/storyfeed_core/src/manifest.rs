use url::Url;

/// Manifest problems are fatal for the whole run; nothing is displayed.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not a JSON list of story urls: {0}")]
    Json(#[from] serde_json::Error),
    #[error("story url {url:?} cannot be resolved: {message}")]
    InvalidStoryUrl { url: String, message: String },
}

/// Parse a story manifest: a JSON array of URL strings, each either absolute
/// or relative to the manifest's own URL.
///
/// The returned list preserves manifest order. An empty manifest is valid.
pub fn parse_manifest(body: &str, base: &Url) -> Result<Vec<String>, ManifestError> {
    let entries: Vec<String> = serde_json::from_str(body)?;
    entries
        .into_iter()
        .map(|entry| match base.join(&entry) {
            Ok(resolved) => Ok(resolved.to_string()),
            Err(err) => Err(ManifestError::InvalidStoryUrl {
                url: entry,
                message: err.to_string(),
            }),
        })
        .collect()
}
