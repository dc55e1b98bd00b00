use thiserror::Error;

/// No usable credential for a backend; the backend is skipped.
#[derive(Debug, Error)]
#[error("{backend} unavailable: set {}", .variables.join(" or "))]
pub struct ConfigurationError {
    pub backend: String,
    pub variables: Vec<String>,
}

impl ConfigurationError {
    pub fn new<S: AsRef<str>>(backend: impl Into<String>, variables: &[S]) -> Self {
        Self {
            backend: backend.into(),
            variables: variables
                .iter()
                .map(|item| item.as_ref().to_string())
                .collect(),
        }
    }
}

/// Failure of a single backend. Never fatal to the request.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{backend} returned no image")]
    EmptyPayload { backend: String },
    #[error(transparent)]
    Request(#[from] anyhow::Error),
}

impl BackendError {
    pub fn empty(backend: impl Into<String>) -> Self {
        BackendError::EmptyPayload {
            backend: backend.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, BackendError::Configuration(_))
    }

    /// One-line message including every cause in the chain.
    pub fn summary(&self) -> String {
        match self {
            BackendError::Request(err) => error_chain_text(err, 512),
            other => other.to_string(),
        }
    }
}

/// Failure while drawing or encoding the placeholder.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("invalid placeholder dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("placeholder encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::{error_chain_text, truncate_text, BackendError, ConfigurationError};

    #[test]
    fn configuration_error_names_variables() {
        let err = ConfigurationError::new("dall-e-3", &["OPENAI_API_KEY"]);
        assert_eq!(err.to_string(), "dall-e-3 unavailable: set OPENAI_API_KEY");

        let err = BackendError::from(ConfigurationError::new(
            "gemini",
            &["GOOGLE_CLOUD_API_KEY", "VERTEX_API_KEY"],
        ));
        assert!(err.is_configuration());
        assert_eq!(
            err.summary(),
            "gemini unavailable: set GOOGLE_CLOUD_API_KEY or VERTEX_API_KEY"
        );
    }

    #[test]
    fn request_summary_flattens_cause_chain() {
        let err: anyhow::Result<()> = Err(anyhow!("connection reset"));
        let err = err
            .context("Vertex request failed")
            .err()
            .map(BackendError::from);
        let summary = err.map(|err| err.summary()).unwrap_or_default();
        assert_eq!(
            summary,
            "Vertex request failed | caused by: connection reset"
        );
    }

    #[test]
    fn chain_text_skips_duplicates_and_truncates() {
        let err = anyhow!("same").context("same").context("outer");
        assert_eq!(error_chain_text(&err, 512), "outer | caused by: same");
        assert_eq!(error_chain_text(&err, 5), "outer…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }

    #[test]
    fn empty_payload_mentions_backend() {
        assert_eq!(
            BackendError::empty("imagen-3.0-generate-002").to_string(),
            "imagen-3.0-generate-002 returned no image"
        );
    }
}
