//! HTTP image backends and the factory that wires catalog entries to them.

pub mod imagen;
pub mod openai;
pub mod vertex;

use anyhow::{bail, Context, Result};
use imagegen_contracts::catalog::{
    BackendSpec, GEMINI_FLASH_IMAGE, PROVIDER_OPENAI, PROVIDER_VERTEX, PROVIDER_VERTEX_PREDICT,
};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use tracing::warn;

use crate::chain::ImageBackend;
use crate::config::Config;
use crate::error::{truncate_text, ConfigurationError};

pub use imagen::ImagenPredictBackend;
pub use openai::DalleBackend;
pub use vertex::{PromptStyle, VertexColorAdvisor, VertexContentBackend};

/// Concrete backend for a catalog entry, or `None` for an unknown provider.
pub fn build_backend(
    spec: &BackendSpec,
    config: &Config,
    http: &HttpClient,
) -> Option<Box<dyn ImageBackend>> {
    let backend: Box<dyn ImageBackend> = match spec.provider.as_str() {
        PROVIDER_VERTEX => {
            let style = if spec.name == GEMINI_FLASH_IMAGE {
                PromptStyle::Marketing
            } else {
                PromptStyle::Plain
            };
            Box::new(VertexContentBackend::new(spec, config, http.clone(), style))
        }
        PROVIDER_VERTEX_PREDICT => Box::new(ImagenPredictBackend::new(spec, config, http.clone())),
        PROVIDER_OPENAI => Box::new(DalleBackend::new(spec, config, http.clone())),
        other => {
            warn!(backend = %spec.name, provider = other, "no implementation for provider");
            return None;
        }
    };
    Some(backend)
}

/// Credential for one backend, resolved once at construction.
#[derive(Clone)]
pub(crate) struct BackendKey {
    backend: String,
    variables: Vec<String>,
    value: Option<String>,
}

impl BackendKey {
    pub(crate) fn resolve(spec: &BackendSpec, config: &Config) -> Self {
        Self {
            backend: spec.name.clone(),
            variables: spec.credential_env.clone(),
            value: config
                .credentials
                .resolve(spec.credential_env.as_slice())
                .map(str::to_string),
        }
    }

    pub(crate) fn get(&self) -> std::result::Result<&str, ConfigurationError> {
        self.value
            .as_deref()
            .ok_or_else(|| ConfigurationError::new(self.backend.clone(), self.variables.as_slice()))
    }
}

pub(crate) fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

/// Every harm category with filtering switched off.
pub(crate) fn default_safety_settings() -> Vec<Value> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| {
        json!({
            "category": category,
            "threshold": "OFF",
        })
    })
    .collect()
}
