use std::time::Duration;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use imagegen_contracts::catalog::{BackendSpec, Capability};
use imagegen_contracts::GenerationRequest;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{response_json_or_error, BackendKey};
use crate::chain::{GeneratedImage, ImageBackend};
use crate::config::Config;
use crate::error::{BackendError, ConfigurationError};

pub const GUIDANCE_SCALE: f64 = 7.5;
const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Regional Vertex `:predict` endpoint for Imagen, bearer-authenticated.
pub struct ImagenPredictBackend {
    name: String,
    key: BackendKey,
    project: Option<String>,
    location: String,
    timeout: Duration,
    http: HttpClient,
}

impl ImagenPredictBackend {
    pub fn new(spec: &BackendSpec, config: &Config, http: HttpClient) -> Self {
        Self {
            name: spec.name.clone(),
            key: BackendKey::resolve(spec, config),
            project: config.google_cloud_project.clone(),
            location: config.vertex_location.clone(),
            timeout: config.request_timeout,
            http,
        }
    }

    pub fn endpoint(&self, project: &str) -> String {
        predict_endpoint(&self.location, project, &self.name)
    }

    pub fn request_body(request: &GenerationRequest) -> Value {
        let (width, height) = request.dimensions();
        json!({
            "instances": [{ "prompt": request.enhanced_prompt() }],
            "parameters": {
                "sampleCount": 1,
                "width": width,
                "height": height,
                "guidanceScale": GUIDANCE_SCALE,
            },
        })
    }
}

impl ImageBackend for ImagenPredictBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::TextToImage
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        let api_key = self.key.get()?;
        let project = self
            .project
            .as_deref()
            .ok_or_else(|| ConfigurationError::new(self.name.clone(), &[PROJECT_ENV]))?;
        let endpoint = self.endpoint(project);
        debug!(backend = %self.name, endpoint = %endpoint, "calling Imagen predict");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&Self::request_body(request))
            .send()
            .with_context(|| format!("{} request failed", self.name))?;
        let payload = response_json_or_error(&self.name, response)?;
        extract_predictions(&payload)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::empty(&self.name))
    }
}

pub fn predict_endpoint(location: &str, project: &str, model: &str) -> String {
    format!(
        "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict"
    )
}

/// Decoded images from `predictions[]`, in response order.
pub fn extract_predictions(payload: &Value) -> anyhow::Result<Vec<GeneratedImage>> {
    let mut out = Vec::new();
    let predictions = payload
        .get("predictions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for row in predictions {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let Some(encoded) = obj
            .get("bytesBase64Encoded")
            .or_else(|| obj.get("bytes_base64_encoded"))
            .and_then(Value::as_str)
            .filter(|encoded| !encoded.is_empty())
        else {
            continue;
        };
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .context("Imagen prediction base64 decode failed")?;
        let mime_type = obj
            .get("mimeType")
            .or_else(|| obj.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        out.push(GeneratedImage::new(bytes, mime_type));
    }
    Ok(out)
}
