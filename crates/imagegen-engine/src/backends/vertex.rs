use std::time::Duration;

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::Rgb;
use imagegen_contracts::catalog::{BackendSpec, Capability};
use imagegen_contracts::GenerationRequest;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{default_safety_settings, response_json_or_error, BackendKey};
use crate::chain::{GeneratedImage, ImageBackend};
use crate::config::Config;
use crate::error::BackendError;
use crate::placeholder::palette::parse_hex_colors;
use crate::placeholder::ColorAdvisor;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// How the user prompt is framed before it reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Marketing brief template, image and text output.
    Marketing,
    /// The prompt as-is, image output only.
    Plain,
}

/// `:generateContent` on a Vertex publisher model, keyed by API key.
pub struct VertexContentBackend {
    name: String,
    key: BackendKey,
    api_base: String,
    timeout: Duration,
    style: PromptStyle,
    http: HttpClient,
}

impl VertexContentBackend {
    pub fn new(spec: &BackendSpec, config: &Config, http: HttpClient, style: PromptStyle) -> Self {
        Self {
            name: spec.name.clone(),
            key: BackendKey::resolve(spec, config),
            api_base: config.vertex_api_base.clone(),
            timeout: config.request_timeout,
            style,
            http,
        }
    }

    fn endpoint(&self) -> String {
        generate_content_endpoint(&self.api_base, &self.name)
    }

    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        let prompt = request.enhanced_prompt();
        match self.style {
            PromptStyle::Marketing => json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": marketing_prompt(&prompt, request.aspect_ratio()) }],
                }],
                "generationConfig": {
                    "temperature": 0.8,
                    "topP": 0.95,
                    "maxOutputTokens": 32768,
                    "responseModalities": ["IMAGE", "TEXT"],
                },
                "safetySettings": default_safety_settings(),
            }),
            PromptStyle::Plain => json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }],
                }],
                "generationConfig": {
                    "temperature": 0.8,
                    "topP": 0.95,
                    "responseModalities": ["IMAGE"],
                },
                "safetySettings": default_safety_settings(),
            }),
        }
    }
}

impl ImageBackend for VertexContentBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::MultimodalImage
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        let api_key = self.key.get()?;
        let body = self.request_body(request);
        debug!(backend = %self.name, endpoint = %self.endpoint(), "calling Vertex generateContent");
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .with_context(|| format!("{} request failed", self.name))?;
        let payload = response_json_or_error(&self.name, response)?;
        ensure_not_blocked(&payload)?;
        extract_inline_image(&payload)?.ok_or_else(|| BackendError::empty(&self.name))
    }
}

/// Text model asked for two hex colours matching the prompt's mood.
pub struct VertexColorAdvisor {
    name: String,
    key: BackendKey,
    api_base: String,
    timeout: Duration,
    http: HttpClient,
}

impl VertexColorAdvisor {
    pub fn new(spec: &BackendSpec, config: &Config, http: HttpClient) -> Self {
        Self {
            name: spec.name.clone(),
            key: BackendKey::resolve(spec, config),
            api_base: config.vertex_api_base.clone(),
            timeout: config.request_timeout,
            http,
        }
    }

    pub fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": color_hint_prompt(prompt) }],
            }],
        })
    }
}

impl ColorAdvisor for VertexColorAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn suggest(&self, prompt: &str) -> Result<(Rgb<u8>, Rgb<u8>), BackendError> {
        let api_key = self.key.get()?;
        let response = self
            .http
            .post(generate_content_endpoint(&self.api_base, &self.name))
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&Self::request_body(prompt))
            .send()
            .with_context(|| format!("{} request failed", self.name))?;
        let payload = response_json_or_error(&self.name, response)?;
        ensure_not_blocked(&payload)?;
        let text = response_text(&payload);
        match parse_hex_colors(&text).as_slice() {
            [first, second, ..] => Ok((*first, *second)),
            _ => Err(anyhow::anyhow!("{} returned fewer than two colours", self.name).into()),
        }
    }
}

pub fn generate_content_endpoint(api_base: &str, model: &str) -> String {
    format!(
        "{}/publishers/google/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        model.trim()
    )
}

pub fn marketing_prompt(prompt: &str, aspect_ratio: &str) -> String {
    format!(
        "Generate a high-quality image based on this description:\n\n{prompt}\n\n\
         Aspect Ratio: {aspect_ratio}\n\
         Style: Professional, modern, clean\n\
         Quality: High resolution, sharp details\n\
         Lighting: Well-lit, professional lighting\n\n\
         Create a visually appealing image that would work well for social media marketing."
    )
}

pub fn color_hint_prompt(prompt: &str) -> String {
    format!(
        "Based on this prompt: '{prompt}', describe the dominant colors and mood in hex color codes. \
         Return only: color1:#XXXXXX color2:#XXXXXX"
    )
}

fn candidate_parts(payload: &Value) -> Vec<Value> {
    payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// First inline image of the first candidate; the last text part becomes
/// the description.
pub fn extract_inline_image(payload: &Value) -> anyhow::Result<Option<GeneratedImage>> {
    let parts = candidate_parts(payload);
    let description = parts
        .iter()
        .rev()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string);

    for part in &parts {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_IMAGE_MIME);
        if !mime_type.starts_with("image/") {
            continue;
        }
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.as_bytes())
            .context("Vertex image base64 decode failed")?;
        let mut image = GeneratedImage::new(bytes, mime_type);
        image.description = description;
        return Ok(Some(image));
    }
    Ok(None)
}

fn response_text(payload: &Value) -> String {
    candidate_parts(payload)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rejects responses that carry a block reason instead of candidates.
fn ensure_not_blocked(payload: &Value) -> anyhow::Result<()> {
    if let Some(reason) = payload
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        bail!("prompt blocked: {reason}");
    }
    Ok(())
}
