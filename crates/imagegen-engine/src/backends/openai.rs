use std::time::Duration;

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use imagegen_contracts::catalog::{BackendSpec, Capability};
use imagegen_contracts::{AspectRatio, GenerationRequest};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{response_json_or_error, BackendKey};
use crate::chain::{GeneratedImage, ImageBackend};
use crate::config::Config;
use crate::error::{truncate_text, BackendError};

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// What the generations endpoint handed back for the first image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DalleImage {
    Inline(Vec<u8>),
    Url(String),
}

pub struct DalleBackend {
    name: String,
    key: BackendKey,
    api_base: String,
    timeout: Duration,
    download_timeout: Duration,
    http: HttpClient,
}

impl DalleBackend {
    pub fn new(spec: &BackendSpec, config: &Config, http: HttpClient) -> Self {
        Self {
            name: spec.name.clone(),
            key: BackendKey::resolve(spec, config),
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            download_timeout: config.download_timeout,
            http,
        }
    }

    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.name,
            "prompt": request.enhanced_prompt(),
            "n": 1,
            "size": dalle_size(request.aspect_ratio()),
            "quality": "standard",
        })
    }

    fn download_image(&self, url: &str) -> anyhow::Result<GeneratedImage> {
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .with_context(|| format!("failed downloading {} image", self.name))?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            bail!(
                "{} image download failed ({code}): {}",
                self.name,
                truncate_text(&body, 512)
            );
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading {} image bytes", self.name))?
            .to_vec();
        Ok(GeneratedImage::new(bytes, mime_type))
    }
}

impl ImageBackend for DalleBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::ThirdPartyImage
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        let api_key = self.key.get()?;
        let endpoint = format!("{}/images/generations", self.api_base);
        debug!(backend = %self.name, endpoint = %endpoint, "calling OpenAI images");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&self.request_body(request))
            .send()
            .with_context(|| format!("{} request failed", self.name))?;
        let payload = response_json_or_error(&self.name, response)?;
        let image = match extract_first_image(&payload)? {
            Some(DalleImage::Inline(bytes)) => GeneratedImage::new(bytes, DEFAULT_IMAGE_MIME),
            Some(DalleImage::Url(url)) => self.download_image(&url)?,
            None => return Err(BackendError::empty(&self.name)),
        };
        let mut image = image;
        image.description = first_revised_prompt(&payload);
        Ok(image)
    }
}

/// `1024x1024` for square, `1024x1792` for portrait ratios, landscape
/// otherwise.
pub fn dalle_size(aspect_ratio: &str) -> &'static str {
    match AspectRatio::parse(aspect_ratio) {
        Some(AspectRatio::Square) => "1024x1024",
        Some(ratio) if ratio.is_portrait() => "1024x1792",
        _ => "1792x1024",
    }
}

pub fn extract_first_image(payload: &Value) -> anyhow::Result<Option<DalleImage>> {
    let Some(first) = payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
    else {
        return Ok(None);
    };
    if let Some(encoded) = first
        .get("b64_json")
        .and_then(Value::as_str)
        .filter(|encoded| !encoded.is_empty())
    {
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .context("OpenAI image base64 decode failed")?;
        return Ok(Some(DalleImage::Inline(bytes)));
    }
    Ok(first
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| DalleImage::Url(url.to_string())))
}

fn first_revised_prompt(payload: &Value) -> Option<String> {
    payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("revised_prompt"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use imagegen_contracts::catalog::{BackendCatalog, DALL_E_3};
    use imagegen_contracts::{BusinessContext, GenerationRequest};
    use reqwest::blocking::Client as HttpClient;
    use serde_json::json;

    use super::{dalle_size, extract_first_image, DalleBackend, DalleImage};
    use crate::config::Config;

    #[test]
    fn size_follows_aspect_orientation() {
        assert_eq!(dalle_size("1:1"), "1024x1024");
        assert_eq!(dalle_size("9:16"), "1024x1792");
        assert_eq!(dalle_size("3:4"), "1024x1792");
        assert_eq!(dalle_size("16:9"), "1792x1024");
        assert_eq!(dalle_size("4:3"), "1792x1024");
        assert_eq!(dalle_size("21:9"), "1792x1024");
    }

    #[test]
    fn body_uses_enhanced_prompt() -> anyhow::Result<()> {
        let catalog = BackendCatalog::default();
        let spec = catalog
            .get(DALL_E_3)
            .ok_or_else(|| anyhow::anyhow!("dall-e missing"))?;
        let backend = DalleBackend::new(spec, &Config::default(), HttpClient::new());
        let request = GenerationRequest::new("bakery window", "1:1").with_business_context(
            BusinessContext {
                call_to_action: Some("Order now".to_string()),
                ..BusinessContext::default()
            },
        );
        let body = backend.request_body(&request);

        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["n"], 1);
        assert_eq!(body["size"], "1024x1024");
        assert_eq!(body["quality"], "standard");
        assert_eq!(
            body["prompt"],
            "bakery window\n\nInclude text overlay: \"Order now\""
        );
        Ok(())
    }

    #[test]
    fn inline_payload_wins_over_url() -> anyhow::Result<()> {
        let payload = json!({"data": [{"b64_json": BASE64.encode(b"png"), "url": "https://x.test/a.png"}]});
        assert_eq!(
            extract_first_image(&payload)?,
            Some(DalleImage::Inline(b"png".to_vec()))
        );

        let payload = json!({"data": [{"url": " https://x.test/a.png "}]});
        assert_eq!(
            extract_first_image(&payload)?,
            Some(DalleImage::Url("https://x.test/a.png".to_string()))
        );
        Ok(())
    }

    #[test]
    fn empty_data_has_no_image() -> anyhow::Result<()> {
        assert_eq!(extract_first_image(&json!({"data": []}))?, None);
        assert_eq!(extract_first_image(&json!({"data": [{"url": ""}]}))?, None);
        assert_eq!(extract_first_image(&json!({}))?, None);
        Ok(())
    }
}
