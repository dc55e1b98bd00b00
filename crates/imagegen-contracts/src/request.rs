use serde::{Deserialize, Serialize};

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Aspect ratios with a fixed pixel size. Anything else is rendered at 16:9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
    Standard,
    StandardPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Standard,
        AspectRatio::StandardPortrait,
    ];

    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.label() == normalized)
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::StandardPortrait => "3:4",
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1024, 1024),
            AspectRatio::Landscape => (1024, 576),
            AspectRatio::Portrait => (576, 1024),
            AspectRatio::Standard => (1024, 768),
            AspectRatio::StandardPortrait => (768, 1024),
        }
    }

    pub fn is_portrait(self) -> bool {
        let (width, height) = self.dimensions();
        height > width
    }
}

/// Pixel size for a ratio label; unknown labels fall back to 16:9.
pub fn dimensions_for_label(label: &str) -> (u32, u32) {
    AspectRatio::parse(label)
        .unwrap_or(AspectRatio::Landscape)
        .dimensions()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessContext {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brand_tone: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
}

impl BusinessContext {
    fn field(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn business_name(&self) -> Option<&str> {
        Self::field(&self.business_name)
    }

    pub fn product_name(&self) -> Option<&str> {
        Self::field(&self.product_name)
    }

    pub fn brand_tone(&self) -> Option<&str> {
        Self::field(&self.brand_tone)
    }

    pub fn call_to_action(&self) -> Option<&str> {
        Self::field(&self.call_to_action)
    }
}

/// One image request as read from the command line payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    prompt: String,
    #[serde(default = "default_aspect_ratio")]
    aspect_ratio: String,
    #[serde(default)]
    business_context: Option<BusinessContext>,
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: aspect_ratio.into(),
            business_context: None,
        }
    }

    pub fn with_business_context(mut self, context: BusinessContext) -> Self {
        self.business_context = Some(context);
        self
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    pub fn aspect_ratio(&self) -> &str {
        &self.aspect_ratio
    }

    pub fn known_aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::parse(&self.aspect_ratio)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        dimensions_for_label(&self.aspect_ratio)
    }

    pub fn business_context(&self) -> Option<&BusinessContext> {
        self.business_context.as_ref()
    }

    /// Prompt with brand details and the call to action folded in.
    pub fn enhanced_prompt(&self) -> String {
        let mut enhanced = self.prompt.clone();
        let Some(context) = self.business_context.as_ref() else {
            return enhanced;
        };

        let business = context.business_name();
        let product = context.product_name();
        if business.is_some() || product.is_some() {
            enhanced = format!("{}\n\nBrand: {}", self.prompt, business.unwrap_or_default());
            if let Some(product) = product {
                enhanced.push_str(&format!(", Product: {product}"));
            }
            if let Some(tone) = context.brand_tone() {
                enhanced.push_str(&format!(", Style: {tone}"));
            }
        }
        if let Some(cta) = context.call_to_action() {
            enhanced.push_str(&format!("\n\nInclude text overlay: \"{cta}\""));
        }
        enhanced
    }
}

#[cfg(test)]
mod tests {
    use super::{dimensions_for_label, AspectRatio, BusinessContext, GenerationRequest};

    #[test]
    fn aspect_table_matches_fixed_dimensions() {
        assert_eq!(dimensions_for_label("1:1"), (1024, 1024));
        assert_eq!(dimensions_for_label("16:9"), (1024, 576));
        assert_eq!(dimensions_for_label("9:16"), (576, 1024));
        assert_eq!(dimensions_for_label("4:3"), (1024, 768));
        assert_eq!(dimensions_for_label("3:4"), (768, 1024));
    }

    #[test]
    fn unknown_ratio_uses_landscape_dimensions() {
        assert_eq!(dimensions_for_label("21:9"), (1024, 576));
        assert_eq!(dimensions_for_label(""), (1024, 576));
        assert!(AspectRatio::parse("square").is_none());
    }

    #[test]
    fn request_json_defaults_ratio_and_keeps_unknown_labels() -> anyhow::Result<()> {
        let request = GenerationRequest::from_json(r#"{"prompt":"boat"}"#)?;
        assert_eq!(request.prompt(), "boat");
        assert_eq!(request.aspect_ratio(), "16:9");
        assert!(request.business_context().is_none());

        let request = GenerationRequest::from_json(r#"{"prompt":"boat","aspectRatio":"2:1"}"#)?;
        assert_eq!(request.aspect_ratio(), "2:1");
        assert_eq!(request.known_aspect_ratio(), None);
        assert_eq!(request.dimensions(), (1024, 576));
        Ok(())
    }

    #[test]
    fn missing_prompt_deserializes_as_empty() -> anyhow::Result<()> {
        let request = GenerationRequest::from_json(r#"{"aspectRatio":"1:1"}"#)?;
        assert!(!request.has_prompt());
        let request = GenerationRequest::from_json(r#"{"prompt":"   "}"#)?;
        assert!(!request.has_prompt());
        Ok(())
    }

    #[test]
    fn enhanced_prompt_folds_in_brand_details() -> anyhow::Result<()> {
        let request = GenerationRequest::from_json(
            r#"{
                "prompt": "coffee on a desk",
                "businessContext": {
                    "businessName": "Bean Co",
                    "productName": "Cold Brew",
                    "brandTone": "playful",
                    "callToAction": "Order now"
                }
            }"#,
        )?;
        assert_eq!(
            request.enhanced_prompt(),
            "coffee on a desk\n\nBrand: Bean Co, Product: Cold Brew, Style: playful\n\nInclude text overlay: \"Order now\""
        );
        Ok(())
    }

    #[test]
    fn enhanced_prompt_skips_tone_without_brand_or_product() {
        let request = GenerationRequest::new("city skyline", "1:1").with_business_context(
            BusinessContext {
                brand_tone: Some("moody".to_string()),
                ..BusinessContext::default()
            },
        );
        assert_eq!(request.enhanced_prompt(), "city skyline");

        let request = GenerationRequest::new("city skyline", "1:1").with_business_context(
            BusinessContext {
                product_name: Some("Lamp".to_string()),
                call_to_action: Some("  ".to_string()),
                ..BusinessContext::default()
            },
        );
        assert_eq!(request.enhanced_prompt(), "city skyline\n\nBrand: , Product: Lamp");
    }
}
