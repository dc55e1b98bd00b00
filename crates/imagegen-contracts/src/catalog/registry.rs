use indexmap::IndexMap;

pub const GEMINI_FLASH_IMAGE: &str = "gemini-2.5-flash-image-preview";
pub const IMAGEN_3: &str = "imagen-3.0-generate-002";
pub const IMAGEN_4_FAST: &str = "imagen-4.0-fast-generate-001";
pub const IMAGEGENERATION_006: &str = "imagegeneration@006";
pub const IMAGEGENERATION_005: &str = "imagegeneration@005";
pub const IMAGEN_4_PREDICT: &str = "imagen-4.0-generate-001";
pub const DALL_E_3: &str = "dall-e-3";
pub const GEMINI_COLOR_HINT: &str = "gemini-2.0-flash-exp";

pub const PROVIDER_VERTEX: &str = "vertex";
pub const PROVIDER_VERTEX_PREDICT: &str = "vertex-predict";
pub const PROVIDER_OPENAI: &str = "openai";

/// What a backend can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Multimodal model returning inline image bytes.
    MultimodalImage,
    /// Dedicated text-to-image prediction endpoint.
    TextToImage,
    /// Third-party API answering with a downloadable image URL.
    ThirdPartyImage,
    /// Text model suggesting placeholder colours.
    ColorHint,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::MultimodalImage => "multimodal-image",
            Capability::TextToImage => "text-to-image",
            Capability::ThirdPartyImage => "third-party-image",
            Capability::ColorHint => "color-hint",
        }
    }

    pub fn produces_image(self) -> bool {
        !matches!(self, Capability::ColorHint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
    /// Environment variables holding the credential, first non-empty wins.
    pub credential_env: Vec<String>,
}

impl BackendSpec {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.iter().any(|item| *item == capability)
    }

    pub fn produces_image(&self) -> bool {
        self.capabilities.iter().any(|item| item.produces_image())
    }
}

/// Known backends in priority order.
#[derive(Debug, Clone)]
pub struct BackendCatalog {
    backends: IndexMap<String, BackendSpec>,
}

impl BackendCatalog {
    pub fn new(backends: Option<IndexMap<String, BackendSpec>>) -> Self {
        Self {
            backends: backends.unwrap_or_else(default_backends),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.get(name)
    }

    pub fn by_capability(&self, capability: Capability) -> Vec<BackendSpec> {
        self.backends
            .values()
            .filter(|backend| backend.supports(capability))
            .cloned()
            .collect()
    }

    pub fn image_backends(&self) -> Vec<BackendSpec> {
        self.backends
            .values()
            .filter(|backend| backend.produces_image())
            .cloned()
            .collect()
    }
}

impl Default for BackendCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

const VERTEX_GEMINI_KEYS: &[&str] = &["GOOGLE_CLOUD_API_KEY", "VERTEX_API_KEY"];
const VERTEX_GENAI_KEYS: &[&str] = &["VERTEX_API_KEY", "GOOGLE_CLOUD_API_KEY", "GEMINI_API_KEY"];

fn default_backends() -> IndexMap<String, BackendSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str,
                      provider: &str,
                      capabilities: &[Capability],
                      credential_env: &[&str]| {
        map.insert(
            name.to_string(),
            BackendSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities.to_vec(),
                credential_env: credential_env
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert(
        GEMINI_FLASH_IMAGE,
        PROVIDER_VERTEX,
        &[Capability::MultimodalImage],
        VERTEX_GEMINI_KEYS,
    );
    for variant in [
        IMAGEN_3,
        IMAGEN_4_FAST,
        IMAGEGENERATION_006,
        IMAGEGENERATION_005,
    ] {
        insert(
            variant,
            PROVIDER_VERTEX,
            &[Capability::MultimodalImage],
            VERTEX_GENAI_KEYS,
        );
    }
    insert(
        IMAGEN_4_PREDICT,
        PROVIDER_VERTEX_PREDICT,
        &[Capability::TextToImage],
        &["VERTEX_API_KEY"],
    );
    insert(
        DALL_E_3,
        PROVIDER_OPENAI,
        &[Capability::ThirdPartyImage],
        &["OPENAI_API_KEY"],
    );
    insert(
        GEMINI_COLOR_HINT,
        PROVIDER_VERTEX,
        &[Capability::ColorHint],
        VERTEX_GENAI_KEYS,
    );

    map
}
