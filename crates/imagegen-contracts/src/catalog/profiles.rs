use std::fmt;
use std::str::FromStr;

use super::registry::{
    BackendCatalog, BackendSpec, Capability, DALL_E_3, GEMINI_FLASH_IMAGE, IMAGEGENERATION_005,
    IMAGEGENERATION_006, IMAGEN_3, IMAGEN_4_FAST, IMAGEN_4_PREDICT,
};

const GEMINI_CHAIN: &[&str] = &[GEMINI_FLASH_IMAGE];
const GENAI_CHAIN: &[&str] = &[
    IMAGEN_3,
    IMAGEN_4_FAST,
    IMAGEGENERATION_006,
    IMAGEGENERATION_005,
];
const IMAGEN_CHAIN: &[&str] = &[IMAGEN_4_PREDICT];
const DALLE_CHAIN: &[&str] = &[DALL_E_3];

/// Named fallback chains. `Full` tries every image backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainProfile {
    #[default]
    Full,
    Gemini,
    Genai,
    Imagen,
    Dalle,
}

impl ChainProfile {
    pub const ALL: [ChainProfile; 5] = [
        ChainProfile::Full,
        ChainProfile::Gemini,
        ChainProfile::Genai,
        ChainProfile::Imagen,
        ChainProfile::Dalle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChainProfile::Full => "full",
            ChainProfile::Gemini => "gemini",
            ChainProfile::Genai => "genai",
            ChainProfile::Imagen => "imagen",
            ChainProfile::Dalle => "dalle",
        }
    }

    fn backend_names(self) -> Option<&'static [&'static str]> {
        match self {
            ChainProfile::Full => None,
            ChainProfile::Gemini => Some(GEMINI_CHAIN),
            ChainProfile::Genai => Some(GENAI_CHAIN),
            ChainProfile::Imagen => Some(IMAGEN_CHAIN),
            ChainProfile::Dalle => Some(DALLE_CHAIN),
        }
    }

    pub fn placeholder(self) -> PlaceholderStyle {
        match self {
            ChainProfile::Genai => PlaceholderStyle::Gradient,
            _ => PlaceholderStyle::Styled,
        }
    }
}

impl fmt::Display for ChainProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChainProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|profile| profile.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|profile| profile.name()).collect();
                format!(
                    "Unknown profile '{raw}'; expected one of: {}.",
                    names.join(", ")
                )
            })
    }
}

/// Which local image closes the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderStyle {
    /// Themed three-colour gradient with shapes, optional robot and text.
    Styled,
    /// Two-colour gradient with text, colours hinted or hashed from the prompt.
    Gradient,
}

impl PlaceholderStyle {
    pub fn model_name(self) -> &'static str {
        match self {
            PlaceholderStyle::Styled => "ai-styled-generator",
            PlaceholderStyle::Gradient => "fallback-gradient",
        }
    }

    pub fn note(self) -> &'static str {
        match self {
            PlaceholderStyle::Styled => "Generated using AI-styled image creator",
            PlaceholderStyle::Gradient => "Using fallback gradient due to API limitations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPlan {
    pub profile: ChainProfile,
    pub backends: Vec<BackendSpec>,
    pub placeholder: PlaceholderStyle,
    pub color_hint: Option<BackendSpec>,
    /// Profile entries absent from the catalog.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChainPlanner {
    pub catalog: BackendCatalog,
}

impl ChainPlanner {
    pub fn new(catalog: Option<BackendCatalog>) -> Self {
        Self {
            catalog: catalog.unwrap_or_default(),
        }
    }

    pub fn plan(&self, profile: ChainProfile) -> ChainPlan {
        let mut missing = Vec::new();
        let backends = match profile.backend_names() {
            None => self.catalog.image_backends(),
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    let found = self
                        .catalog
                        .get(name)
                        .filter(|spec| spec.produces_image())
                        .cloned();
                    if found.is_none() {
                        missing.push((*name).to_string());
                    }
                    found
                })
                .collect(),
        };
        let placeholder = profile.placeholder();
        let color_hint = match placeholder {
            PlaceholderStyle::Gradient => self
                .catalog
                .by_capability(Capability::ColorHint)
                .into_iter()
                .next(),
            PlaceholderStyle::Styled => None,
        };

        ChainPlan {
            profile,
            backends,
            placeholder,
            color_hint,
            missing,
        }
    }
}
