use serde::{Deserialize, Serialize};

/// One backend that was tried (or skipped) before the final outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub backend: String,
    pub error: String,
}

impl AttemptRecord {
    pub fn new(backend: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            error: error.into(),
        }
    }
}

/// Final JSON document printed for a request.
///
/// `image_data` travels as standard base64 and is present iff `success`;
/// `error` is present iff not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub image_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

impl GenerationResult {
    pub fn succeeded(
        image_data: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: impl Into<String>,
        aspect_ratio: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            image_data: Some(image_data),
            mime_type: Some(mime_type.into()),
            prompt: prompt.into(),
            aspect_ratio: Some(aspect_ratio.into()),
            model: Some(model.into()),
            description: None,
            note: None,
            error: None,
            attempts: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            success: false,
            image_data: None,
            mime_type: None,
            prompt: prompt.into(),
            aspect_ratio: None,
            model: None,
            description: None,
            note: None,
            error: Some(error.into()),
            attempts: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|encoded| BASE64.decode(encoded.as_bytes()))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
