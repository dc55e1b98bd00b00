use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_VERTEX_API_BASE: &str = "https://aiplatform.googleapis.com/v1";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Every variable a backend may read its key from.
pub const CREDENTIAL_ENV_VARS: &[&str] = &[
    "VERTEX_API_KEY",
    "GOOGLE_CLOUD_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
];

pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Regular faces for subtitles, tried before the title list.
pub const DEFAULT_SUBTITLE_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// API keys by environment variable name. Values never appear in `Debug`.
#[derive(Clone, Default)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return;
        }
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// First configured key among `names`, in order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name.as_ref()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub google_cloud_project: Option<String>,
    pub vertex_location: String,
    pub vertex_api_base: String,
    pub openai_api_base: String,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    /// Title face candidates, first readable wins.
    pub font_paths: Vec<PathBuf>,
    /// Subtitle face candidates; the title list is the fallback.
    pub subtitle_font_paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::new(),
            google_cloud_project: None,
            vertex_location: DEFAULT_VERTEX_LOCATION.to_string(),
            vertex_api_base: DEFAULT_VERTEX_API_BASE.to_string(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            font_paths: DEFAULT_FONT_PATHS.iter().map(PathBuf::from).collect(),
            subtitle_font_paths: DEFAULT_SUBTITLE_FONT_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    /// Builds a config from any key/value source; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        for name in CREDENTIAL_ENV_VARS {
            if let Some(value) = lookup(name) {
                config.credentials.insert(*name, value);
            }
        }
        config.google_cloud_project = lookup("GOOGLE_CLOUD_PROJECT");
        if let Some(location) = lookup("VERTEX_LOCATION") {
            config.vertex_location = location;
        }
        if let Some(base) = lookup("VERTEX_API_BASE") {
            config.vertex_api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            config.openai_api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("IMAGEGEN_TIMEOUT_SECS") {
            match parse_timeout_secs(&raw) {
                Some(timeout) => config.request_timeout = timeout,
                None => warn!(value = %raw, "ignoring invalid IMAGEGEN_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("IMAGEGEN_FONT_PATHS") {
            prepend_paths(&mut config.font_paths, &raw);
        }
        if let Some(raw) = lookup("IMAGEGEN_SUBTITLE_FONT_PATHS") {
            prepend_paths(&mut config.subtitle_font_paths, &raw);
        }

        config
    }

    pub fn with_credential(mut self, name: &str, value: &str) -> Self {
        self.credentials.insert(name, value);
        self
    }

    pub fn with_google_cloud_project(mut self, project: impl Into<String>) -> Self {
        self.google_cloud_project = Some(project.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replaces both font lists; an empty list forces the bitmap face.
    pub fn with_font_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.subtitle_font_paths = paths.clone();
        self.font_paths = paths;
        self
    }

    /// Subtitle candidates followed by the title candidates.
    pub fn subtitle_font_candidates(&self) -> Vec<PathBuf> {
        self.subtitle_font_paths
            .iter()
            .chain(&self.font_paths)
            .cloned()
            .collect()
    }
}

fn prepend_paths(paths: &mut Vec<PathBuf>, raw: &str) {
    let mut front: Vec<PathBuf> = raw
        .split(':')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(PathBuf::from)
        .collect();
    front.append(paths);
    *paths = front;
}

/// Positive, finite number of seconds.
pub fn parse_timeout_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
