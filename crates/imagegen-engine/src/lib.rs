pub mod backends;
pub mod chain;
pub mod config;
pub mod error;
pub mod placeholder;

use image::Rgb;
use imagegen_contracts::catalog::{ChainPlanner, ChainProfile, PlaceholderStyle};
use imagegen_contracts::events::{
    EventWriter, PLACEHOLDER_FAILED, PLACEHOLDER_GENERATED, REQUEST_FINISHED, REQUEST_STARTED,
};
use imagegen_contracts::{AttemptRecord, GenerationRequest, GenerationResult};
use rand::RngCore;
use reqwest::blocking::Client as HttpClient;
use serde_json::json;
use tracing::{debug, info, warn};

pub use chain::{ChainOutcome, FallbackChain, GeneratedImage, ImageBackend};
pub use config::Config;
pub use error::{BackendError, ConfigurationError, SynthesisError};
pub use placeholder::{ColorAdvisor, PlaceholderJob, PlaceholderPainter, PlaceholderRenderer};

use backends::{build_backend, VertexColorAdvisor};
use chain::emit;

pub const NO_PROMPT_ERROR: &str = "No prompt provided";
pub const PLACEHOLDER_MIME: &str = "image/png";

/// Turns one request into one result: the profile's backends in order,
/// then a locally drawn placeholder.
pub struct ImageOrchestrator {
    profile: ChainProfile,
    placeholder: PlaceholderStyle,
    chain: FallbackChain,
    renderer: Box<dyn PlaceholderRenderer>,
    color_advisor: Option<Box<dyn ColorAdvisor>>,
    events: Option<EventWriter>,
}

impl ImageOrchestrator {
    pub fn new(config: &Config, profile: ChainProfile) -> Self {
        let plan = ChainPlanner::new(None).plan(profile);
        for name in &plan.missing {
            warn!(profile = %profile, backend = %name, "backend not in catalog");
        }

        let http = HttpClient::new();
        let mut chain = FallbackChain::new();
        for spec in &plan.backends {
            if let Some(backend) = build_backend(spec, config, &http) {
                chain.push_boxed(backend);
            }
        }
        let color_advisor = plan.color_hint.as_ref().map(|spec| {
            Box::new(VertexColorAdvisor::new(spec, config, http.clone())) as Box<dyn ColorAdvisor>
        });
        debug!(profile = %profile, backends = ?chain.names(), "chain ready");

        Self {
            profile,
            placeholder: plan.placeholder,
            chain,
            renderer: Box::new(PlaceholderPainter::from_config(config)),
            color_advisor,
            events: None,
        }
    }

    /// Replaces the planned backends, keeping the profile's placeholder.
    pub fn with_backends(mut self, chain: FallbackChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_renderer<R: PlaceholderRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_color_advisor(mut self, advisor: Option<Box<dyn ColorAdvisor>>) -> Self {
        self.color_advisor = advisor;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn profile(&self) -> ChainProfile {
        self.profile
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.chain.names()
    }

    pub fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.generate_with_rng(request, &mut rand::thread_rng())
    }

    /// Same as [`generate`](Self::generate) with the decorative randomness
    /// taken from `rng`.
    pub fn generate_with_rng(
        &self,
        request: &GenerationRequest,
        rng: &mut dyn RngCore,
    ) -> GenerationResult {
        if !request.has_prompt() {
            return GenerationResult::failed(NO_PROMPT_ERROR, request.prompt());
        }

        let events = self.events.as_ref();
        emit(
            events,
            REQUEST_STARTED,
            json!({
                "profile": self.profile.name(),
                "aspect_ratio": request.aspect_ratio(),
                "backends": self.chain.names(),
            }),
        );

        let mut outcome = self.chain.run(request, events);
        let result = match outcome.winner.take() {
            Some(winner) => GenerationResult::succeeded(
                winner.image.bytes,
                winner.image.mime_type,
                request.enhanced_prompt(),
                request.aspect_ratio(),
                winner.backend,
            )
            .with_description(winner.image.description)
            .with_attempts(outcome.attempts),
            None => self.fall_back(request, outcome, rng),
        };

        emit(
            events,
            REQUEST_FINISHED,
            json!({
                "success": result.success,
                "model": result.model,
                "attempts": result.attempts.len(),
            }),
        );
        result
    }

    fn fall_back(
        &self,
        request: &GenerationRequest,
        outcome: ChainOutcome,
        rng: &mut dyn RngCore,
    ) -> GenerationResult {
        let style = self.placeholder;
        let (width, height) = request.dimensions();
        let job = PlaceholderJob {
            style,
            prompt: request.prompt(),
            width,
            height,
            colors: self.suggested_colors(request.prompt()),
        };

        let last_error = outcome.last_error().map(str::to_string);
        let mut attempts = outcome.attempts;
        match self.renderer.render(&job, rng) {
            Ok(bytes) => {
                info!(
                    model = style.model_name(),
                    width,
                    height,
                    failed = attempts.len(),
                    "all backends failed; returning placeholder"
                );
                emit(
                    self.events.as_ref(),
                    PLACEHOLDER_GENERATED,
                    json!({ "model": style.model_name(), "bytes": bytes.len() }),
                );
                GenerationResult::succeeded(
                    bytes,
                    PLACEHOLDER_MIME,
                    request.enhanced_prompt(),
                    request.aspect_ratio(),
                    style.model_name(),
                )
                .with_note(style.note())
                .with_attempts(attempts)
            }
            Err(err) => {
                let synthesis = err.to_string();
                warn!(model = style.model_name(), error = %synthesis, "placeholder synthesis failed");
                emit(
                    self.events.as_ref(),
                    PLACEHOLDER_FAILED,
                    json!({ "model": style.model_name(), "error": synthesis }),
                );
                let last_error = last_error.unwrap_or_else(|| synthesis.clone());
                attempts.push(AttemptRecord::new(style.model_name(), synthesis));
                GenerationResult::failed(
                    format!("All generation methods failed. Last error: {last_error}"),
                    request.enhanced_prompt(),
                )
                .with_attempts(attempts)
            }
        }
    }

    /// Colour hint for the gradient placeholder; any failure means "none".
    fn suggested_colors(&self, prompt: &str) -> Option<(Rgb<u8>, Rgb<u8>)> {
        if self.placeholder != PlaceholderStyle::Gradient {
            return None;
        }
        let advisor = self.color_advisor.as_ref()?;
        match advisor.suggest(prompt) {
            Ok(colors) => {
                debug!(
                    advisor = advisor.name(),
                    first = %placeholder::palette::to_hex(colors.0),
                    second = %placeholder::palette::to_hex(colors.1),
                    "colour hint received"
                );
                Some(colors)
            }
            Err(err) => {
                debug!(advisor = advisor.name(), error = %err.summary(), "colour hint unavailable");
                None
            }
        }
    }
}
