//! Generation parameters and endpoint selection applied to every request.

use crate::error::Error;

/// Perplexity chat completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = models::SONAR_SMALL_ONLINE;

/// System instruction used when the caller does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Be precise and concise.";

/// Known Sonar online models.
pub mod models {
    pub const SONAR_SMALL_ONLINE: &str = "llama-3.1-sonar-small-128k-online";
    pub const SONAR_LARGE_ONLINE: &str = "llama-3.1-sonar-large-128k-online";
    pub const SONAR_HUGE_ONLINE: &str = "llama-3.1-sonar-huge-128k-online";

    /// All known models, smallest first.
    pub const ALL: [&str; 3] = [SONAR_SMALL_ONLINE, SONAR_LARGE_ONLINE, SONAR_HUGE_ONLINE];
}

/// Client configuration.
///
/// Built once through [`ClientBuilder`](crate::ClientBuilder) and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chat completions URL.
    pub endpoint: String,
    pub model: String,
    /// Sampling temperature, within `[0.0, 1.0]`.
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// Omitted from the payload when `None` or zero.
    pub max_tokens: Option<u32>,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    /// Omitted from the payload when `None` or empty.
    pub search_domain_filter: Option<Vec<String>>,
    pub return_images: bool,
    pub return_related_questions: bool,
    /// Omitted from the payload when `None` or empty.
    pub search_recency_filter: Option<String>,
    pub top_k: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: None,
            presence_penalty: 0.0,
            frequency_penalty: 1.0,
            search_domain_filter: None,
            return_images: false,
            return_related_questions: false,
            search_recency_filter: Some("month".to_string()),
            top_k: 0,
        }
    }
}

impl Config {
    /// Check value ranges and the endpoint URL.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::configuration(format!(
                "temperature must be within [0.0, 1.0], got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::configuration("model must not be empty"));
        }
        reqwest::Url::parse(&self.endpoint)
            .map_err(|e| Error::configuration(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;
        Ok(())
    }
}
