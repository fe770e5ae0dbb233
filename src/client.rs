//! HTTP client and request builders.

use crate::config::{Config, DEFAULT_SYSTEM_PROMPT};
use crate::credentials::{ApiKey, CredentialSource, EnvCredentials};
use crate::error::Error;
use crate::stream::{ByteStream, QueryStream, ResponseStream};
use crate::types::ChatRequest;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect and response-start timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Main client for the chat completions API.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: ApiKey,
    config: Arc<Config>,
    timeout: Duration,
    read_timeout: Option<Duration>,
}

/// Builder for Client.
pub struct ClientBuilder {
    api_key: Option<String>,
    credentials: Box<dyn CredentialSource>,
    config: Config,
    timeout: Duration,
    read_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new client builder reading credentials from the environment.
    pub fn new() -> Self {
        Self {
            api_key: None,
            credentials: Box::new(EnvCredentials),
            config: Config::default(),
            timeout: DEFAULT_TIMEOUT,
            read_timeout: None,
        }
    }

    /// Use this API key instead of looking one up.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Where to look up the key when none is passed explicitly.
    pub fn credentials(mut self, source: impl CredentialSource + 'static) -> Self {
        self.credentials = Box::new(source);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set a custom endpoint URL (useful for testing with mock servers).
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set temperature for sampling.
    pub fn temperature(mut self, temp: f64) -> Self {
        self.config.temperature = temp;
        self
    }

    /// Set top-p for nucleus sampling.
    pub fn top_p(mut self, p: f64) -> Self {
        self.config.top_p = p;
        self
    }

    /// Set maximum tokens to generate.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    pub fn presence_penalty(mut self, penalty: f64) -> Self {
        self.config.presence_penalty = penalty;
        self
    }

    pub fn frequency_penalty(mut self, penalty: f64) -> Self {
        self.config.frequency_penalty = penalty;
        self
    }

    /// Restrict search to these domains.
    pub fn search_domain_filter(mut self, domains: Vec<String>) -> Self {
        self.config.search_domain_filter = Some(domains);
        self
    }

    /// Set the search recency window (`"month"`, `"week"`, ...); `None` omits it.
    pub fn search_recency_filter(mut self, recency: Option<String>) -> Self {
        self.config.search_recency_filter = recency;
        self
    }

    pub fn return_images(mut self, enabled: bool) -> Self {
        self.config.return_images = enabled;
        self
    }

    pub fn return_related_questions(mut self, enabled: bool) -> Self {
        self.config.return_related_questions = enabled;
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set connect and response-start timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// End a stream if no bytes arrive for this long. Off by default.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Build the client. Fails if no credential can be found; never touches the network.
    pub fn build(self) -> Result<Client, Error> {
        let api_key = ApiKey::resolve(self.api_key, self.credentials.as_ref())?;
        self.config.validate()?;

        let http = reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .user_agent(concat!("perplexity-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        debug!(model = %self.config.model, endpoint = %self.config.endpoint, "client ready");

        Ok(Client {
            http,
            api_key,
            config: Arc::new(self.config),
            timeout: self.timeout,
            read_timeout: self.read_timeout,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &self.api_key)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client from an explicit key, or from `PPLX_API_KEY` when `None`.
    pub fn new(api_key: Option<String>) -> Result<Self, Error> {
        let builder = ClientBuilder::new();
        match api_key {
            Some(key) => builder.api_key(key).build(),
            None => builder.build(),
        }
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        ClientBuilder::new().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the request body for a prompt.
    pub fn payload(&self, prompt: &str, system_prompt: &str, stream: bool) -> ChatRequest {
        ChatRequest::new(&self.config, prompt, system_prompt, stream)
    }

    /// Start building a synchronous query.
    pub fn query<'a>(&'a self, prompt: &'a str) -> Query<'a> {
        Query {
            client: self,
            prompt,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
        }
    }

    /// Start building a streaming query.
    pub fn stream_query<'a>(&'a self, prompt: &'a str) -> StreamQuery<'a> {
        StreamQuery {
            client: self,
            prompt,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = self.api_key.bearer() {
            headers.insert(AUTHORIZATION, auth);
        }
        headers
    }

    fn request(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        self.http
            .post(&self.config.endpoint)
            .headers(self.headers())
            .json(body)
    }

    /// Execute a non-streaming request.
    #[tracing::instrument(name = "pplx_query", skip(self, body), fields(model = %body.model), err)]
    async fn execute_query(&self, body: &ChatRequest) -> Result<Value, Error> {
        debug!(endpoint = %self.config.endpoint, "sending chat completion request");

        let resp = self
            .request(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::api_request(None, describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            warn!(status = status.as_u16(), "chat completion returned error status");
            return Err(Error::api_request(Some(status.as_u16()), message));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Error::api_request(Some(status.as_u16()), describe(&e)))?;
        let value = serde_json::from_str(&text).map_err(|e| {
            Error::api_request(Some(status.as_u16()), format!("invalid JSON body: {e}"))
        })?;

        debug!(status = status.as_u16(), bytes = text.len(), "chat completion received");
        Ok(value)
    }

    /// Execute a streaming request.
    #[tracing::instrument(name = "pplx_stream_query", skip(self, body), fields(model = %body.model), err)]
    async fn execute_stream(
        &self,
        body: &ChatRequest,
    ) -> Result<ResponseStream, Error> {
        debug!(endpoint = %self.config.endpoint, "opening chat completion stream");

        // Bound the wait for response headers only; the body may take longer.
        let resp = tokio::time::timeout(self.timeout, self.request(body).send())
            .await
            .map_err(|_| {
                Error::stream_request(None, format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| Error::stream_request(None, describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            warn!(status = status.as_u16(), "chat completion stream returned error status");
            return Err(Error::stream_request(Some(status.as_u16()), message));
        }

        debug!(status = status.as_u16(), "chat completion stream open");
        let bytes: ByteStream = Box::pin(resp.bytes_stream());
        Ok(QueryStream::new(bytes).with_idle_timeout(self.read_timeout))
    }
}

/// Transport error text, flagging timeouts explicitly.
fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {e}")
    } else {
        e.to_string()
    }
}

/// Describe an error response, preferring the provider's `error.message`.
async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .map(std::string::ToString::to_string)
        })
        .unwrap_or(body);

    if detail.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    }
}

/// Builder for a synchronous query.
pub struct Query<'a> {
    client: &'a Client,
    prompt: &'a str,
    system_prompt: &'a str,
}

impl<'a> Query<'a> {
    /// Override the system instruction.
    pub fn system(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// The body this query will send.
    pub fn payload(&self) -> ChatRequest {
        self.client.payload(self.prompt, self.system_prompt, false)
    }

    /// Send the request and return the decoded response body.
    pub async fn send(self) -> Result<Value, Error> {
        let body = self.payload();
        self.client.execute_query(&body).await
    }
}

/// Builder for a streaming query.
pub struct StreamQuery<'a> {
    client: &'a Client,
    prompt: &'a str,
    system_prompt: &'a str,
}

impl<'a> StreamQuery<'a> {
    /// Override the system instruction.
    pub fn system(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// The body this query will send.
    pub fn payload(&self) -> ChatRequest {
        self.client.payload(self.prompt, self.system_prompt, true)
    }

    /// Send the request and return a stream of decoded events.
    pub async fn send(self) -> Result<ResponseStream, Error> {
        let body = self.payload();
        self.client.execute_stream(&body).await
    }
}
