use crate::config::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body sent to the chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_filter: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,
    pub return_images: bool,
    pub return_related_questions: bool,
    pub top_k: u32,
}

impl ChatRequest {
    /// Build the payload for one prompt. Unset, zero, or empty optionals are dropped.
    pub fn new(config: &Config, prompt: &str, system_prompt: &str, stream: bool) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(prompt)],
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            stream,
            max_tokens: config.max_tokens.filter(|&n| n > 0),
            search_domain_filter: config
                .search_domain_filter
                .clone()
                .filter(|domains| !domains.is_empty()),
            search_recency_filter: config
                .search_recency_filter
                .clone()
                .filter(|recency| !recency.is_empty()),
            return_images: config.return_images,
            return_related_questions: config.return_related_questions,
            top_k: config.top_k,
        }
    }
}

/// Typed view over a completion body or a streamed chunk.
///
/// The client returns raw JSON; this is an optional lens for the usual shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Source URLs the answer was grounded on.
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    /// Present on synchronous responses.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    /// Present on streamed chunks.
    #[serde(default)]
    pub delta: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl ChatResponse {
    /// Interpret a decoded value. Returns `None` if the shape does not match.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Content of the first choice's message.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
    }

    /// Content of the first choice's delta.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices.first()?.delta.as_ref()?.content.as_deref()
    }
}

/// Non-empty delta text of a raw streamed chunk.
pub fn chunk_text(chunk: &Value) -> Option<&str> {
    chunk
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_order() {
        let req = ChatRequest::new(&Config::default(), "question", "be brief", false);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "question"}
            ])
        );
    }

    #[test]
    fn test_default_payload_keys() {
        let req = ChatRequest::new(&Config::default(), "hi", "sys", true);
        let body = serde_json::to_value(&req).unwrap();
        let obj = body.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "frequency_penalty",
                "messages",
                "model",
                "presence_penalty",
                "return_images",
                "return_related_questions",
                "search_recency_filter",
                "stream",
                "temperature",
                "top_k",
                "top_p",
            ]
        );
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["temperature"], json!(0.2));
        assert_eq!(body["top_p"], json!(0.9));
        assert_eq!(body["frequency_penalty"], json!(1.0));
        assert_eq!(body["search_recency_filter"], json!("month"));
        assert_eq!(body["top_k"], json!(0));
    }

    #[test]
    fn test_max_tokens_inclusion() {
        let mut config = Config::default();
        config.max_tokens = Some(0);
        let body = serde_json::to_value(ChatRequest::new(&config, "p", "s", false)).unwrap();
        assert!(body.get("max_tokens").is_none());

        config.max_tokens = Some(256);
        let body = serde_json::to_value(ChatRequest::new(&config, "p", "s", false)).unwrap();
        assert_eq!(body["max_tokens"], json!(256));
    }

    #[test]
    fn test_search_filters() {
        let mut config = Config::default();
        config.search_domain_filter = Some(Vec::new());
        config.search_recency_filter = None;
        let body = serde_json::to_value(ChatRequest::new(&config, "p", "s", false)).unwrap();
        assert!(body.get("search_domain_filter").is_none());
        assert!(body.get("search_recency_filter").is_none());

        config.search_domain_filter = Some(vec!["arxiv.org".into()]);
        config.search_recency_filter = Some("week".into());
        let body = serde_json::to_value(ChatRequest::new(&config, "p", "s", false)).unwrap();
        assert_eq!(body["search_domain_filter"], json!(["arxiv.org"]));
        assert_eq!(body["search_recency_filter"], json!("week"));
    }

    #[test]
    fn test_response_content() {
        let value = json!({
            "id": "abc",
            "model": "llama-3.1-sonar-small-128k-online",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}],
            "citations": ["https://example.com"],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        });
        let resp = ChatResponse::from_value(&value).unwrap();
        assert_eq!(resp.content(), Some("ok"));
        assert_eq!(resp.citations.len(), 1);
        assert_eq!(resp.usage.unwrap().total_tokens, 4);
        assert!(resp.delta_content().is_none());
    }

    #[test]
    fn test_chunk_text() {
        let chunk = json!({"choices": [{"delta": {"content": "Hel"}}]});
        assert_eq!(chunk_text(&chunk), Some("Hel"));
        assert_eq!(
            ChatResponse::from_value(&chunk).unwrap().delta_content(),
            Some("Hel")
        );

        assert!(chunk_text(&json!({"choices": [{"delta": {"content": ""}}]})).is_none());
        assert!(chunk_text(&json!({"a": 1})).is_none());
    }
}
