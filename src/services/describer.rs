use crate::config::DescribeSettings;
use crate::models::DescribeResponse;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Questionnaire order of the returned scores, as attribute keys
pub const SCORE_ORDER: [&str; 8] = [
    "safety",
    "employment",
    "diversity",
    "cost",
    "walkability",
    "remote_work",
    "density",
    "politics",
];

const MAX_SCORE: u8 = 8;

/// Errors that can occur while turning a description into scores
#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("Description cannot be empty")]
    EmptyDescription,

    #[error("Your description didn't include enough detail to generate matches. Try mentioning preferences like safety, affordability, diversity, etc.")]
    InsufficientDetail,

    #[error("AI response was incomplete. Please rephrase your description. ({0})")]
    IncompleteResponse(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Model API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl DescribeError {
    /// HTTP status the API should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            DescribeError::EmptyDescription
            | DescribeError::InsufficientDetail
            | DescribeError::IncompleteResponse(_) => 400,
            DescribeError::RequestError(_)
            | DescribeError::Upstream { .. }
            | DescribeError::InvalidResponse(_) => 502,
        }
    }

    /// Message safe to return to API clients.
    ///
    /// Upstream failures are reported generically; their details only go to
    /// the log.
    pub fn client_message(&self) -> String {
        match self.status_code() {
            502 => "Upstream model error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDescription {
    #[serde(default)]
    scores: Value,
    #[serde(default)]
    summary: String,
}

/// Chat-completion client that rates a free-text description on the eight
/// city attributes.
///
/// Answers are cached by normalized description; the upstream model is only
/// called on a miss.
pub struct Describer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    cache: moka::future::Cache<String, DescribeResponse>,
}

impl Describer {
    pub fn new(settings: &DescribeSettings) -> Result<Self, DescribeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let cache = moka::future::CacheBuilder::new(settings.cache_size)
            .time_to_live(Duration::from_secs(settings.cache_ttl_secs))
            .build();

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            cache,
        })
    }

    /// Rate a description, consulting the cache first
    pub async fn describe(&self, description: &str) -> Result<DescribeResponse, DescribeError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DescribeError::EmptyDescription);
        }

        let key = cache_key(description);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Describe cache hit");
            return Ok(hit);
        }

        let content = self.complete(&build_prompt(description)).await?;
        let response = parse_description(&content)?;

        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }

    async fn complete(&self, prompt: &str) -> Result<String, DescribeError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });

        tracing::debug!("Requesting description scores from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Model API returned {}: {}", status, body);
            return Err(DescribeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| DescribeError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| DescribeError::InvalidResponse("Missing message content".into()))
    }
}

fn cache_key(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn build_prompt(description: &str) -> String {
    format!(
        r#"A user described the kind of city they want to live in:
"""{description}"""

1. Rate each category below from 0 (not mentioned) to {max} (very important):
- Safety
- Employment
- Diversity
- Affordability
- Walkability
- Remote Work
- Density (0=rural, 4=urban)
- Politics (0=very conservative, 8=very liberal)

2. Write a friendly one or two sentence summary of the place they are looking for.

If the description is too vague to rate, reply with the summary "insufficient detail".

Return only a JSON object shaped like:
{{
  "scores": [int, int, int, int, int, int, int, int],
  "summary": "..."
}}"#,
        description = description,
        max = MAX_SCORE,
    )
}

/// Interpret the model's reply
fn parse_description(content: &str) -> Result<DescribeResponse, DescribeError> {
    let content = strip_code_fence(content);

    if content.to_lowercase().starts_with("insufficient") {
        return Err(DescribeError::InsufficientDetail);
    }

    let raw: RawDescription = serde_json::from_str(content)
        .map_err(|e| DescribeError::InvalidResponse(format!("Model reply is not JSON: {}", e)))?;

    if raw.summary.trim().to_lowercase().starts_with("insufficient") {
        return Err(DescribeError::InsufficientDetail);
    }

    let values = raw
        .scores
        .as_array()
        .filter(|values| values.len() == SCORE_ORDER.len())
        .ok_or_else(|| DescribeError::IncompleteResponse("expected 8 scores".into()))?;

    let scores = values
        .iter()
        .map(|v| {
            v.as_u64()
                .filter(|&n| n <= u64::from(MAX_SCORE))
                .map(|n| n as u8)
                .ok_or_else(|| DescribeError::IncompleteResponse(format!("invalid score {}", v)))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let attributes = SCORE_ORDER
        .iter()
        .zip(&scores)
        .map(|(key, &score)| (key.to_string(), score))
        .collect();

    Ok(DescribeResponse {
        scores,
        summary: raw.summary.trim().to_string(),
        attributes,
    })
}

/// Models sometimes wrap JSON in a markdown fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion_body(content: &str) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    fn settings_for(server: &mockito::ServerGuard) -> DescribeSettings {
        DescribeSettings {
            endpoint: format!("{}/v1/chat/completions", server.url()),
            api_key: "test-key".to_string(),
            ..DescribeSettings::default()
        }
    }

    #[test]
    fn test_parse_description() {
        let response = parse_description(
            r#"{"scores": [7, 3, 5, 8, 6, 2, 4, 6], "summary": "A walkable, affordable city."}"#,
        )
        .unwrap();

        assert_eq!(response.scores, vec![7, 3, 5, 8, 6, 2, 4, 6]);
        assert_eq!(response.attributes["safety"], 7);
        assert_eq!(response.attributes["cost"], 8);
        assert_eq!(response.attributes["politics"], 6);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"scores\": [0,0,0,0,0,0,0,0], \"summary\": \"Anywhere.\"}\n```";

        assert!(parse_description(reply).is_ok());
    }

    #[test]
    fn test_insufficient_detail() {
        let json_reply = r#"{"scores": [], "summary": "Insufficient detail"}"#;

        assert!(matches!(
            parse_description(json_reply),
            Err(DescribeError::InsufficientDetail)
        ));
        assert!(matches!(
            parse_description("insufficient detail"),
            Err(DescribeError::InsufficientDetail)
        ));
    }

    #[test]
    fn test_incomplete_scores() {
        let short = r#"{"scores": [1, 2, 3], "summary": "Hmm."}"#;
        let out_of_range = r#"{"scores": [1, 2, 3, 4, 5, 6, 7, 9], "summary": "Hmm."}"#;

        for reply in [short, out_of_range] {
            let err = parse_description(reply).unwrap_err();
            assert!(matches!(err, DescribeError::IncompleteResponse(_)));
            assert_eq!(err.status_code(), 400);
            assert!(err.client_message().contains("rephrase"));
        }
    }

    #[test]
    fn test_cache_key_normalizes() {
        assert_eq!(cache_key("Quiet   TOWN\nnear water"), "quiet town near water");
    }

    #[tokio::test]
    async fn test_describe_calls_model_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(
                r#"{"scores": [6, 5, 4, 3, 8, 7, 4, 5], "summary": "A dense, walkable city."}"#,
            ))
            .expect(1)
            .create_async()
            .await;

        let describer = Describer::new(&settings_for(&server)).unwrap();

        let first = describer.describe("I want to walk everywhere").await.unwrap();
        let second = describer.describe("  i want to walk   everywhere ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.attributes["walkability"], 8);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_describe_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let describer = Describer::new(&settings_for(&server)).unwrap();
        let err = describer.describe("Mountains please").await.unwrap_err();

        assert!(matches!(err, DescribeError::Upstream { status: 500, .. }));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.client_message(), "Upstream model error");
        assert!(!err.client_message().contains("boom"));
    }

    #[tokio::test]
    async fn test_empty_description_skips_model() {
        let server = mockito::Server::new_async().await;
        let describer = Describer::new(&settings_for(&server)).unwrap();

        assert!(matches!(
            describer.describe("   ").await,
            Err(DescribeError::EmptyDescription)
        ));
    }
}
