//! AI coach: builds a context summary for the user and asks an
//! OpenAI-compatible chat-completions endpoint for a reply.
//!
//! The coach is best-effort. Any provider failure is logged and replaced by
//! [`FALLBACK_REPLY`]; it never fails the request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::CoachConfig;
use crate::error::{Error, Result};
use crate::progression::LevelTier;
use crate::types::{CoachMessage, CoachRole, User};

pub const FALLBACK_REPLY: &str = "I can't reach my notes right now, but I'm still in your corner. \
     Take a slow breath, remind yourself why you started, and check in again in a little while.";

const SYSTEM_PROMPT: &str = "You are a warm, practical recovery coach inside a habit-recovery app. \
     Keep replies short, specific and encouraging. Never shame the user for a relapse. \
     If the user describes a crisis or risk of harm, urge them to contact local emergency services.";

/// Number of prior messages sent to the provider as conversation history.
pub const HISTORY_WINDOW: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachReply {
    pub content: String,
    pub is_fallback: bool,
}

impl CoachReply {
    fn fallback() -> Self {
        Self {
            content: FALLBACK_REPLY.to_string(),
            is_fallback: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarises the user's situation for the model.
#[must_use]
pub fn context_summary(user: &User, tier: &LevelTier, streak_days: i32) -> String {
    let mut lines = vec![
        format!("Name: {}", user.display_name),
        format!("Level: {} ({}), {} XP", user.level, tier.name, user.xp),
        format!("Current streak: {streak_days} day(s)"),
        format!("Relapses reported: {}", user.total_relapses),
    ];
    if !user.goals.is_empty() {
        lines.push(format!("Goals: {}", user.goals.join("; ")));
    }
    if !user.triggers.is_empty() {
        lines.push(format!("Known triggers: {}", user.triggers.join("; ")));
    }
    lines.join("\n")
}

/// Builds the provider message list: system prompt with context, prior
/// history, then the new user message.
#[must_use]
pub fn build_messages(summary: &str, history: &[CoachMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: format!("{SYSTEM_PROMPT}\n\nAbout the user:\n{summary}"),
    });
    messages.extend(history.iter().map(|m| ChatMessage {
        role: match m.role {
            CoachRole::User => "user",
            CoachRole::Coach => "assistant",
        }
        .to_string(),
        content: m.content.clone(),
    }));
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: message.to_string(),
    });
    messages
}

pub struct CoachClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
}

impl CoachClient {
    pub fn new(config: &CoachConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build coach client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// A client with no provider; every reply is the fallback.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: None,
            model: None,
            api_key: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Asks the provider for a reply. Any failure, including a missing
    /// endpoint, is logged at `warn` and answered with the fallback text.
    pub async fn reply(&self, messages: Vec<ChatMessage>) -> CoachReply {
        match self.complete(messages).await {
            Ok(content) => CoachReply {
                content,
                is_fallback: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Coach provider failed, using fallback reply");
                CoachReply::fallback()
            }
        }
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Dependency("coach endpoint not configured".to_string()))?;

        let mut request = self.http.post(endpoint).json(&ChatRequest {
            model: self.model.as_deref(),
            messages,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("coach request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Dependency(format!("coach provider returned {status}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Dependency(format!("invalid coach response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Dependency("coach provider returned no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use super::*;
    use crate::progression::LevelTable;

    fn user() -> User {
        let mut user = User::new("user-1".to_string(), "Sam".to_string(), Utc::now());
        user.xp = 75;
        user.level = 2;
        user.total_relapses = 1;
        user.goals = vec!["sleep before midnight".to_string(), "run twice a week".to_string()];
        user
    }

    #[test]
    fn test_context_summary() {
        let user = user();
        let tier = LevelTable::builtin().resolve_tier(user.level);
        let summary = context_summary(&user, tier, 4);

        assert!(summary.contains("Name: Sam"));
        assert!(summary.contains("Level: 2 (Sprout), 75 XP"));
        assert!(summary.contains("Current streak: 4 day(s)"));
        assert!(summary.contains("Goals: sleep before midnight; run twice a week"));
        assert!(!summary.contains("Known triggers"));
    }

    #[test]
    fn test_build_messages_maps_roles() {
        let history = vec![
            CoachMessage {
                id: "1".to_string(),
                user_id: "user-1".to_string(),
                role: CoachRole::User,
                content: "hi".to_string(),
                is_fallback: false,
                created_at: Utc::now(),
            },
            CoachMessage {
                id: "2".to_string(),
                user_id: "user-1".to_string(),
                role: CoachRole::Coach,
                content: "hello".to_string(),
                is_fallback: false,
                created_at: Utc::now(),
            },
        ];

        let messages = build_messages("Name: Sam", &history, "rough day");
        let roles: Vec<_> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert!(messages[0].content.ends_with("Name: Sam"));
        assert_eq!(messages[3].content, "rough day");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_disabled_client_falls_back() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let reply = CoachClient::disabled().reply(Vec::new()).await;
        assert!(reply.is_fallback);
        assert_eq!(reply.content, FALLBACK_REPLY);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "no warning logged: {output}");
        assert!(output.contains("coach endpoint not configured"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_falls_back() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = CoachClient::new(&CoachConfig {
            endpoint: Some(format!("http://127.0.0.1:{port}/v1/chat/completions")),
            timeout_secs: 2,
            ..CoachConfig::default()
        })
        .unwrap();

        let reply = client
            .reply(build_messages("Name: Sam", &[], "hello"))
            .await;
        assert!(reply.is_fallback);
    }
}
