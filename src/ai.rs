//! Civic assistant backed by a generative-AI endpoint.
//!
//! Every failure path degrades to a canned reply, so callers always get text
//! back and can tell from [`ReplySource`] whether it came from the model.

use crate::app_config::AiConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prepended to every prompt sent to the model.
const SYSTEM_PREAMBLE: &str = "You are CivicOS, a non-partisan assistant for Canadian civic \
questions. Answer concisely, cite the level of government involved, and never tell the user \
how to vote.";

#[derive(Debug)]
pub enum AiError {
    /// No API key configured
    Disabled,
    Transport(String),
    Status(u16),
    /// 2xx response without usable text
    EmptyReply,
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::Disabled => write!(f, "AI service is not configured"),
            AiError::Transport(msg) => write!(f, "AI request failed: {}", msg),
            AiError::Status(code) => write!(f, "AI service returned HTTP {}", code),
            AiError::EmptyReply => write!(f, "AI service returned no candidates"),
        }
    }
}

impl std::error::Error for AiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiReply {
    pub reply: String,
    pub source: ReplySource,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
    }
}

/// Keyword-matched replies used when the model is unavailable.
pub fn canned_reply(prompt: &str) -> String {
    let prompt = prompt.to_lowercase();

    let reply = if prompt.contains("vote") || prompt.contains("election") {
        "Elections Canada (elections.ca) lists federal voting dates, registration and \
         polling locations. Provincial and municipal elections are run by their own agencies; \
         see the Elections section for upcoming dates in your area."
    } else if prompt.contains("law") || prompt.contains("criminal") || prompt.contains("charter") {
        "Federal statutes, including the Criminal Code and the Charter, are published on the \
         Justice Laws website. The Legal section summarizes common provisions. For advice about \
         your situation, consult a lawyer or a legal aid clinic."
    } else if prompt.contains(" mp") || prompt.contains("politician") || prompt.contains("representative") {
        "Use the Politicians directory to find representatives by riding, party or level of \
         government. Each profile shows their trust score, statements and expense disclosures."
    } else {
        "The civic assistant is temporarily unavailable. You can still browse politicians, \
         elections and legal information from the main menu."
    };

    reply.to_string()
}

pub struct AiClient {
    client: reqwest::Client,
    config: AiConfig,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        if !self.is_enabled() {
            return Err(AiError::Disabled);
        }

        let text = format!("{}\n\n{}", SYSTEM_PREAMBLE, prompt);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &text }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AiError::Transport(e.without_url().to_string()))?
            .first_text()
            .ok_or(AiError::EmptyReply)
    }

    /// Ask the model, falling back to a canned reply on any failure.
    pub async fn ask(&self, prompt: &str) -> AiReply {
        match self.generate(prompt).await {
            Ok(reply) => AiReply {
                reply,
                source: ReplySource::Live,
            },
            Err(e) => {
                match e {
                    AiError::Disabled => log::debug!("{}", e),
                    _ => log::warn!("{}", e),
                }
                AiReply {
                    reply: canned_reply(prompt),
                    source: ReplySource::Fallback,
                }
            }
        }
    }
}
