use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Claude,
    OpenAI,
    Gemini,
}

impl LLMProvider {
    /// Probe order at manager construction; also the fallback iteration order.
    pub const ALL: [LLMProvider; 3] = [LLMProvider::Claude, LLMProvider::OpenAI, LLMProvider::Gemini];

    /// Returns the unique identifier used in configuration, logging and telemetry.
    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::Claude => "claude",
            LLMProvider::OpenAI => "openai",
            LLMProvider::Gemini => "gemini",
        }
    }

    /// Helper to parse from a string (handles aliases)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "claude" | "anthropic" => Some(LLMProvider::Claude),
            "openai" => Some(LLMProvider::OpenAI),
            "gemini" | "google" => Some(LLMProvider::Gemini),
            _ => None,
        }
    }

    /// Environment variable holding the credential when no override is configured.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LLMProvider::Claude => "ANTHROPIC_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
            LLMProvider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::Claude => "claude-sonnet-4-20250514",
            LLMProvider::OpenAI => "gpt-4o-mini",
            LLMProvider::Gemini => "gemini-2.0-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::Claude => "https://api.anthropic.com",
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

// Ensure Display trait matches provider_name for convenience
impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider_name())
    }
}
