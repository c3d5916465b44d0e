use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The AI twin: what an end user's chat is scripted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub psychologist_id: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub share_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialQuestion {
    pub id: String,
    pub ai_twin_id: String,
    pub question: String,
    pub order_index: i32,
}

/// Body of `PUT /api/ai-twin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonaUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Response of `POST /api/ai-twin/publish`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishResult {
    pub share_code: String,
    pub share_url: String,
}

/// Persona field the backend can draft a suggestion for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestField {
    Greeting,
    SystemPrompt,
    Questions,
}

impl SuggestField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestField::Greeting => "greeting",
            SuggestField::SystemPrompt => "system_prompt",
            SuggestField::Questions => "questions",
        }
    }
}

impl fmt::Display for SuggestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greeting" => Ok(SuggestField::Greeting),
            "system_prompt" | "system-prompt" | "instruction" => Ok(SuggestField::SystemPrompt),
            "questions" => Ok(SuggestField::Questions),
            other => Err(format!("unknown persona field: {}", other)),
        }
    }
}
