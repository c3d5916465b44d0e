use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::persona::{InitialQuestion, Persona};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Psychologist {
    pub id: String,
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub id: String,
    pub psychologist_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub specializations: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
}

/// Body of `PUT /api/profile`. Absent fields are left to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specializations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
}

/// Aggregate read model returned by `GET /api/profile`.
///
/// Every slice may be `null` on the wire, e.g. right after the first login
/// before a profile or persona exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullProfile {
    #[serde(default)]
    pub psychologist: Option<Psychologist>,
    #[serde(default)]
    pub profile: Option<ProfileDetails>,
    #[serde(default, rename = "ai_twin")]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub questions: Option<Vec<InitialQuestion>>,
}

impl FullProfile {
    pub fn greeting(&self) -> &str {
        self.persona.as_ref().map(|p| p.greeting.as_str()).unwrap_or("")
    }

    pub fn system_prompt(&self) -> &str {
        self.persona
            .as_ref()
            .map(|p| p.system_prompt.as_str())
            .unwrap_or("")
    }

    pub fn is_published(&self) -> bool {
        self.persona.as_ref().is_some_and(|p| p.is_published)
    }

    pub fn share_code(&self) -> Option<&str> {
        self.persona.as_ref().and_then(|p| p.share_code.as_deref())
    }

    /// Question texts sorted by `order_index`.
    pub fn question_texts(&self) -> Vec<String> {
        let mut questions: Vec<&InitialQuestion> =
            self.questions.iter().flatten().collect();
        questions.sort_by_key(|q| q.order_index);
        questions.into_iter().map(|q| q.question.clone()).collect()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    // Slice replacements return a new aggregate; the caller swaps it in whole.

    pub fn with_profile(&self, profile: ProfileDetails) -> Self {
        Self {
            profile: Some(profile),
            ..self.clone()
        }
    }

    pub fn with_persona(&self, persona: Persona) -> Self {
        Self {
            persona: Some(persona),
            ..self.clone()
        }
    }

    pub fn with_questions(&self, questions: Vec<InitialQuestion>) -> Self {
        Self {
            questions: Some(questions),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_slices_deserialize_to_none() {
        let json = serde_json::json!({
            "psychologist": null,
            "profile": null,
            "ai_twin": null,
            "questions": null
        });
        let profile: FullProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile, FullProfile::default());
        assert_eq!(profile.greeting(), "");
        assert!(!profile.is_published());
        assert!(profile.question_texts().is_empty());
    }

    #[test]
    fn test_question_texts_follow_order_index() {
        let json = serde_json::json!({
            "questions": [
                { "id": "q2", "ai_twin_id": "t", "question": "second", "order_index": 1 },
                { "id": "q1", "ai_twin_id": "t", "question": "first", "order_index": 0 }
            ]
        });
        let profile: FullProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.question_texts(), vec!["first", "second"]);
    }

    #[test]
    fn test_with_profile_keeps_sibling_slices() {
        let base: FullProfile = serde_json::from_value(serde_json::json!({
            "ai_twin": {
                "id": "t", "psychologist_id": "p", "greeting": "hi",
                "system_prompt": "be kind", "is_published": false
            },
            "questions": [
                { "id": "q1", "ai_twin_id": "t", "question": "How are you?", "order_index": 0 }
            ]
        }))
        .unwrap();

        let updated = base.with_profile(ProfileDetails {
            id: "pr".to_string(),
            psychologist_id: "p".to_string(),
            display_name: Some("Anna".to_string()),
            bio: None,
            education: None,
            specializations: None,
            experience: None,
        });

        assert_eq!(updated.persona, base.persona);
        assert_eq!(updated.questions, base.questions);
        assert_eq!(updated.display_name(), Some("Anna"));
    }
}
