use std::sync::Mutex;

use minddy_core::models::PersonaUpdate;
use minddy_core::{ApiClient, FullProfile, SuggestField};

use super::{lock, non_empty};
use crate::busy::BusyFlag;
use crate::error::{Action, CabinetError};

/// Editable copy of the persona: greeting, instruction and question list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDraft {
    pub greeting: String,
    pub system_prompt: String,
    /// Never empty; a cleared list holds one blank entry to type into.
    pub questions: Vec<String>,
}

impl Default for PersonaDraft {
    fn default() -> Self {
        Self {
            greeting: String::new(),
            system_prompt: String::new(),
            questions: vec![String::new()],
        }
    }
}

impl PersonaDraft {
    pub fn from_profile(profile: &FullProfile) -> Self {
        let questions = profile.question_texts();
        Self {
            greeting: profile.greeting().to_string(),
            system_prompt: profile.system_prompt().to_string(),
            questions: if questions.is_empty() {
                vec![String::new()]
            } else {
                questions
            },
        }
    }

    /// Question list as it would be saved: blanks dropped, order kept.
    pub fn filled_questions(&self) -> Vec<String> {
        self.questions
            .iter()
            .filter(|q| !q.trim().is_empty())
            .cloned()
            .collect()
    }

    fn persona_changed(&self, current: &FullProfile) -> bool {
        self.greeting != current.greeting() || self.system_prompt != current.system_prompt()
    }

    fn questions_changed(&self, current: &FullProfile) -> bool {
        self.filled_questions() != current.question_texts()
    }
}

/// Split a generated question block into one question per non-blank line.
fn parse_question_suggestion(suggestion: &str) -> Vec<String> {
    let questions: Vec<String> = suggestion
        .lines()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        vec![String::new()]
    } else {
        questions
    }
}

#[derive(Debug, Default)]
struct SuggestFlags {
    greeting: BusyFlag,
    system_prompt: BusyFlag,
    questions: BusyFlag,
}

impl SuggestFlags {
    fn get(&self, field: SuggestField) -> &BusyFlag {
        match field {
            SuggestField::Greeting => &self.greeting,
            SuggestField::SystemPrompt => &self.system_prompt,
            SuggestField::Questions => &self.questions,
        }
    }
}

pub struct PersonaEditor {
    api: ApiClient,
    draft: Mutex<PersonaDraft>,
    saving: BusyFlag,
    suggesting: SuggestFlags,
}

impl PersonaEditor {
    pub fn new(api: ApiClient, profile: &FullProfile) -> Self {
        Self {
            api,
            draft: Mutex::new(PersonaDraft::from_profile(profile)),
            saving: BusyFlag::new(),
            suggesting: SuggestFlags::default(),
        }
    }

    pub fn draft(&self) -> PersonaDraft {
        lock(&self.draft).clone()
    }

    pub fn set_greeting(&self, greeting: impl Into<String>) {
        lock(&self.draft).greeting = greeting.into();
    }

    pub fn set_system_prompt(&self, system_prompt: impl Into<String>) {
        lock(&self.draft).system_prompt = system_prompt.into();
    }

    pub fn set_questions(&self, questions: Vec<String>) {
        lock(&self.draft).questions = if questions.is_empty() {
            vec![String::new()]
        } else {
            questions
        };
    }

    pub fn add_question(&self) {
        lock(&self.draft).questions.push(String::new());
    }

    /// Returns false when `index` is out of range.
    pub fn update_question(&self, index: usize, value: impl Into<String>) -> bool {
        match lock(&self.draft).questions.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Returns false when `index` is out of range.
    pub fn remove_question(&self, index: usize) -> bool {
        let mut draft = lock(&self.draft);
        if index >= draft.questions.len() {
            return false;
        }
        draft.questions.remove(index);
        if draft.questions.is_empty() {
            draft.questions.push(String::new());
        }
        true
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_busy()
    }

    pub fn is_suggesting(&self, field: SuggestField) -> bool {
        self.suggesting.get(field).is_busy()
    }

    /// Save whatever differs from `current`: persona fields, the question
    /// list, both, or neither. Each backend answer replaces only its own slice.
    pub async fn save(&self, current: &FullProfile) -> Result<FullProfile, CabinetError> {
        let _saving = self
            .saving
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::SavePersona))?;

        let draft = self.draft();
        let mut updated = current.clone();

        if draft.persona_changed(current) {
            let update = PersonaUpdate {
                greeting: non_empty(&draft.greeting),
                system_prompt: non_empty(&draft.system_prompt),
            };
            let persona = self.api.update_persona(&update).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to save persona");
                CabinetError::Action {
                    action: Action::SavePersona,
                    source: e,
                }
            })?;
            updated = updated.with_persona(persona);
        }

        if draft.questions_changed(current) {
            let questions = self
                .api
                .update_questions(&draft.filled_questions())
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to save questions");
                    CabinetError::Action {
                        action: Action::SaveQuestions,
                        source: e,
                    }
                })?;
            updated = updated.with_questions(questions);
        }

        tracing::info!("Persona settings saved");
        Ok(updated)
    }

    /// Ask the backend to draft `field` and replace the draft value with it.
    pub async fn suggest(&self, field: SuggestField) -> Result<(), CabinetError> {
        let _suggesting = self
            .suggesting
            .get(field)
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::Suggest(field)))?;

        let suggestion = self.api.suggest(field, None).await.map_err(|e| {
            tracing::error!(error = %e, field = %field, "Failed to get suggestion");
            CabinetError::Action {
                action: Action::Suggest(field),
                source: e,
            }
        })?;

        let mut draft = lock(&self.draft);
        match field {
            SuggestField::Greeting => draft.greeting = suggestion,
            SuggestField::SystemPrompt => draft.system_prompt = suggestion,
            SuggestField::Questions => draft.questions = parse_question_suggestion(&suggestion),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> PersonaEditor {
        let api = ApiClient::new("http://localhost:8081").unwrap();
        PersonaEditor::new(api, &FullProfile::default())
    }

    #[test]
    fn test_question_suggestion_splits_lines_and_drops_blanks() {
        let parsed = parse_question_suggestion("What worries you?\n\n  How do you sleep?  \n");
        assert_eq!(parsed, vec!["What worries you?", "How do you sleep?"]);
        assert_eq!(parse_question_suggestion("\n \n"), vec![String::new()]);
    }

    #[test]
    fn test_removing_last_question_leaves_blank_entry() {
        let editor = editor();
        assert_eq!(editor.draft().questions, vec![String::new()]);

        assert!(editor.update_question(0, "Only question"));
        assert!(editor.remove_question(0));
        assert_eq!(editor.draft().questions, vec![String::new()]);
        assert!(!editor.remove_question(5));
    }

    #[test]
    fn test_filled_questions_keep_order() {
        let editor = editor();
        editor.set_questions(vec![
            "First".to_string(),
            "   ".to_string(),
            "Second".to_string(),
        ]);
        editor.add_question();
        assert_eq!(editor.draft().questions.len(), 4);
        assert_eq!(editor.draft().filled_questions(), vec!["First", "Second"]);
    }

    #[test]
    fn test_unchanged_draft_reports_nothing_to_save() {
        let draft = PersonaDraft::from_profile(&FullProfile::default());
        assert!(!draft.persona_changed(&FullProfile::default()));
        assert!(!draft.questions_changed(&FullProfile::default()));
    }
}
