use minddy_core::models::ProfileUpdate;
use minddy_core::{ApiClient, FullProfile};

use super::non_empty;
use crate::busy::BusyFlag;
use crate::error::{Action, CabinetError};

/// Editable copy of the profile details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub display_name: String,
    pub bio: String,
    pub education: String,
    pub specializations: String,
    pub experience: String,
}

impl ProfileDraft {
    pub fn from_profile(profile: &FullProfile) -> Self {
        let Some(details) = &profile.profile else {
            return Self::default();
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            display_name: text(&details.display_name),
            bio: text(&details.bio),
            education: text(&details.education),
            specializations: text(&details.specializations),
            experience: text(&details.experience),
        }
    }

    /// Empty fields are omitted from the request.
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            display_name: non_empty(&self.display_name),
            bio: non_empty(&self.bio),
            education: non_empty(&self.education),
            specializations: non_empty(&self.specializations),
            experience: non_empty(&self.experience),
        }
    }
}

pub struct ProfileEditor {
    api: ApiClient,
    draft: ProfileDraft,
    saving: BusyFlag,
}

impl ProfileEditor {
    pub fn new(api: ApiClient, profile: &FullProfile) -> Self {
        Self {
            api,
            draft: ProfileDraft::from_profile(profile),
            saving: BusyFlag::new(),
        }
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ProfileDraft {
        &mut self.draft
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_busy()
    }

    /// Send the profile details and return `current` with only the `profile`
    /// slice replaced.
    pub async fn save(&self, current: &FullProfile) -> Result<FullProfile, CabinetError> {
        let _saving = self
            .saving
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::SaveProfile))?;

        match self.api.update_profile(&self.draft.to_update()).await {
            Ok(details) => {
                tracing::info!(profile_id = %details.id, "Profile saved");
                Ok(current.with_profile(details))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save profile");
                Err(CabinetError::Action {
                    action: Action::SaveProfile,
                    source: e,
                })
            }
        }
    }
}
