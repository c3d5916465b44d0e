use std::sync::Mutex;

use minddy_core::{ApiClient, FullProfile};

use super::lock;
use crate::busy::BusyFlag;
use crate::error::{Action, CabinetError};

/// One line of the pre-publish checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub label: &'static str,
    pub satisfied: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishStatus {
    pub published: bool,
    /// Only set while published.
    pub share_url: Option<String>,
}

/// Publishing needs both a greeting and an instruction.
pub fn can_publish(profile: &FullProfile) -> bool {
    !profile.greeting().is_empty() && !profile.system_prompt().is_empty()
}

pub fn requirements(profile: &FullProfile) -> Vec<Requirement> {
    vec![
        Requirement {
            label: "Приветствие заполнено",
            satisfied: !profile.greeting().is_empty(),
            optional: false,
        },
        Requirement {
            label: "Системный промпт настроен",
            satisfied: !profile.system_prompt().is_empty(),
            optional: false,
        },
        Requirement {
            label: "Добавлены первые вопросы",
            satisfied: profile.questions.as_ref().is_some_and(|q| !q.is_empty()),
            optional: true,
        },
        Requirement {
            label: "Заполнен профиль",
            satisfied: profile.display_name().is_some(),
            optional: true,
        },
    ]
}

pub struct PublishPanel {
    api: ApiClient,
    bot_username: String,
    share_url: Mutex<Option<String>>,
    busy: BusyFlag,
}

impl PublishPanel {
    pub fn new(api: ApiClient, bot_username: &str) -> Self {
        Self {
            api,
            bot_username: bot_username.to_string(),
            share_url: Mutex::new(None),
            busy: BusyFlag::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// The URL returned by the last publish, else one built from the
    /// persona's share code.
    pub fn share_url(&self, profile: &FullProfile) -> Option<String> {
        lock(&self.share_url).clone().or_else(|| {
            profile
                .share_code()
                .map(|code| format!("https://t.me/{}?start=psy_{}", self.bot_username, code))
        })
    }

    pub fn status(&self, profile: &FullProfile) -> PublishStatus {
        let published = profile.is_published();
        PublishStatus {
            published,
            share_url: if published {
                self.share_url(profile)
            } else {
                None
            },
        }
    }

    /// Publish the persona and return the re-fetched aggregate. Refused
    /// without a request when [`can_publish`] is false.
    pub async fn publish(&self, current: &FullProfile) -> Result<FullProfile, CabinetError> {
        if !can_publish(current) {
            tracing::warn!("Publish refused: greeting or system prompt missing");
            return Err(CabinetError::PublishBlocked);
        }

        let _busy = self
            .busy
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::Publish))?;

        let published = self
            .api
            .publish()
            .await
            .map_err(log_failure(Action::Publish))?;
        tracing::info!(share_code = %published.share_code, "Persona published");
        *lock(&self.share_url) = Some(published.share_url);

        self.api
            .get_profile()
            .await
            .map_err(log_failure(Action::Publish))
    }

    /// Withdraw the persona and return the re-fetched aggregate.
    pub async fn unpublish(&self) -> Result<FullProfile, CabinetError> {
        let _busy = self
            .busy
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::Unpublish))?;

        self.api
            .unpublish()
            .await
            .map_err(log_failure(Action::Unpublish))?;
        tracing::info!("Persona unpublished");
        *lock(&self.share_url) = None;

        self.api
            .get_profile()
            .await
            .map_err(log_failure(Action::Unpublish))
    }
}

fn log_failure(action: Action) -> impl FnOnce(minddy_core::ApiError) -> CabinetError {
    move |source| {
        tracing::error!(error = %source, action = %action, "Publish action failed");
        CabinetError::Action { action, source }
    }
}
