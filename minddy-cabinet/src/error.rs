use minddy_core::{ApiError, SessionError, SuggestField};
use std::fmt;
use thiserror::Error;

/// A user action a panel or the shell can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    SaveProfile,
    SavePersona,
    SaveQuestions,
    Suggest(SuggestField),
    Publish,
    Unpublish,
    LoadChats,
    LoadMessages,
    CreateChat,
    DeleteChat,
    SendMessage,
}

impl Action {
    /// Blocking-alert text shown when the action fails.
    pub fn alert_text(&self) -> &'static str {
        match self {
            Action::Login => "Ошибка авторизации",
            Action::SaveProfile | Action::SavePersona | Action::SaveQuestions => {
                "Ошибка сохранения"
            }
            Action::Suggest(_) => "Ошибка получения подсказки",
            Action::Publish => "Ошибка публикации",
            Action::Unpublish => "Ошибка отмены публикации",
            Action::LoadChats => "Ошибка загрузки чатов",
            Action::LoadMessages => "Ошибка загрузки сообщений",
            Action::CreateChat => "Ошибка создания чата",
            Action::DeleteChat => "Ошибка удаления чата",
            Action::SendMessage => "Ошибка отправки сообщения",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Login => f.write_str("login"),
            Action::SaveProfile => f.write_str("save profile"),
            Action::SavePersona => f.write_str("save persona"),
            Action::SaveQuestions => f.write_str("save questions"),
            Action::Suggest(field) => write!(f, "suggest {}", field),
            Action::Publish => f.write_str("publish"),
            Action::Unpublish => f.write_str("unpublish"),
            Action::LoadChats => f.write_str("load chats"),
            Action::LoadMessages => f.write_str("load messages"),
            Action::CreateChat => f.write_str("create chat"),
            Action::DeleteChat => f.write_str("delete chat"),
            Action::SendMessage => f.write_str("send message"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CabinetError {
    #[error("{action} failed: {source}")]
    Action {
        action: Action,
        #[source]
        source: ApiError,
    },

    #[error("API client error: {0}")]
    Client(#[from] ApiError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    #[error("{0} is already in progress")]
    Busy(Action),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("greeting and system prompt must be filled in before publishing")]
    PublishBlocked,

    #[error("no preview chat selected")]
    NoActiveChat,

    #[error("unknown preview chat: {0}")]
    UnknownChat(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error("login view closed before an identity assertion arrived")]
    LoginAborted,
}

impl CabinetError {
    /// Text for the blocking alert the caller shows. `None` for outcomes the
    /// user does not need to be told about: a duplicate click, an ignored
    /// send, or a background load that is only logged.
    pub fn alert(&self) -> Option<String> {
        match self {
            CabinetError::Busy(_) | CabinetError::EmptyMessage | CabinetError::NoActiveChat => None,
            CabinetError::Action {
                action: Action::LoadChats | Action::LoadMessages,
                ..
            } => None,
            CabinetError::Action { action, source } => {
                Some(format!("{}: {}", action.alert_text(), source.user_message()))
            }
            CabinetError::PublishBlocked => {
                Some("Заполните приветствие и системный промпт перед публикацией".to_string())
            }
            other => Some(other.to_string()),
        }
    }
}
