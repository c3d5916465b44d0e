//! Preview chats: try the persona before publishing it
//!
//! Messages are shown optimistically. A sent message appears at once as
//! [`ChatEntry::Pending`]; when the backend answers it is promoted to
//! [`ChatEntry::Confirmed`] and the reply is appended after it. Entries are
//! only ever appended or promoted, never replaced with different content.

use std::sync::Mutex;

use chrono::{DateTime, Local, Utc};
use minddy_core::{ApiClient, PreviewChat, PreviewMessage, Role};
use uuid::Uuid;

use super::lock;
use crate::busy::BusyFlag;
use crate::error::{Action, CabinetError};

/// A message that exists only on this side so far.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMessage {
    pub local_id: Uuid,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl LocalMessage {
    fn user(chat_id: &str, content: &str) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            chat_id: chat_id.to_string(),
            role: Role::User,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    fn confirm(self) -> PreviewMessage {
        PreviewMessage {
            id: format!("local-{}", self.local_id),
            chat_id: self.chat_id,
            role: self.role,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    Pending(LocalMessage),
    Confirmed(PreviewMessage),
}

impl ChatEntry {
    pub fn role(&self) -> Role {
        match self {
            ChatEntry::Pending(m) => m.role,
            ChatEntry::Confirmed(m) => m.role,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatEntry::Pending(m) => &m.content,
            ChatEntry::Confirmed(m) => &m.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ChatEntry::Pending(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewState {
    /// Newest first.
    pub chats: Vec<PreviewChat>,
    pub active: Option<PreviewChat>,
    pub entries: Vec<ChatEntry>,
    /// Bumped on every selection; a history load only lands if it still matches.
    selection: u64,
}

impl PreviewState {
    fn is_active(&self, chat_id: &str) -> bool {
        self.active.as_ref().is_some_and(|c| c.id == chat_id)
    }
}

/// Title given to chats created without one, e.g. `Тест 19.10.2026, 14:03:12`.
pub fn default_chat_title(now: DateTime<Local>) -> String {
    format!("Тест {}", now.format("%d.%m.%Y, %H:%M:%S"))
}

pub struct ChatPreview {
    api: ApiClient,
    state: Mutex<PreviewState>,
    loading: BusyFlag,
    sending: BusyFlag,
}

impl ChatPreview {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(PreviewState::default()),
            loading: BusyFlag::new(),
            sending: BusyFlag::new(),
        }
    }

    pub fn state(&self) -> PreviewState {
        lock(&self.state).clone()
    }

    pub fn chats(&self) -> Vec<PreviewChat> {
        lock(&self.state).chats.clone()
    }

    pub fn active_chat(&self) -> Option<PreviewChat> {
        lock(&self.state).active.clone()
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        lock(&self.state).entries.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_busy()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_busy()
    }

    /// Refresh the chat list. Failures are logged and leave the list as is;
    /// they are not meant for a blocking alert.
    pub async fn load_chats(&self) -> Result<(), CabinetError> {
        let _loading = self
            .loading
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::LoadChats))?;

        match self.api.list_preview_chats().await {
            Ok(chats) => {
                tracing::debug!(count = chats.len(), "Preview chats loaded");
                lock(&self.state).chats = chats;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load preview chats");
                Err(CabinetError::Action {
                    action: Action::LoadChats,
                    source: e,
                })
            }
        }
    }

    /// Make `chat_id` the active chat and load its messages. A load failure is
    /// logged and leaves the message list empty.
    ///
    /// Messages sent while the history is loading stay after it.
    pub async fn select_chat(&self, chat_id: &str) -> Result<(), CabinetError> {
        let selection = {
            let mut state = lock(&self.state);
            let chat = state
                .chats
                .iter()
                .find(|c| c.id == chat_id)
                .cloned()
                .ok_or_else(|| CabinetError::UnknownChat(chat_id.to_string()))?;
            state.active = Some(chat);
            state.entries.clear();
            state.selection += 1;
            state.selection
        };

        let messages = self.api.list_preview_messages(chat_id).await.map_err(|e| {
            tracing::error!(error = %e, chat_id, "Failed to load preview messages");
            CabinetError::Action {
                action: Action::LoadMessages,
                source: e,
            }
        })?;

        let mut state = lock(&self.state);
        // The user may have moved to another chat while this was loading.
        if state.selection == selection && state.is_active(chat_id) {
            let sent_meanwhile = std::mem::take(&mut state.entries);
            state.entries = messages.into_iter().map(ChatEntry::Confirmed).collect();
            state.entries.extend(sent_meanwhile);
        }
        Ok(())
    }

    /// Create a chat, put it at the top of the list and select it.
    pub async fn create_chat(&self, title: Option<&str>) -> Result<PreviewChat, CabinetError> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_chat_title(Local::now()));

        let chat = self
            .api
            .create_preview_chat(Some(&title))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create preview chat");
                CabinetError::Action {
                    action: Action::CreateChat,
                    source: e,
                }
            })?;

        tracing::info!(chat_id = %chat.id, "Preview chat created");
        let mut state = lock(&self.state);
        state.chats.insert(0, chat.clone());
        state.active = Some(chat.clone());
        state.entries.clear();
        state.selection += 1;
        Ok(chat)
    }

    /// Delete a chat. Deleting the active chat also clears its messages.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<(), CabinetError> {
        self.api.delete_preview_chat(chat_id).await.map_err(|e| {
            tracing::error!(error = %e, chat_id, "Failed to delete preview chat");
            CabinetError::Action {
                action: Action::DeleteChat,
                source: e,
            }
        })?;

        tracing::info!(chat_id, "Preview chat deleted");
        let mut state = lock(&self.state);
        state.chats.retain(|c| c.id != chat_id);
        if state.is_active(chat_id) {
            state.active = None;
            state.entries.clear();
            state.selection += 1;
        }
        Ok(())
    }

    /// Send `text` to the active chat and return the assistant's reply.
    ///
    /// The user message is appended before the request goes out and stays
    /// whatever happens. On failure no reply is appended.
    pub async fn send(&self, text: &str) -> Result<String, CabinetError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CabinetError::EmptyMessage);
        }

        let _sending = self
            .sending
            .try_acquire()
            .ok_or(CabinetError::Busy(Action::SendMessage))?;

        let (chat_id, local_id, selection) = {
            let mut state = lock(&self.state);
            let chat_id = state
                .active
                .as_ref()
                .map(|c| c.id.clone())
                .ok_or(CabinetError::NoActiveChat)?;
            let message = LocalMessage::user(&chat_id, text);
            let local_id = message.local_id;
            state.entries.push(ChatEntry::Pending(message));
            (chat_id, local_id, state.selection)
        };

        let reply = match self.api.send_preview_message(&chat_id, text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, chat_id = %chat_id, "Failed to send preview message");
                return Err(CabinetError::Action {
                    action: Action::SendMessage,
                    source: e,
                });
            }
        };

        let mut state = lock(&self.state);
        if state.selection != selection {
            tracing::debug!(chat_id = %chat_id, "Reply arrived for a chat no longer shown");
            return Ok(reply);
        }

        let promoted = state.entries.iter_mut().find(
            |entry| matches!(entry, ChatEntry::Pending(m) if m.local_id == local_id),
        );
        if let Some(entry) = promoted {
            if let ChatEntry::Pending(message) = entry.clone() {
                *entry = ChatEntry::Confirmed(message.confirm());
            }
        }

        state.entries.push(ChatEntry::Confirmed(PreviewMessage {
            id: format!("local-{}-assistant", Uuid::new_v4()),
            chat_id,
            role: Role::Assistant,
            content: reply.clone(),
            created_at: Utc::now(),
        }));
        Ok(reply)
    }
}
