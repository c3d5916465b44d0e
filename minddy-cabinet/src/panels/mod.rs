//! Panel controllers, one per cabinet tab
//!
//! Each panel edits a draft of one slice of the profile aggregate and, on
//! save, returns a new aggregate with only that slice replaced by the
//! backend's answer. Every action is gated by its own [`BusyFlag`], so a
//! duplicate submission while one is in flight is rejected without a request.
//!
//! [`BusyFlag`]: crate::busy::BusyFlag

pub mod persona;
pub mod preview;
pub mod profile;
pub mod publish;

pub use persona::{PersonaDraft, PersonaEditor};
pub use preview::{ChatEntry, ChatPreview, LocalMessage, PreviewState};
pub use profile::{ProfileDraft, ProfileEditor};
pub use publish::{PublishPanel, PublishStatus, Requirement};

use std::sync::{Mutex, MutexGuard, PoisonError};

// Draft locks are never held across an await, so a poisoned lock still holds
// a consistent value.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
