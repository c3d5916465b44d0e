pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::MinddyConfig;
pub use error::MinddyError;
pub use models::{
    FullProfile, IdentityAssertion, InitialQuestion, Persona, PreviewChat, PreviewMessage,
    ProfileDetails, Psychologist, Role, Session, SuggestField,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionError, SessionStore};
