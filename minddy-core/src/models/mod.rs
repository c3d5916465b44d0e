pub mod auth;
pub mod persona;
pub mod preview;
pub mod profile;

pub use auth::{AuthResponse, IdentityAssertion, Session};
pub use persona::{InitialQuestion, Persona, PersonaUpdate, PublishResult, SuggestField};
pub use preview::{PreviewChat, PreviewMessage, PreviewReply, Role};
pub use profile::{FullProfile, ProfileDetails, ProfileUpdate, Psychologist};
