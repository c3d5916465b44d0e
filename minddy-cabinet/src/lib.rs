pub mod app;
pub mod auth;
pub mod busy;
pub mod error;
pub mod panels;

pub use app::{Cabinet, Tab, View};
pub use auth::{AssertionSender, AuthState, LoginView};
pub use error::{Action, CabinetError};
