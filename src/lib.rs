pub mod completion;
pub mod config;
pub mod controller;
pub mod dialect;
pub mod error;
pub mod highlight;
pub mod models;
pub mod prompt;
pub mod render;
pub mod transport;

pub use crate::completion::{CompletionClient, GeminiCompletion};
pub use crate::config::Config;
pub use crate::controller::{Controller, Ticket, UiState};
pub use crate::dialect::{Dialect, DialectSelection};
pub use crate::error::{CompletionError, Result, SqleanError};
pub use crate::render::{MountedRoot, ResultsView, SafeHtml};
