// SPDX-License-Identifier: MPL-2.0

//! Offline-first data core for a flashcard study app.
//!
//! [`app::FlashApp`] wires everything together. Underneath it:
//!
//! - [`store`] keeps decks, cards, folders, tags, sessions and themes in a
//!   local SQLite database.
//! - [`api::DataClient`] serves the same operations from a remote API when
//!   one is reachable and from the local store otherwise.
//! - [`streak`] derives the daily study streak from timestamps.
//! - [`customize`] gates cosmetic items behind streak milestones.

pub mod api;
pub mod app;
pub mod config;
pub mod customize;
pub mod model;
pub mod review;
pub mod runtime;
pub mod store;
pub mod streak;
pub mod telemetry;
pub mod validate;

pub use api::{DataClient, DataError};
pub use app::{AppError, FlashApp};
pub use config::AppConfig;
