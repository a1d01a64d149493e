//! The Elm Architecture (TEA) implementation for the board.
//!
//! - `Model`: Pure application state
//! - `Message`: Inputs to the update function
//! - `Command`: Outputs (service requests) from the update function
//! - `update`: Pure function that transforms state

pub mod command;
pub mod message;
pub mod model;
pub mod update;

pub use command::Command;
pub use message::Message;
pub use model::{Cursor, EditDraft, InputKind, Mode, Model, Notification, NotificationLevel};
pub use update::update;
