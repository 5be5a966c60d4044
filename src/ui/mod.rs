//! Terminal User Interface module.
//!
//! Renders the single feed view in one of its three states and offers
//! navigation, link opening and manual retry.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop, terminal management, fetch spawning
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `render` - State dispatch (loading / error / table)
//! - `entries` - Feed entry table widget
//! - `status` - Status bar widget

mod entries;
mod events;
mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
