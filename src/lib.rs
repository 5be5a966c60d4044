//! Terminal RSS headline viewer.
//!
//! Fetches one feed through a CORS-style proxy, projects the XML into a flat
//! list of entries, and shows it as a table with a manual retry action.

pub mod app;
pub mod config;
pub mod feed;
pub mod gemini;
pub mod ui;
pub mod util;
