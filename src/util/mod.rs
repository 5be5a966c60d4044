//! Utility functions shared by the fetcher and the terminal UI.
//!
//! - **URL validation**: feed URLs, the proxy endpoint, and links opened in the browser
//! - **Text processing**: single-line sanitizing and width-aware truncation for table cells

mod text;
mod url_validator;

pub use text::{single_line, truncate_to_width};
pub use url_validator::{
    validate_proxy_base, validate_url, validate_url_for_open, UrlValidationError,
};
