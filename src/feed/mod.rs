//! Feed acquisition: proxy fetch, XML projection, and the view state machine.
//!
//! - [`fetcher`] - single-attempt HTTP GET through a CORS-style proxy
//! - [`parser`] - lenient XML projection into [`FeedResult`]
//! - [`view`] - `Loading` / `Error` / `Loaded` state owned by [`FeedView`]
//!
//! # Example
//!
//! ```ignore
//! use headlines::feed::{FeedFetcher, FeedView};
//!
//! let fetcher = FeedFetcher::new(reqwest::Client::new(), "https://api.allorigins.win/raw")?;
//! let mut view = FeedView::new("https://example.com/rss");
//! view.start(&fetcher).await;
//! ```

mod fetcher;
mod parser;
mod view;

pub use fetcher::{FeedFetcher, FetchError};
pub use parser::{
    parse_feed, FeedEntry, FeedResult, ParseError, NO_DATE, NO_DESCRIPTION, NO_TITLE,
    UNKNOWN_FEED_TITLE,
};
pub use view::{load_feed, FeedError, FeedView, ViewState};
