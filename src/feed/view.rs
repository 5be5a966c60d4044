use crate::feed::fetcher::{FeedFetcher, FetchError};
use crate::feed::parser::{parse_feed, FeedResult, ParseError};
use thiserror::Error;

/// The two failure kinds a fetch-and-parse attempt can end in.
///
/// Both are terminal for the attempt; recovery is a manual retry.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// What the feed view is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Error(String),
    Loaded(FeedResult),
}

/// Fetches `feed_url` through the proxy and parses the body.
///
/// Exactly one network request per call.
pub async fn load_feed(fetcher: &FeedFetcher, feed_url: &str) -> Result<FeedResult, FeedError> {
    let text = fetcher.fetch(feed_url).await?;
    let result = parse_feed(&text)?;
    Ok(result)
}

/// Owner of the single [`ViewState`] for one feed.
///
/// Overlapping fetches are not allowed: while a fetch is in flight, further
/// `start`/`retry` requests are ignored. The state value is replaced
/// wholesale on every transition.
#[derive(Debug)]
pub struct FeedView {
    feed_url: String,
    state: ViewState,
    in_flight: bool,
}

impl FeedView {
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            state: ViewState::Loading,
            in_flight: false,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Enters `Loading` and claims the in-flight slot.
    ///
    /// Returns `false`, leaving the state untouched, if a fetch is already
    /// outstanding. Callers that get `true` must report the outcome through
    /// [`FeedView::complete`].
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            tracing::debug!(feed = %self.feed_url, "Fetch already in flight, ignoring request");
            return false;
        }
        self.in_flight = true;
        self.state = ViewState::Loading;
        true
    }

    /// Applies the outcome of the in-flight fetch.
    ///
    /// An outcome arriving with no fetch in flight is dropped.
    pub fn complete(&mut self, outcome: Result<FeedResult, FeedError>) -> &ViewState {
        if !self.in_flight {
            tracing::warn!(feed = %self.feed_url, "Dropping fetch outcome with no fetch in flight");
            return &self.state;
        }
        self.in_flight = false;
        self.apply(outcome)
    }

    fn apply(&mut self, outcome: Result<FeedResult, FeedError>) -> &ViewState {
        self.state = match outcome {
            Ok(result) => {
                tracing::info!(
                    feed = %self.feed_url,
                    title = %result.feed_title,
                    entries = result.total_entries(),
                    "Feed loaded"
                );
                ViewState::Loaded(result)
            }
            Err(e) => {
                tracing::warn!(feed = %self.feed_url, error = %e, "Feed load failed");
                ViewState::Error(e.to_string())
            }
        };
        &self.state
    }

    /// Runs the full fetch sequence: `Loading`, then `Loaded` or `Error`.
    ///
    /// Ignored while a background fetch claimed through [`FeedView::begin`]
    /// is outstanding. Does not claim the in-flight slot itself, so dropping
    /// the future leaves the view retryable.
    pub async fn start(&mut self, fetcher: &FeedFetcher) -> &ViewState {
        if self.in_flight {
            tracing::debug!(feed = %self.feed_url, "Fetch already in flight, ignoring request");
            return &self.state;
        }
        self.state = ViewState::Loading;
        let outcome = load_feed(fetcher, &self.feed_url).await;
        self.apply(outcome)
    }

    /// Same effect as [`FeedView::start`]; meant to be offered from the
    /// `Error` state, harmless from any other.
    pub async fn retry(&mut self, fetcher: &FeedFetcher) -> &ViewState {
        if !matches!(self.state, ViewState::Error(_)) {
            tracing::debug!(feed = %self.feed_url, "Retry requested outside error state");
        }
        self.start(fetcher).await
    }
}
