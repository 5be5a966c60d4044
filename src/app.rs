use crate::feed::{FeedEntry, FeedError, FeedFetcher, FeedResult, FeedView, ViewState};
use anyhow::Result;
use reqwest::redirect::Policy;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status message stays in the status bar.
const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Create a custom redirect policy with loop detection and limited hops.
///
/// - Limits redirects to 3 hops maximum
/// - Detects redirect loops (same URL appearing twice in chain)
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Build the shared HTTP client.
///
/// No request timeout is configured: a fetch either completes or the user
/// quits.
pub fn create_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("headlines/", env!("CARGO_PKG_VERSION")))
        .redirect(create_redirect_policy())
        .build()?;
    Ok(client)
}

// ============================================================================
// Events
// ============================================================================

/// Completion events sent from background tasks to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// The in-flight fetch-and-parse finished.
    FeedLoaded(Result<FeedResult, FeedError>),
}

// ============================================================================
// Application State
// ============================================================================

/// TUI state: the feed view plus table selection and status bar.
pub struct App {
    pub feed: FeedView,
    pub fetcher: FeedFetcher,
    pub selected: usize,
    pub status_message: Option<(String, Instant)>,
    pub spinner_frame: usize,
    /// Only redraw when something changed
    pub needs_redraw: bool,
}

impl App {
    pub fn new(fetcher: FeedFetcher, feed_url: impl Into<String>) -> Self {
        Self {
            feed: FeedView::new(feed_url),
            fetcher,
            selected: 0,
            status_message: None,
            spinner_frame: 0,
            needs_redraw: true,
        }
    }

    /// Entries of the loaded feed, empty in the other states.
    pub fn entries(&self) -> &[FeedEntry] {
        match self.feed.state() {
            ViewState::Loaded(result) => &result.entries,
            _ => &[],
        }
    }

    pub fn selected_entry(&self) -> Option<&FeedEntry> {
        self.entries().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.entries().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.entries().len().saturating_sub(1);
    }

    /// Apply a finished fetch to the view and reset the selection.
    pub fn apply_feed_loaded(&mut self, outcome: Result<FeedResult, FeedError>) {
        self.feed.complete(outcome);
        self.selected = 0;
        self.needs_redraw = true;
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clears the status message once it has expired. Returns true if cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        match &self.status_message {
            Some((_, set_at)) if set_at.elapsed() >= STATUS_TTL => {
                self.status_message = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{parse_feed, FetchError};

    fn test_app() -> App {
        let fetcher =
            FeedFetcher::new(reqwest::Client::new(), "https://proxy.example.com/raw").unwrap();
        App::new(fetcher, "https://example.com/rss")
    }

    fn three_items() -> FeedResult {
        parse_feed(
            "<rss><channel><title>T</title>\
             <item><title>A</title></item><item><title>B</title></item><item><title>C</title></item>\
             </channel></rss>",
        )
        .unwrap()
    }

    #[test]
    fn test_no_entries_while_loading() {
        let app = test_app();
        assert!(app.entries().is_empty());
        assert!(app.selected_entry().is_none());
    }

    #[test]
    fn test_selection_clamped_to_entries() {
        let mut app = test_app();
        app.feed.begin();
        app.apply_feed_loaded(Ok(three_items()));

        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 2);
        assert_eq!(app.selected_entry().map(|e| e.title.as_str()), Some("C"));

        app.select_first();
        app.select_prev();
        assert_eq!(app.selected, 0);

        app.select_last();
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn test_reload_resets_selection() {
        let mut app = test_app();
        app.feed.begin();
        app.apply_feed_loaded(Ok(three_items()));
        app.select_last();

        app.feed.begin();
        app.apply_feed_loaded(Err(FetchError::HttpStatus(502).into()));
        assert_eq!(app.selected, 0);
        assert!(matches!(app.feed.state(), ViewState::Error(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_expires() {
        let mut app = test_app();
        app.set_status("Opened link");
        assert!(!app.clear_expired_status());

        tokio::time::advance(STATUS_TTL).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }
}
