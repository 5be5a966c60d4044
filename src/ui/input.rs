//! Input handling for the TUI.

use crate::app::{App, AppEvent};
use crate::feed::ViewState;
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::loop_runner::spawn_fetch;
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(Action::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            return Ok(Action::Quit)
        }
        // Retry from Error, refresh from Loaded; ignored while a fetch is in flight
        KeyCode::Char('r') | KeyCode::F(5) => spawn_fetch(app, event_tx),
        _ => {}
    }

    if !matches!(app.feed.state(), ViewState::Loaded(_)) {
        return Ok(Action::Continue);
    }

    match code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('o') | KeyCode::Enter => open_selected(app),
        _ => {}
    }

    Ok(Action::Continue)
}

/// Open the selected entry's link in the system browser.
fn open_selected(app: &mut App) {
    let Some(link) = app.selected_entry().map(|e| e.link.clone()) else {
        return;
    };

    match validate_url_for_open(&link) {
        Ok(url) => match open::that_detached(url.as_str()) {
            Ok(()) => app.set_status("Opened in browser"),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open link");
                app.set_status(format!("Failed to open link: {}", e));
            }
        },
        Err(e) => {
            tracing::debug!(link = %link, error = %e, "Refusing to open entry link");
            app.set_status("Entry has no valid link");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{parse_feed, FeedFetcher, FetchError};

    fn loaded_app() -> App {
        let fetcher =
            FeedFetcher::new(reqwest::Client::new(), "https://proxy.example.com/raw").unwrap();
        let mut app = App::new(fetcher, "https://example.com/rss");
        app.feed.begin();
        app.apply_feed_loaded(Ok(parse_feed(
            "<rss><channel><item><title>A</title></item><item><title>B</title></item></channel></rss>",
        )
        .unwrap()));
        app
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = loaded_app();
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('q'), KeyModifiers::NONE, &tx).unwrap(),
            Action::Quit
        ));
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, &tx).unwrap(),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn test_navigation_keys() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = loaded_app();

        handle_input(&mut app, KeyCode::Char('j'), KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.selected, 1);
        handle_input(&mut app, KeyCode::Up, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.selected, 0);
        handle_input(&mut app, KeyCode::Char('G'), KeyModifiers::SHIFT, &tx).unwrap();
        assert_eq!(app.selected, 1);
    }

    #[tokio::test]
    async fn test_open_without_link_sets_status() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = loaded_app();

        handle_input(&mut app, KeyCode::Char('o'), KeyModifiers::NONE, &tx).unwrap();
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Entry has no valid link");
    }

    #[tokio::test]
    async fn test_retry_ignored_while_loading() {
        let (tx, _rx) = mpsc::channel(1);
        let fetcher =
            FeedFetcher::new(reqwest::Client::new(), "https://proxy.example.com/raw").unwrap();
        let mut app = App::new(fetcher, "https://example.com/rss");
        assert!(app.feed.begin());

        handle_input(&mut app, KeyCode::Char('r'), KeyModifiers::NONE, &tx).unwrap();
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Already loading...");
    }

    #[tokio::test]
    async fn test_navigation_ignored_in_error_state() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = loaded_app();
        app.feed.begin();
        app.apply_feed_loaded(Err(FetchError::HttpStatus(500).into()));

        handle_input(&mut app, KeyCode::Char('j'), KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.selected, 0);
    }
}
