//! Application event handling.
//!
//! Applies background fetch results to the application state.

use crate::app::{App, AppEvent};
use crate::feed::ViewState;

pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::FeedLoaded(outcome) => {
            app.apply_feed_loaded(outcome);
            if let ViewState::Loaded(result) = app.feed.state() {
                let msg = format!("Loaded {} entries", result.total_entries());
                app.set_status(msg);
            }
        }
    }
}
