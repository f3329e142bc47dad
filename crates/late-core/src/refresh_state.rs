//! Refresh state machine shared by the full screen and the widget.
//!
//! Overlapping refreshes are not deduplicated: a second `begin_fetch` while
//! one is in flight is allowed, and whichever result arrives last wins.

/// Lifecycle of the "next event" shown on a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshState<T> {
    /// Nothing loaded yet.
    Uninitialized,
    /// A fetch is in flight.
    Fetching,
    /// Last fetch succeeded; `None` means no upcoming event.
    Ready(Option<T>),
    /// Credentials or calendar missing or rejected; the user must reconfigure.
    Stale,
}

impl<T> Default for RefreshState<T> {
    fn default() -> Self {
        RefreshState::Uninitialized
    }
}

impl<T> RefreshState<T> {
    /// Enter `Fetching` on first load, explicit refresh, poll, or calendar change.
    pub fn begin_fetch(&mut self) {
        *self = RefreshState::Fetching;
    }

    /// Successful fetch, even if it found nothing.
    pub fn on_fetch_ok(&mut self, next: Option<T>) {
        *self = RefreshState::Ready(next);
    }

    /// Fetch failed; the session or calendar is treated as invalid.
    pub fn on_fetch_err(&mut self) {
        *self = RefreshState::Stale;
    }

    /// Token or calendar id absent: go straight to `Stale` without fetching.
    pub fn on_missing_config(&mut self) {
        *self = RefreshState::Stale;
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, RefreshState::Fetching)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshState::Stale)
    }

    /// The current next event, if the last fetch produced one.
    pub fn current(&self) -> Option<&T> {
        match self {
            RefreshState::Ready(next) => next.as_ref(),
            _ => None,
        }
    }
}
