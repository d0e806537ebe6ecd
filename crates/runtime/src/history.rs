//! Two-way sync between viewport changes and the browser navigation stack.
//!
//! Outgoing: every viewport-changed event pushes one history entry whose URL
//! is the permalink hash. Incoming: a popstate carrying a stored viewport is
//! applied to the surface, and the viewport-changed echo that the apply
//! produces is swallowed exactly once so navigating back does not push a new
//! entry.

use formats::PermalinkCodec;
use foundation::{ProjectionUnits, ViewportState};
use tracing::{debug, warn};

/// Title passed along with every pushed entry.
pub const HISTORY_TITLE: &str = "map";

/// One navigation-stack record: the raw viewport plus its URL fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub state: ViewportState,
    pub hash_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    Rejected(String),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Rejected(msg) => write!(f, "history push rejected: {msg}"),
        }
    }
}

impl std::error::Error for HistoryError {}

/// The slice of the browser history API the synchronizer writes to.
pub trait HistoryApi {
    /// Equivalent of `history.pushState(entry.state, title, entry.hash_label)`.
    fn push_state(&mut self, entry: &HistoryEntry, title: &str) -> Result<(), HistoryError>;
}

impl<H: HistoryApi + ?Sized> HistoryApi for Box<H> {
    fn push_state(&mut self, entry: &HistoryEntry, title: &str) -> Result<(), HistoryError> {
        (**self).push_state(entry, title)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Idle,
    /// The next outgoing state change is the echo of a history restore.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Pushed(HistoryEntry),
    Suppressed,
    /// A push was attempted but the history backend refused it.
    PushFailed(HistoryError),
}

#[derive(Debug)]
pub struct HistorySynchronizer<H> {
    history: H,
    round_coords: bool,
    mode: SyncMode,
}

impl<H: HistoryApi> HistorySynchronizer<H> {
    pub fn new(history: H, round_coords: bool) -> Self {
        Self {
            history,
            round_coords,
            mode: SyncMode::Idle,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    /// Handle an outgoing viewport-changed event.
    ///
    /// Exactly one of push / suppress happens per call.
    pub fn on_state_change(&mut self, state: &ViewportState, units: ProjectionUnits) -> SyncOutcome {
        if self.mode == SyncMode::Suppressed {
            self.mode = SyncMode::Idle;
            debug!("history: suppressed echo of restored viewport");
            return SyncOutcome::Suppressed;
        }

        let hash_label = PermalinkCodec::new(units).encode(state, self.round_coords);
        let entry = HistoryEntry {
            state: *state,
            hash_label,
        };
        match self.history.push_state(&entry, HISTORY_TITLE) {
            Ok(()) => {
                debug!(hash = %entry.hash_label, "history: pushed entry");
                SyncOutcome::Pushed(entry)
            }
            Err(err) => {
                warn!(error = %err, "history: push failed");
                SyncOutcome::PushFailed(err)
            }
        }
    }

    /// Handle a popstate event.
    ///
    /// `stored` is the history payload (`None` for entries without map
    /// state, which are ignored). `current` is the surface's viewport right
    /// now; when it already equals the stored state the surface will not
    /// emit a change, so there is no echo to suppress. `apply` writes the
    /// stored state to the surface and returns whether the surface's viewport
    /// actually changed; a surface that clamps the state back to where it
    /// already was emits no echo either.
    ///
    /// Returns `true` if the surface moved.
    pub fn on_popstate(
        &mut self,
        stored: Option<ViewportState>,
        current: ViewportState,
        apply: impl FnOnce(ViewportState) -> bool,
    ) -> bool {
        let Some(state) = stored else {
            return false;
        };
        if state == current {
            debug!("history: popstate matches current viewport");
            return false;
        }
        if !apply(state) {
            debug!("history: restored viewport was constrained to the current one");
            return false;
        }
        self.mode = SyncMode::Suppressed;
        true
    }
}

/// Payload of a simulated popstate event.
#[derive(Debug, Clone, PartialEq)]
pub struct PopState {
    pub state: Option<ViewportState>,
    pub hash: String,
}

/// In-memory navigation stack with browser-like back/forward semantics.
///
/// Starts with one page-load entry that carries no map state.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<(Option<ViewportState>, String)>,
    cursor: usize,
    pushes: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_initial_hash("")
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_hash(hash: impl Into<String>) -> Self {
        Self {
            entries: vec![(None, hash.into())],
            cursor: 0,
            pushes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful `push_state` calls.
    pub fn push_count(&self) -> usize {
        self.pushes
    }

    /// URL fragment of the current entry.
    pub fn current_hash(&self) -> &str {
        &self.entries[self.cursor].1
    }

    pub fn back(&mut self) -> Option<PopState> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.pop_state())
    }

    pub fn forward(&mut self) -> Option<PopState> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.pop_state())
    }

    fn pop_state(&self) -> PopState {
        let (state, hash) = &self.entries[self.cursor];
        PopState {
            state: *state,
            hash: hash.clone(),
        }
    }
}

impl HistoryApi for MemoryHistory {
    fn push_state(&mut self, entry: &HistoryEntry, _title: &str) -> Result<(), HistoryError> {
        // Pushing drops any forward entries, as browsers do.
        self.entries.truncate(self.cursor + 1);
        self.entries
            .push((Some(entry.state), entry.hash_label.clone()));
        self.cursor = self.entries.len() - 1;
        self.pushes += 1;
        Ok(())
    }
}
