//! Filter/sort/search/pagination state for the transaction list, and the request
//! parameters derived from it.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::{SortDirection, SortField, TransactionKind};

mod debounce;
mod latest;

pub use debounce::Debouncer;
pub use latest::{RequestTracker, Ticket};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    pub page: usize,
    pub page_size: usize,
    /// Committed (debounced) search term.
    pub search: String,
    pub type_filter: Option<TransactionKind>,
    pub sort_field: Option<SortField>,
    pub sort_direction: SortDirection,
}

impl QueryState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search: String::new(),
            type_filter: None,
            sort_field: None,
            sort_direction: SortDirection::Asc,
        }
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Parameters for `GET /transactions`. Unset filters are `None` and never sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionQuery {
    pub skip: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
}

impl TransactionQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(s) = &self.search {
            out.push(("search", s.clone()));
        }
        if let Some(k) = self.kind {
            out.push(("type", k.as_str().to_string()));
        }
        if let Some(f) = self.sort_field {
            out.push(("sort_field", f.as_str().to_string()));
        }
        if let Some(d) = self.sort_direction {
            out.push(("sort_direction", d.as_str().to_string()));
        }
        out
    }
}

/// Owns [`QueryState`] and applies user actions to it.
///
/// Search input goes through a [`Debouncer`]; the committed term only changes once
/// typing pauses for [`SEARCH_DEBOUNCE`]. Any search or type change puts the list
/// back on page 1.
#[derive(Debug, Clone)]
pub struct QueryController {
    state: QueryState,
    search_input: Debouncer<String>,
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryController {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: QueryState::new(page_size),
            search_input: Debouncer::new(SEARCH_DEBOUNCE),
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Records a keystroke-level search value; nothing is committed yet.
    pub fn set_search(&mut self, term: impl Into<String>, now: Instant) {
        self.search_input.push(term.into(), now);
    }

    pub fn search_due_in(&self, now: Instant) -> Option<Duration> {
        self.search_input.time_until_due(now)
    }

    /// Commits the pending search term if its quiet period has elapsed.
    /// Returns true when a commit happened.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        match self.search_input.poll(now) {
            Some(term) => {
                self.commit_search(term);
                true
            }
            None => false,
        }
    }

    /// Commits any pending search term without waiting.
    pub fn flush_search(&mut self) -> bool {
        match self.search_input.flush() {
            Some(term) => {
                self.commit_search(term);
                true
            }
            None => false,
        }
    }

    /// Sets the effective search term directly, bypassing the debounce.
    pub fn commit_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        tracing::debug!(search = %term, "search committed");
        self.state.search = term.trim().to_string();
        self.state.page = 1;
    }

    pub fn set_type_filter(&mut self, kind: Option<TransactionKind>) {
        self.state.type_filter = kind;
        self.state.page = 1;
    }

    /// Same field toggles the direction; a new field starts ascending.
    pub fn set_sort(&mut self, field: SortField) {
        if self.state.sort_field == Some(field) {
            self.state.sort_direction = self.state.sort_direction.toggle();
        } else {
            self.state.sort_field = Some(field);
            self.state.sort_direction = SortDirection::Asc;
        }
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.state.sort_direction = direction;
    }

    pub fn clear_sort(&mut self) {
        self.state.sort_field = None;
        self.state.sort_direction = SortDirection::Asc;
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.page = page.max(1);
    }

    /// A short page means it was the last one. A full last page still reports a next
    /// page; the following fetch then comes back empty.
    pub fn has_next(&self, rows_returned: usize) -> bool {
        rows_returned >= self.state.page_size
    }

    pub fn has_previous(&self) -> bool {
        self.state.page > 1
    }

    pub fn next_page(&mut self, rows_returned: usize) -> bool {
        if !self.has_next(rows_returned) {
            return false;
        }
        self.state.page = self.state.page.saturating_add(1);
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.state.page -= 1;
        true
    }

    pub fn request(&self) -> TransactionQuery {
        let s = &self.state;
        let search = Some(s.search.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        TransactionQuery {
            skip: (s.page - 1).saturating_mul(s.page_size),
            limit: s.page_size,
            search,
            kind: s.type_filter,
            sort_field: s.sort_field,
            sort_direction: s.sort_field.map(|_| s.sort_direction),
        }
    }
}
