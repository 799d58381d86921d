//! Process search autocomplete and detail lookup
//!
//! The searchable list is loaded once at startup and never refreshed, so a
//! process started later is only found after a restart.

use tracing::{debug, warn};

use crate::error::ClientError;
use crate::fence::RequestFence;
use crate::models::{ProcessDetails, SearchEntry};

/// Dropdown shows at most this many suggestions
pub const MAX_SUGGESTIONS: usize = 10;

/// Read-only list of searchable processes, in backend order
#[derive(Debug, Clone, Default)]
pub struct SearchCache {
    entries: Vec<SearchEntry>,
}

impl SearchCache {
    pub fn new(entries: Vec<SearchEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring match on name or pid, first matches in cache order
    pub fn matches(&self, query: &str, limit: usize) -> Vec<SearchEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle) || e.pid.to_string().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Keys the dropdown reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Selected(usize),
    /// Open the detail view for this pid
    Open(u32),
    Closed,
    Ignored,
}

/// Autocomplete dropdown state
///
/// The selection is an index into `results`, never derived from rendered
/// output.
#[derive(Debug, Default)]
pub struct Autocomplete {
    cache: Option<SearchCache>,
    query: String,
    results: Vec<SearchEntry>,
    selected: Option<usize>,
    open: bool,
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the cache. Only the first call takes effect.
    pub fn build_cache(&mut self, entries: Vec<SearchEntry>) -> bool {
        if self.cache.is_some() {
            debug!("Search cache already built, ignoring reload");
            return false;
        }
        self.cache = Some(SearchCache::new(entries));
        true
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchEntry] {
        &self.results
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&SearchEntry> {
        self.selected.and_then(|i| self.results.get(i))
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn on_input(&mut self, text: &str) {
        self.query = text.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.close();
            return;
        }

        self.results = self
            .cache
            .as_ref()
            .map(|cache| cache.matches(trimmed, MAX_SUGGESTIONS))
            .unwrap_or_default();
        self.selected = (!self.results.is_empty()).then_some(0);
        self.open = true;
    }

    pub fn on_keydown(&mut self, key: Key) -> KeyOutcome {
        if !self.open {
            return KeyOutcome::Ignored;
        }

        match key {
            Key::ArrowDown => self.step(true),
            Key::ArrowUp => self.step(false),
            Key::Enter => match self.selected_entry().map(|e| e.pid) {
                Some(pid) => {
                    self.close();
                    KeyOutcome::Open(pid)
                }
                None => KeyOutcome::Ignored,
            },
            Key::Escape => {
                self.close();
                KeyOutcome::Closed
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Clicks outside the input and dropdown close it
    pub fn on_click_outside(&mut self) {
        self.close();
    }

    /// Pointer left the list; nothing is highlighted until the next key
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.results.clear();
        self.selected = None;
    }

    fn step(&mut self, forward: bool) -> KeyOutcome {
        let len = self.results.len();
        if len == 0 {
            return KeyOutcome::Ignored;
        }

        let next = match (self.selected, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.selected = Some(next);
        KeyOutcome::Selected(next)
    }
}

/// Process detail view
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Closed,
    Loading { pid: u32 },
    Showing(ProcessDetails),
}

/// Result of applying a detail lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    Shown,
    /// Process exited; view closed
    Gone { pid: u32 },
    Failed,
    Stale,
}

#[derive(Debug)]
pub struct DetailPanel {
    state: DetailState,
    fence: RequestFence,
}

impl Default for DetailPanel {
    fn default() -> Self {
        Self {
            state: DetailState::Closed,
            fence: RequestFence::new(),
        }
    }
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, DetailState::Closed)
    }

    /// Open in loading state; returns the request sequence
    pub fn begin(&mut self, pid: u32) -> u64 {
        self.state = DetailState::Loading { pid };
        self.fence.issue()
    }

    pub fn close(&mut self) {
        self.state = DetailState::Closed;
        self.fence.invalidate();
    }

    pub fn complete(
        &mut self,
        pid: u32,
        seq: u64,
        result: Result<ProcessDetails, ClientError>,
    ) -> DetailOutcome {
        if !self.fence.is_current(seq) {
            return DetailOutcome::Stale;
        }

        match result {
            Ok(details) if details.found => {
                self.state = DetailState::Showing(details);
                DetailOutcome::Shown
            }
            Ok(_) | Err(ClientError::NotFound { .. }) => {
                self.state = DetailState::Closed;
                DetailOutcome::Gone { pid }
            }
            Err(e) => {
                warn!(pid, error = %e, "Process detail lookup failed");
                self.state = DetailState::Closed;
                DetailOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_entries() -> Vec<SearchEntry> {
        vec![
            SearchEntry {
                pid: 1,
                name: "nginx".to_string(),
            },
            SearchEntry {
                pid: 2,
                name: "node".to_string(),
            },
        ]
    }

    fn autocomplete_with(entries: Vec<SearchEntry>) -> Autocomplete {
        let mut ac = Autocomplete::new();
        ac.build_cache(entries);
        ac
    }

    #[test]
    fn test_substring_matches_name_and_pid() {
        let mut ac = autocomplete_with(cache_entries());

        ac.on_input("n");
        let pids: Vec<_> = ac.results().iter().map(|e| e.pid).collect();
        assert_eq!(pids, vec![1, 2]);
        assert!(ac.is_open());

        ac.on_input("no");
        let pids: Vec<_> = ac.results().iter().map(|e| e.pid).collect();
        assert_eq!(pids, vec![2]);

        ac.on_input("1");
        let pids: Vec<_> = ac.results().iter().map(|e| e.pid).collect();
        assert_eq!(pids, vec![1]);

        ac.on_input("");
        assert!(!ac.is_open());
        assert!(ac.results().is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let mut ac = autocomplete_with(cache_entries());
        ac.on_input("NGI");
        assert_eq!(ac.results().len(), 1);
        assert_eq!(ac.results()[0].name, "nginx");
    }

    #[test]
    fn test_results_capped_in_cache_order() {
        let entries = (100..130)
            .map(|pid| SearchEntry {
                pid,
                name: format!("worker-{}", pid),
            })
            .collect();
        let mut ac = autocomplete_with(entries);
        ac.on_input("worker");
        assert_eq!(ac.results().len(), MAX_SUGGESTIONS);
        assert_eq!(ac.results()[0].pid, 100);
        assert_eq!(ac.results()[9].pid, 109);
    }

    #[test]
    fn test_first_item_preselected() {
        let mut ac = autocomplete_with(cache_entries());
        ac.on_input("n");
        assert_eq!(ac.selected(), Some(0));

        ac.on_input("zzz");
        assert!(ac.is_open());
        assert_eq!(ac.selected(), None);
    }

    fn three_items() -> Autocomplete {
        let mut ac = autocomplete_with(vec![
            SearchEntry { pid: 10, name: "alpha".to_string() },
            SearchEntry { pid: 11, name: "alpine".to_string() },
            SearchEntry { pid: 12, name: "alsa".to_string() },
        ]);
        ac.on_input("al");
        ac
    }

    #[test]
    fn test_arrow_down_from_no_selection_picks_first() {
        let mut ac = three_items();
        ac.clear_selection();
        assert_eq!(ac.on_keydown(Key::ArrowDown), KeyOutcome::Selected(0));
    }

    #[test]
    fn test_arrow_up_from_no_selection_picks_last() {
        let mut ac = three_items();
        ac.clear_selection();
        assert_eq!(ac.on_keydown(Key::ArrowUp), KeyOutcome::Selected(2));
    }

    #[test]
    fn test_arrow_down_wraps() {
        let mut ac = three_items();
        assert_eq!(ac.selected(), Some(0));
        ac.on_keydown(Key::ArrowDown);
        ac.on_keydown(Key::ArrowDown);
        assert_eq!(ac.on_keydown(Key::ArrowDown), KeyOutcome::Selected(0));
        assert_eq!(ac.on_keydown(Key::ArrowUp), KeyOutcome::Selected(2));
    }

    #[test]
    fn test_enter_opens_selected_and_closes() {
        let mut ac = three_items();
        ac.on_keydown(Key::ArrowDown);
        assert_eq!(ac.on_keydown(Key::Enter), KeyOutcome::Open(11));
        assert!(!ac.is_open());
    }

    #[test]
    fn test_escape_and_click_outside_close() {
        let mut ac = three_items();
        assert_eq!(ac.on_keydown(Key::Escape), KeyOutcome::Closed);
        assert!(!ac.is_open());

        ac.on_input("al");
        ac.on_click_outside();
        assert!(!ac.is_open());
        assert_eq!(ac.on_keydown(Key::ArrowDown), KeyOutcome::Ignored);
    }

    #[test]
    fn test_cache_is_built_once() {
        let mut ac = autocomplete_with(cache_entries());
        assert!(!ac.build_cache(vec![SearchEntry {
            pid: 3,
            name: "newcomer".to_string(),
        }]));
        ac.on_input("newcomer");
        assert!(ac.results().is_empty());
    }

    #[test]
    fn test_detail_gone_closes_view() {
        let mut panel = DetailPanel::new();
        let seq = panel.begin(42);
        assert!(panel.is_open());

        let gone = ProcessDetails {
            found: false,
            fields: serde_json::Map::new(),
        };
        assert_eq!(panel.complete(42, seq, Ok(gone)), DetailOutcome::Gone { pid: 42 });
        assert!(!panel.is_open());
    }

    #[test]
    fn test_detail_shown_and_stale() {
        let mut panel = DetailPanel::new();
        let first = panel.begin(1);
        let second = panel.begin(2);

        let mut fields = serde_json::Map::new();
        fields.insert("name".to_string(), serde_json::json!("node"));
        let details = ProcessDetails { found: true, fields };

        assert_eq!(
            panel.complete(1, first, Ok(details.clone())),
            DetailOutcome::Stale
        );
        assert_eq!(panel.complete(2, second, Ok(details)), DetailOutcome::Shown);
        assert!(matches!(panel.state(), DetailState::Showing(d) if d.name() == Some("node")));
    }
}
