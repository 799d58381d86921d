//! Paginated feed accumulator
//!
//! Pages of process entries are fetched from the dashboard endpoint and
//! merged into one displayed set. Page 1 replaces the set, later pages are
//! appended. Counts are always recomputed from the latest response, never
//! incremented on their own.

use tracing::{debug, warn};

use crate::error::ClientError;
use crate::fence::RequestFence;
use crate::models::{DashboardPage, ProcessEntry};

/// Entries per dashboard page
pub const PAGE_SIZE: usize = 20;

/// Shown instead of entries when page 1 comes back empty
pub const EMPTY_PLACEHOLDER: &str = "Monitoring network connections...";

/// Pagination counters for the dashboard feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: u32,
    pub total_items: usize,
    pub displayed_items: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_items: 0,
            displayed_items: 0,
            page_size: PAGE_SIZE,
        }
    }
}

impl PaginationState {
    /// Back to page 1 with nothing displayed
    pub fn reset(&mut self) {
        self.current_page = 1;
        self.displayed_items = 0;
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn has_more(&self) -> bool {
        self.displayed_items < self.total_items
    }

    pub fn page_indicator(&self) -> String {
        format!("Page {} of {}", self.current_page, self.total_pages())
    }

    pub fn summary(&self) -> String {
        let (displayed, total) = (self.displayed_items, self.total_items);
        if total == 0 {
            "No processes detected".to_string()
        } else if displayed == total {
            format!("Showing all {} processes", total)
        } else {
            format!(
                "Showing {} of {} processes · {} more available",
                displayed,
                total,
                total.saturating_sub(displayed)
            )
        }
    }
}

/// One outstanding dashboard page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub seq: u64,
    /// Load-more clicks notify the user, auto-refreshes stay quiet
    pub user_initiated: bool,
}

/// What applying a page response did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Rendered { page: u32, count: usize },
    Empty { page: u32 },
    Failed { page: u32 },
    /// Superseded by a newer request; nothing changed
    Stale { page: u32 },
}

/// Dashboard feed state: pagination plus the rendered entries
#[derive(Debug, Default)]
pub struct FeedAccumulator {
    pagination: PaginationState,
    entries: Vec<ProcessEntry>,
    placeholder: bool,
    fence: RequestFence,
    failed_page: Option<u32>,
    loading_more: Option<u64>,
    /// Outstanding page-1 refresh and the displayed count it replaced
    refreshing: Option<(u64, usize)>,
}

impl FeedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn entries(&self) -> &[ProcessEntry] {
        &self.entries
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        self.placeholder.then_some(EMPTY_PLACEHOLDER)
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more.is_some()
    }

    /// Whether `begin_load_more` would be accepted.
    ///
    /// A page-1 refresh zeroes the displayed count until it lands, so more
    /// is never offered while one is outstanding.
    pub fn can_load_more(&self) -> bool {
        self.refreshing.is_none() && self.loading_more.is_none() && self.pagination.has_more()
    }

    /// Page 1, nothing displayed, no entries, nothing in flight
    pub fn reset(&mut self) {
        self.pagination.reset();
        self.entries.clear();
        self.placeholder = false;
        self.failed_page = None;
        self.loading_more = None;
        self.refreshing = None;
        self.fence.invalidate();
    }

    /// Start an auto-refresh of page 1.
    ///
    /// Returns `None` once the user has paged forward, so a refresh never
    /// yanks them back to the top.
    pub fn begin_refresh(&mut self) -> Option<PageRequest> {
        if self.pagination.current_page != 1 {
            debug!(
                current_page = self.pagination.current_page,
                "Skipping auto-refresh, user has paged forward"
            );
            return None;
        }

        let previous = match self.refreshing {
            Some((_, previous)) => previous,
            None => self.pagination.displayed_items,
        };
        let seq = self.fence.issue();
        self.refreshing = Some((seq, previous));
        self.pagination.displayed_items = 0;
        Some(PageRequest {
            page: 1,
            seq,
            user_initiated: false,
        })
    }

    /// Start fetching the next page.
    ///
    /// After a failed load the same page number is requested again instead
    /// of skipping ahead. Returns `None` while a previous load or a page-1
    /// refresh is in flight.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if self.loading_more.is_some() || self.refreshing.is_some() {
            return None;
        }

        let page = match self.failed_page.take() {
            Some(failed) if failed == self.pagination.current_page => failed,
            _ => self.pagination.current_page + 1,
        };
        self.pagination.current_page = page;

        let seq = self.fence.issue();
        self.loading_more = Some(seq);
        Some(PageRequest {
            page,
            seq,
            user_initiated: true,
        })
    }

    /// Drop a completion whose originating context is gone
    pub fn discard(&mut self, request: &PageRequest) {
        if self.loading_more == Some(request.seq) {
            self.loading_more = None;
        }
        if let Some((seq, previous)) = self.refreshing {
            if seq == request.seq {
                self.refreshing = None;
                self.pagination.displayed_items = previous;
            }
        }
    }

    /// Apply the result of a page fetch
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: Result<DashboardPage, ClientError>,
    ) -> FeedOutcome {
        let fresh = self.fence.is_current(request.seq);
        self.discard(request);

        if !fresh {
            debug!(page = request.page, seq = request.seq, "Discarding stale page response");
            return FeedOutcome::Stale { page: request.page };
        }

        let response = match result {
            Ok(response) if response.page == request.page => response,
            Ok(response) => {
                warn!(
                    requested = request.page,
                    received = response.page,
                    "Backend answered with a different page"
                );
                return self.fail(request);
            }
            Err(e) => {
                warn!(page = request.page, error = %e, "Dashboard fetch failed");
                return self.fail(request);
            }
        };

        let page = response.page;
        let count = response.items.len();

        if count == 0 && page > 1 {
            // Nothing past what is shown: step back so refreshes resume
            self.pagination.current_page = page - 1;
            self.pagination.total_items = self.pagination.displayed_items;
            return FeedOutcome::Empty { page };
        }

        let Some(displayed) = response
            .items_per_page
            .checked_mul(page as usize - 1)
            .and_then(|skipped| skipped.checked_add(count))
        else {
            warn!(
                page,
                items_per_page = response.items_per_page,
                "Page offset out of range"
            );
            return self.fail(request);
        };

        self.pagination.page_size = response.items_per_page;
        self.pagination.displayed_items = displayed;
        self.pagination.total_items = response.total_items.max(displayed);

        if count == 0 {
            self.entries.clear();
            self.placeholder = true;
            return FeedOutcome::Empty { page };
        }

        if page == 1 {
            self.entries = response.items;
        } else {
            self.entries.extend(response.items);
        }
        self.placeholder = false;

        FeedOutcome::Rendered { page, count }
    }

    /// Counters and entries stay as they were so the same page can be retried.
    /// A failed refresh has already had its displayed count restored.
    fn fail(&mut self, request: &PageRequest) -> FeedOutcome {
        if request.user_initiated && request.page == self.pagination.current_page {
            self.failed_page = Some(request.page);
        }
        FeedOutcome::Failed { page: request.page }
    }
}
