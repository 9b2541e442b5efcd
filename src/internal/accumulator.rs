use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::internal::models::{CatalogEntry, CatalogQuery};

/// Tag carried by every page request. The generation identifies the
/// accumulation run (bumped by every `start` and `reset`); the request number
/// identifies the fetch within that run. Only the outstanding ticket is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryTicket {
    generation: u64,
    request: u64,
}

impl QueryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Position of this fetch among all requests the accumulator issued.
    pub fn sequence(&self) -> u64 {
        self.request
    }
}

/// A page fetch the accumulator wants issued.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: QueryTicket,
    pub query: CatalogQuery,
    pub offset: usize,
    pub limit: usize,
}

/// What happened when a completed fetch was handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Merged {
        added: usize,
        dropped_duplicates: usize,
        exhausted: bool,
    },
    Failed(FetchError),
    /// The result belonged to a query that is no longer current.
    Stale,
}

/// Incremental fetch-and-merge state for one catalog query.
///
/// The accumulator never performs I/O. `start`/`load_more` hand out
/// `PageRequest`s; the caller runs them and feeds the outcome to `apply`.
/// Items are append-only for the lifetime of a query and never contain two
/// entries with the same id.
#[derive(Debug, Default)]
pub struct PageAccumulator {
    query: Option<CatalogQuery>,
    generation: u64,
    items: Vec<CatalogEntry>,
    seen: HashSet<String>,
    next_offset: usize,
    exhausted: bool,
    in_flight: Option<QueryTicket>,
    requests_issued: u64,
    last_error: Option<FetchError>,
}

impl PageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state for the previous query and request its first page.
    pub fn start(&mut self, query: CatalogQuery) -> PageRequest {
        self.clear();
        info!(generation = self.generation, query = %query, "Starting catalog accumulation");
        self.query = Some(query.clone());
        self.request(query)
    }

    /// Forget everything (view unmounted). Outstanding fetches become stale.
    pub fn reset(&mut self) {
        self.clear();
        debug!(generation = self.generation, "Catalog accumulator reset");
    }

    /// Request the next page, unless there is nothing to do: no query, the
    /// results are exhausted, or a fetch is already outstanding.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        let query = self.query.clone()?;
        if self.exhausted || self.in_flight.is_some() {
            debug!(
                exhausted = self.exhausted,
                in_flight = self.in_flight.is_some(),
                "load_more ignored"
            );
            return None;
        }
        self.last_error = None;
        Some(self.request(query))
    }

    /// Merge a completed fetch.
    ///
    /// Results for another generation are discarded untouched. On failure the
    /// offset and items stay as they were, so calling `load_more` again resumes
    /// from the same place.
    pub fn apply(
        &mut self,
        ticket: QueryTicket,
        result: Result<Vec<CatalogEntry>, FetchError>,
    ) -> MergeOutcome {
        if self.in_flight != Some(ticket) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale catalog page"
            );
            return MergeOutcome::Stale;
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    generation = self.generation,
                    offset = self.next_offset,
                    error = %err,
                    "Catalog page fetch failed"
                );
                self.last_error = Some(err.clone());
                return MergeOutcome::Failed(err);
            }
        };

        let limit = self.query.as_ref().map_or(0, CatalogQuery::page_size);
        let returned = page.len();
        let before = self.items.len();

        for entry in page {
            if self.seen.insert(entry.id.clone()) {
                self.items.push(entry);
            }
        }

        let added = self.items.len() - before;
        self.next_offset += returned;
        if returned < limit {
            self.exhausted = true;
        }
        self.last_error = None;

        info!(
            generation = self.generation,
            returned,
            added,
            total = self.items.len(),
            exhausted = self.exhausted,
            "Merged catalog page"
        );

        MergeOutcome::Merged {
            added,
            dropped_duplicates: returned - added,
            exhausted: self.exhausted,
        }
    }

    pub fn query(&self) -> Option<&CatalogQuery> {
        self.query.as_ref()
    }

    /// Generation of the current accumulation run.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[CatalogEntry] {
        &self.items
    }

    pub fn tail(&self) -> Option<&CatalogEntry> {
        self.items.last()
    }

    /// Server offset of the next page. Advances by the number of records the
    /// server returned, including any dropped as duplicates.
    pub fn next_offset(&self) -> usize {
        self.next_offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.query = None;
        self.items.clear();
        self.seen.clear();
        self.next_offset = 0;
        self.exhausted = false;
        self.in_flight = None;
        self.last_error = None;
    }

    fn request(&mut self, query: CatalogQuery) -> PageRequest {
        self.requests_issued += 1;
        let ticket = QueryTicket {
            generation: self.generation,
            request: self.requests_issued,
        };
        self.in_flight = Some(ticket);
        PageRequest {
            ticket,
            limit: query.page_size(),
            offset: self.next_offset,
            query,
        }
    }
}
