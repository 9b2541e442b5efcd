use std::cmp::Ordering;

use strum_macros::Display;
use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::internal::keybindings::ReaderCommand;
use crate::internal::models::{ChapterPageSet, ChapterSummary};

/// Direction of a chapter transition. `Next` moves to the numerically lower
/// chapter, i.e. one step further down the newest-first list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Direction {
    Prev,
    Next,
}

/// Newest-first chapter list plus the chapter being read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterNavigationContext {
    chapters: Vec<ChapterSummary>,
    current: Option<String>,
}

impl ChapterNavigationContext {
    /// Sorts by descending chapter number. Chapters without a usable number
    /// go last; ties are broken by id so the order is stable across fetches.
    pub fn new(mut chapters: Vec<ChapterSummary>) -> Self {
        chapters.sort_by(compare_chapters);
        Self {
            chapters,
            current: None,
        }
    }

    pub fn with_current(mut self, chapter_id: &str) -> Self {
        self.set_current(chapter_id);
        self
    }

    /// Returns `false` (and leaves the current chapter unset) when the id is
    /// not in the list.
    pub fn set_current(&mut self, chapter_id: &str) -> bool {
        let known = self.index_of(chapter_id).is_some();
        self.current = known.then(|| chapter_id.to_string());
        known
    }

    pub fn chapters(&self) -> &[ChapterSummary] {
        &self.chapters
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&ChapterSummary> {
        self.index_of(self.current.as_deref()?)
            .map(|index| &self.chapters[index])
    }

    /// Neighbor of the current chapter, `None` at either end of the list.
    pub fn neighbor(&self, direction: Direction) -> Option<&ChapterSummary> {
        let index = self.index_of(self.current.as_deref()?)?;
        let target = match direction {
            Direction::Next => index.checked_add(1)?,
            Direction::Prev => index.checked_sub(1)?,
        };
        self.chapters.get(target)
    }

    pub fn next_chapter_id(&self) -> Option<&str> {
        self.neighbor(Direction::Next).map(|c| c.id.as_str())
    }

    pub fn prev_chapter_id(&self) -> Option<&str> {
        self.neighbor(Direction::Prev).map(|c| c.id.as_str())
    }

    fn index_of(&self, chapter_id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == chapter_id)
    }
}

fn compare_chapters(a: &ChapterSummary, b: &ChapterSummary) -> Ordering {
    let by_number = match (a.numeric(), b.numeric()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_number.then_with(|| a.id.cmp(&b.id))
}

/// Scroll container geometry reported by the reader view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Total scrollable height of the page strip.
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, scroll_height: f64, viewport_height: f64) -> Self {
        Self {
            offset,
            scroll_height,
            viewport_height,
        }
    }

    /// Largest meaningful offset.
    pub fn max_offset(&self) -> f64 {
        (self.scroll_height - self.viewport_height).max(0.0)
    }

    /// Offset a scroll command should move to. Chapter and visibility
    /// commands have no scroll target.
    pub fn target_for(&self, command: ReaderCommand, step: f64) -> Option<f64> {
        let distance = self.viewport_height * step;
        let target = match command {
            ReaderCommand::ScrollForward => self.offset + distance,
            ReaderCommand::ScrollBack => self.offset - distance,
            ReaderCommand::Top => 0.0,
            ReaderCommand::Bottom => self.max_offset(),
            _ => return None,
        };
        Some(target.clamp(0.0, self.max_offset()))
    }
}

/// `floor((offset + viewport) / (scroll_height / page_count))`, clamped to
/// `[0, page_count - 1]`. Degenerate geometry reads as the first page.
pub fn estimate_page(metrics: &ScrollMetrics, page_count: usize) -> usize {
    if page_count == 0 {
        return 0;
    }
    let page_height = metrics.scroll_height / page_count as f64;
    if !page_height.is_finite() || page_height <= 0.0 {
        return 0;
    }
    let raw = ((metrics.offset + metrics.viewport_height) / page_height).floor();
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(page_count - 1)
}

/// Identifies one manifest fetch. A result is only applied when its ticket
/// is the one the session is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterTicket {
    generation: u64,
    chapter_id: String,
}

impl ChapterTicket {
    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading {
        chapter_id: String,
    },
    Ready {
        pages: ChapterPageSet,
        /// Advisory 0-based page index derived from scroll geometry.
        position: usize,
    },
    Failed {
        chapter_id: String,
        error: FetchError,
    },
}

/// Reading session for one chapter at a time.
///
/// `open` moves to `Loading` and hands out a ticket; the caller fetches the
/// manifest and passes the outcome to `apply`, which settles on `Ready` or
/// `Failed`. Opening another chapter abandons the outstanding fetch.
#[derive(Debug, Default)]
pub struct ChapterSession {
    state: SessionState,
    navigation: ChapterNavigationContext,
    pending: Option<ChapterTicket>,
    generation: u64,
}

impl ChapterSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_navigation(navigation: ChapterNavigationContext) -> Self {
        Self {
            navigation,
            ..Self::default()
        }
    }

    /// Replace the chapter list, keeping the current chapter when it is
    /// still listed.
    pub fn set_navigation(&mut self, mut navigation: ChapterNavigationContext) {
        if let Some(current) = self.current_chapter_id().map(str::to_string) {
            navigation.set_current(&current);
        }
        self.navigation = navigation;
    }

    pub fn navigation(&self) -> &ChapterNavigationContext {
        &self.navigation
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending(&self) -> Option<&ChapterTicket> {
        self.pending.as_ref()
    }

    /// Chapter the session is loading, showing or failed on.
    pub fn current_chapter_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Loading { chapter_id } | SessionState::Failed { chapter_id, .. } => {
                Some(chapter_id.as_str())
            }
            SessionState::Ready { pages, .. } => Some(pages.chapter_id.as_str()),
        }
    }

    pub fn pages(&self) -> Option<&ChapterPageSet> {
        match &self.state {
            SessionState::Ready { pages, .. } => Some(pages),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match &self.state {
            SessionState::Ready { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.state {
            SessionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Start loading `chapter_id`. The returned ticket must accompany the
    /// manifest result.
    pub fn open(&mut self, chapter_id: &str) -> ChapterTicket {
        self.generation += 1;
        let ticket = ChapterTicket {
            generation: self.generation,
            chapter_id: chapter_id.to_string(),
        };
        if !self.navigation.set_current(chapter_id) {
            debug!(chapter_id, "Opened chapter is not in the navigation list");
        }
        info!(chapter_id, generation = self.generation, "Opening chapter");
        self.state = SessionState::Loading {
            chapter_id: chapter_id.to_string(),
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Settle a manifest fetch. Returns `false` when the ticket is stale.
    pub fn apply(
        &mut self,
        ticket: &ChapterTicket,
        result: Result<ChapterPageSet, FetchError>,
    ) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            debug!(
                chapter_id = %ticket.chapter_id,
                generation = ticket.generation,
                "Discarding stale chapter manifest"
            );
            return false;
        }
        self.pending = None;

        self.state = match result {
            Ok(pages) => {
                info!(
                    chapter_id = %ticket.chapter_id,
                    pages = pages.total(),
                    "Chapter ready"
                );
                SessionState::Ready { pages, position: 0 }
            }
            Err(error) => {
                warn!(chapter_id = %ticket.chapter_id, %error, "Chapter failed to load");
                SessionState::Failed {
                    chapter_id: ticket.chapter_id.clone(),
                    error,
                }
            }
        };
        true
    }

    /// Open the neighbor chapter. A no-op at the ends of the list and while
    /// the reader is closed.
    pub fn advance(&mut self, direction: Direction) -> Option<ChapterTicket> {
        if matches!(self.state, SessionState::Idle) {
            debug!(%direction, "Reader closed, ignoring chapter navigation");
            return None;
        }
        let Some(target) = self.navigation.neighbor(direction).map(|c| c.id.clone()) else {
            debug!(%direction, current = ?self.navigation.current_id(), "No neighbor chapter");
            return None;
        };
        Some(self.open(&target))
    }

    /// Re-issue the fetch for a failed chapter.
    pub fn retry(&mut self) -> Option<ChapterTicket> {
        match &self.state {
            SessionState::Failed { chapter_id, .. } => {
                let chapter_id = chapter_id.clone();
                Some(self.open(&chapter_id))
            }
            _ => None,
        }
    }

    /// Leave the reader. Any outstanding fetch becomes stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.state = SessionState::Idle;
    }

    /// Recompute the reading position from scroll geometry. Only meaningful
    /// while `Ready`; returns the new position.
    pub fn update_position(&mut self, metrics: &ScrollMetrics) -> Option<usize> {
        match &mut self.state {
            SessionState::Ready { pages, position } => {
                *position = estimate_page(metrics, pages.total());
                Some(*position)
            }
            _ => None,
        }
    }
}
