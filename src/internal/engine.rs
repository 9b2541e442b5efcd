use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyEvent;
use futures::future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::api::{CatalogSource, FetchError};
use crate::config::{AppConfig, ReaderConfig};
use crate::internal::accumulator::{MergeOutcome, PageAccumulator, PageRequest, QueryTicket};
use crate::internal::chapter_session::{
    ChapterNavigationContext, ChapterSession, ChapterTicket, Direction, ScrollMetrics,
};
use crate::internal::favorites::FavoritesStore;
use crate::internal::keybindings::{ReaderCommand, ReaderKeyMap};
use crate::internal::models::{
    CatalogEntry, CatalogQuery, ChapterPageSet, ChapterSummary, MAX_PAGE_SIZE, MangaDetails,
};
use crate::internal::notification::Notification;
use crate::internal::scroll_trigger::{IntersectionEvent, ScrollTrigger};

/// Quiet period before typed search text turns into a catalog query.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Messages consumed by the engine. UI events and completed fetches share
/// the same queue, so they are handled strictly one at a time.
#[derive(Debug, Clone)]
pub enum Action {
    ShowCatalog(CatalogQuery),
    LoadMore,
    SentinelVisible(IntersectionEvent),
    PageLoaded {
        ticket: QueryTicket,
        result: Result<Vec<CatalogEntry>, FetchError>,
    },
    CloseCatalog,
    SearchInput(String),
    SearchSettled {
        generation: u64,
        text: String,
    },
    OpenManga(String),
    MangaLoaded {
        generation: u64,
        result: Result<(MangaDetails, Vec<ChapterSummary>), FetchError>,
    },
    OpenChapter(String),
    AdvanceChapter(Direction),
    ChapterLoaded {
        ticket: ChapterTicket,
        result: Result<ChapterPageSet, FetchError>,
    },
    ReaderScrolled(ScrollMetrics),
    ReaderKey(KeyEvent),
    Reader(ReaderCommand),
    RetryChapter,
    CloseReader,
    ToggleFavorite(CatalogEntry),
    AddFavorite(CatalogEntry),
    RemoveFavorite(String),
    ClearNotification,
    Quit,
}

/// Owns every piece of browsing state and drives it from the action queue.
///
/// Fetches run on spawned tasks that only hold the catalog source and a
/// sender; their results come back as actions tagged with the ticket they
/// were issued for, and the state machines drop anything superseded.
pub struct Engine<S: CatalogSource> {
    source: Arc<S>,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
    catalog: PageAccumulator,
    trigger: ScrollTrigger,
    session: ChapterSession,
    favorites: FavoritesStore,
    keymap: ReaderKeyMap,
    scroll_step: f64,
    details: Option<MangaDetails>,
    manga_generation: u64,
    search_generation: u64,
    search_debounce: Duration,
    page_size: usize,
    last_metrics: Option<ScrollMetrics>,
    scroll_target: Option<f64>,
    controls_visible: bool,
    notification: Option<Notification>,
    running: bool,
}

impl<S: CatalogSource> Engine<S> {
    pub fn new(source: S, favorites: FavoritesStore, reader: &ReaderConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let mut keymap = ReaderKeyMap::new();
        keymap.merge_config(&reader.keybindings);

        Self {
            source: Arc::new(source),
            action_tx,
            action_rx,
            catalog: PageAccumulator::new(),
            trigger: ScrollTrigger::new(),
            session: ChapterSession::new(),
            favorites,
            keymap,
            scroll_step: reader.scroll_step,
            details: None,
            manga_generation: 0,
            search_generation: 0,
            search_debounce: SEARCH_DEBOUNCE,
            page_size: MAX_PAGE_SIZE,
            last_metrics: None,
            scroll_target: None,
            controls_visible: true,
            notification: None,
            running: true,
        }
    }

    /// Engine wired to the reader and catalog settings of `config`.
    pub fn from_config(source: S, favorites: FavoritesStore, config: &AppConfig) -> Self {
        Self::new(source, favorites, &config.reader).with_page_size(config.api.page_size)
    }

    /// Page size applied to every catalog query; clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Handle for UI code to post actions.
    pub fn sender(&self) -> UnboundedSender<Action> {
        self.action_tx.clone()
    }

    pub fn dispatch(&self, action: Action) {
        let _ = self.action_tx.send(action);
    }

    /// Process queued actions until `Quit`.
    pub async fn run(&mut self) {
        while self.running {
            match self.action_rx.recv().await {
                Some(action) => self.handle_action(action),
                None => break,
            }
        }
        info!("Engine stopped");
    }

    /// Wait for and handle exactly one action.
    pub async fn process_next(&mut self) -> bool {
        match self.action_rx.recv().await {
            Some(action) => {
                self.handle_action(action);
                true
            }
            None => false,
        }
    }

    #[tracing::instrument(skip(self, action))]
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::ShowCatalog(query) => self.show_catalog(query),
            Action::LoadMore => {
                if let Some(request) = self.catalog.load_more() {
                    self.spawn_page(request);
                }
            }
            Action::SentinelVisible(event) => {
                if let Some(request) = self.trigger.on_intersection(&event, &mut self.catalog) {
                    self.spawn_page(request);
                }
            }
            Action::PageLoaded { ticket, result } => match self.catalog.apply(ticket, result) {
                MergeOutcome::Merged { .. } => {
                    self.trigger.rebind(&self.catalog);
                }
                MergeOutcome::Failed(error) => {
                    self.notification =
                        Some(Notification::from_fetch_error("Loading catalog", &error));
                }
                MergeOutcome::Stale => {}
            },
            Action::CloseCatalog => {
                self.search_generation += 1;
                self.catalog.reset();
                self.trigger.release();
            }
            Action::SearchInput(text) => self.schedule_search(text),
            Action::SearchSettled { generation, text } => {
                if generation != self.search_generation {
                    debug!(generation, current = self.search_generation, "Search superseded");
                    return;
                }
                if let Some(query) = CatalogQuery::search(&text) {
                    self.show_catalog(query);
                }
            }
            Action::OpenManga(manga_id) => self.open_manga(manga_id),
            Action::MangaLoaded { generation, result } => {
                if generation != self.manga_generation {
                    debug!(generation, "Discarding stale manga details");
                    return;
                }
                match result {
                    Ok((details, chapters)) => {
                        info!(
                            manga_id = %details.entry.id,
                            chapters = chapters.len(),
                            "Manga loaded"
                        );
                        self.session
                            .set_navigation(ChapterNavigationContext::new(chapters));
                        self.details = Some(details);
                    }
                    Err(error) => {
                        self.notification =
                            Some(Notification::from_fetch_error("Loading manga", &error));
                    }
                }
            }
            Action::OpenChapter(chapter_id) => {
                let ticket = self.session.open(&chapter_id);
                self.spawn_chapter(ticket);
            }
            Action::AdvanceChapter(direction) => self.advance(direction),
            Action::ChapterLoaded { ticket, result } => {
                let error = result.as_ref().err().cloned();
                if self.session.apply(&ticket, result) {
                    match error {
                        Some(error) => {
                            self.notification =
                                Some(Notification::from_fetch_error("Opening chapter", &error));
                        }
                        None => self.scroll_target = Some(0.0),
                    }
                }
            }
            Action::ReaderScrolled(metrics) => {
                self.last_metrics = Some(metrics);
                self.session.update_position(&metrics);
            }
            Action::ReaderKey(key) => {
                if let Some(command) = self.keymap.command_for(&key) {
                    self.reader_command(command);
                }
            }
            Action::Reader(command) => self.reader_command(command),
            Action::RetryChapter => {
                if let Some(ticket) = self.session.retry() {
                    self.spawn_chapter(ticket);
                }
            }
            Action::CloseReader => {
                self.session.close();
                self.last_metrics = None;
                self.scroll_target = None;
            }
            Action::ToggleFavorite(entry) => match self.favorites.toggle(&entry) {
                Ok(true) => self.notify_info(format!("Added {} to favorites", entry.title)),
                Ok(false) => self.notify_info(format!("Removed {} from favorites", entry.title)),
                Err(e) => self.notify_error(format!("Failed to update favorites: {:#}", e)),
            },
            Action::AddFavorite(entry) => match self.favorites.add(&entry) {
                Ok(true) => self.notify_info(format!("Added {} to favorites", entry.title)),
                Ok(false) => {}
                Err(e) => self.notify_error(format!("Failed to update favorites: {:#}", e)),
            },
            Action::RemoveFavorite(id) => match self.favorites.remove(&id) {
                Ok(true) => self.notify_info("Removed from favorites"),
                Ok(false) => {}
                Err(e) => self.notify_error(format!("Failed to update favorites: {:#}", e)),
            },
            Action::ClearNotification => self.notification = None,
            Action::Quit => self.running = false,
        }
    }

    /// Switch the catalog to `query`. A search still waiting out its
    /// debounce belongs to the previous view and is dropped.
    fn show_catalog(&mut self, query: CatalogQuery) {
        self.search_generation += 1;
        self.trigger.release();
        let request = self.catalog.start(query.with_page_size(self.page_size));
        self.spawn_page(request);
    }

    fn schedule_search(&mut self, text: String) {
        self.search_generation += 1;
        let generation = self.search_generation;

        if CatalogQuery::search(&text).is_none() {
            // too short to search: fall back to an empty catalog
            self.catalog.reset();
            self.trigger.release();
            return;
        }

        let tx = self.action_tx.clone();
        let debounce = self.search_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = tx.send(Action::SearchSettled { generation, text });
        });
    }

    fn open_manga(&mut self, manga_id: String) {
        self.manga_generation += 1;
        let generation = self.manga_generation;
        self.details = None;

        let source = Arc::clone(&self.source);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = future::try_join(
                source.fetch_manga_details(&manga_id),
                source.fetch_chapters(&manga_id),
            )
            .await;
            let _ = tx.send(Action::MangaLoaded { generation, result });
        });
    }

    fn advance(&mut self, direction: Direction) {
        if let Some(ticket) = self.session.advance(direction) {
            self.spawn_chapter(ticket);
        }
    }

    fn reader_command(&mut self, command: ReaderCommand) {
        match command {
            ReaderCommand::Close => self.handle_action(Action::CloseReader),
            ReaderCommand::NextChapter => self.advance(Direction::Next),
            ReaderCommand::PrevChapter => self.advance(Direction::Prev),
            ReaderCommand::ToggleControls => self.controls_visible = !self.controls_visible,
            ReaderCommand::ScrollForward
            | ReaderCommand::ScrollBack
            | ReaderCommand::Top
            | ReaderCommand::Bottom => {
                if let Some(target) = self
                    .last_metrics
                    .and_then(|metrics| metrics.target_for(command, self.scroll_step))
                {
                    self.scroll_target = Some(target);
                }
            }
        }
    }

    fn spawn_page(&self, request: PageRequest) {
        debug!(
            offset = request.offset,
            limit = request.limit,
            generation = request.ticket.generation(),
            "Fetching catalog page"
        );
        let source = Arc::clone(&self.source);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = source
                .fetch_page(&request.query, request.offset, request.limit)
                .await;
            let _ = tx.send(Action::PageLoaded {
                ticket: request.ticket,
                result,
            });
        });
    }

    fn spawn_chapter(&self, ticket: ChapterTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_chapter_pages(ticket.chapter_id()).await;
            let _ = tx.send(Action::ChapterLoaded { ticket, result });
        });
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::info(message));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::error(message));
    }

    pub fn catalog(&self) -> &PageAccumulator {
        &self.catalog
    }

    pub fn trigger(&self) -> &ScrollTrigger {
        &self.trigger
    }

    pub fn session(&self) -> &ChapterSession {
        &self.session
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn details(&self) -> Option<&MangaDetails> {
        self.details.as_ref()
    }

    /// Current notification, unless it has timed out.
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| !n.should_dismiss())
    }

    /// Offset the reader view should scroll to, consumed once.
    pub fn take_scroll_target(&mut self) -> Option<f64> {
        self.scroll_target.take()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::chapter_session::SessionState;
    use crate::internal::models::{PublicationStatus, SortKey};
    use crate::internal::notification::NotificationType;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `total` entries per query, ids prefixed by the sort key.
    struct FakeCatalog {
        total: usize,
        page_calls: AtomicUsize,
        fail_chapter: Option<String>,
    }

    impl FakeCatalog {
        fn new(total: usize) -> Self {
            Self {
                total,
                page_calls: AtomicUsize::new(0),
                fail_chapter: None,
            }
        }
    }

    fn entry(id: String) -> CatalogEntry {
        CatalogEntry {
            title: format!("Title {id}"),
            id,
            cover: None,
            status: PublicationStatus::Ongoing,
            rating: None,
            tags: vec![],
        }
    }

    fn summary(id: &str, number: &str) -> ChapterSummary {
        ChapterSummary {
            id: id.to_string(),
            number: Some(number.to_string()),
            volume: None,
            title: None,
            pages: 2,
            published_at: None,
            group: "Unknown Group".to_string(),
        }
    }

    impl CatalogSource for FakeCatalog {
        fn fetch_page(
            &self,
            query: &CatalogQuery,
            offset: usize,
            limit: usize,
        ) -> impl Future<Output = Result<Vec<CatalogEntry>, FetchError>> + Send {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            let end = (offset + limit).min(self.total);
            let page = (offset..end)
                .map(|i| entry(format!("{}-{i}", query.sort())))
                .collect();
            async move { Ok(page) }
        }

        fn fetch_manga_details(
            &self,
            manga_id: &str,
        ) -> impl Future<Output = Result<MangaDetails, FetchError>> + Send {
            future::ready(Ok(MangaDetails {
                entry: entry(manga_id.to_string()),
                description: None,
                year: None,
                authors: vec![],
                artists: vec![],
            }))
        }

        fn fetch_chapters(
            &self,
            _manga_id: &str,
        ) -> impl Future<Output = Result<Vec<ChapterSummary>, FetchError>> + Send {
            let chapters = vec![summary("c1", "1"), summary("c3", "3"), summary("c2", "2")];
            async move { Ok(chapters) }
        }

        fn fetch_chapter_pages(
            &self,
            chapter_id: &str,
        ) -> impl Future<Output = Result<ChapterPageSet, FetchError>> + Send {
            let result = match &self.fail_chapter {
                Some(failing) if failing == chapter_id => {
                    Err(FetchError::Network("connection reset".to_string()))
                }
                _ => Ok(ChapterPageSet {
                    chapter_id: chapter_id.to_string(),
                    urls: vec![
                        format!("https://cdn/x/data/{chapter_id}/1.png"),
                        format!("https://cdn/x/data/{chapter_id}/2.png"),
                    ],
                }),
            };
            async move { result }
        }
    }

    fn engine(source: FakeCatalog) -> Engine<FakeCatalog> {
        Engine::new(source, FavoritesStore::in_memory(), &ReaderConfig::default())
            .with_search_debounce(Duration::from_millis(10))
    }

    async fn pump(engine: &mut Engine<FakeCatalog>, steps: usize) {
        for _ in 0..steps {
            assert!(engine.process_next().await);
        }
    }

    async fn pump_until<F>(engine: &mut Engine<FakeCatalog>, done: F)
    where
        F: Fn(&Engine<FakeCatalog>) -> bool,
    {
        for _ in 0..50 {
            if done(engine) {
                return;
            }
            tokio::time::timeout(Duration::from_secs(2), engine.process_next())
                .await
                .expect("engine stalled");
        }
        panic!("condition not reached");
    }

    fn visible(engine: &Engine<FakeCatalog>) -> Action {
        Action::SentinelVisible(IntersectionEvent {
            sentinel: engine.trigger().observed().cloned().unwrap(),
            is_intersecting: true,
        })
    }

    #[tokio::test]
    async fn catalog_scrolls_to_exhaustion() {
        let mut engine = engine(FakeCatalog::new(240));
        engine.dispatch(Action::ShowCatalog(CatalogQuery::latest()));
        pump(&mut engine, 2).await;
        assert_eq!(engine.catalog().items().len(), 100);

        for expected in [200, 240] {
            engine.dispatch(visible(&engine));
            pump(&mut engine, 2).await;
            assert_eq!(engine.catalog().items().len(), expected);
        }
        assert!(engine.catalog().is_exhausted());

        // the sentinel stays visible but nothing more is fetched
        engine.dispatch(visible(&engine));
        engine.dispatch(Action::LoadMore);
        pump(&mut engine, 2).await;
        assert_eq!(engine.source.page_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn repeated_intersections_fetch_once() {
        let mut engine = engine(FakeCatalog::new(1_000));
        engine.dispatch(Action::ShowCatalog(CatalogQuery::latest()));
        pump(&mut engine, 2).await;

        let event = visible(&engine);
        engine.dispatch(event.clone());
        engine.dispatch(event.clone());
        engine.dispatch(Action::LoadMore);
        pump(&mut engine, 3).await;
        assert!(engine.catalog().is_in_flight());

        pump(&mut engine, 1).await;
        assert_eq!(engine.catalog().items().len(), 200);
        assert_eq!(engine.source.page_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn query_switch_drops_late_page() {
        let mut engine = engine(FakeCatalog::new(50));
        engine.dispatch(Action::ShowCatalog(CatalogQuery::latest()));
        engine.dispatch(Action::ShowCatalog(CatalogQuery::trending()));
        pump(&mut engine, 4).await;

        let items = engine.catalog().items();
        assert_eq!(items.len(), 50);
        assert!(items.iter().all(|e| e.id.starts_with("trending-")));
    }

    #[tokio::test]
    async fn debounced_search_uses_latest_text() {
        let mut engine = engine(FakeCatalog::new(5));
        engine.dispatch(Action::SearchInput("so".to_string()));
        engine.dispatch(Action::SearchInput("solo".to_string()));

        pump_until(&mut engine, |e| !e.catalog().items().is_empty()).await;
        let query = engine.catalog().query().unwrap();
        assert_eq!(query.title(), Some("solo"));
        assert_eq!(engine.source.page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn category_choice_cancels_pending_search() {
        let mut engine = engine(FakeCatalog::new(5));
        engine.dispatch(Action::SearchInput("solo".to_string()));
        pump(&mut engine, 1).await;
        engine.dispatch(Action::ShowCatalog(CatalogQuery::trending()));
        pump(&mut engine, 2).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        // the settled search is queued by now and must be discarded
        pump(&mut engine, 1).await;

        let query = engine.catalog().query().unwrap();
        assert_eq!(query.sort(), SortKey::Trending);
        assert_eq!(query.title(), None);
        assert_eq!(engine.source.page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn configured_page_size_applies_to_catalog() {
        let mut config = AppConfig::default();
        config.api.page_size = 30;
        let mut configured =
            Engine::from_config(FakeCatalog::new(70), FavoritesStore::in_memory(), &config);

        configured.dispatch(Action::ShowCatalog(CatalogQuery::latest()));
        pump(&mut configured, 2).await;
        assert_eq!(
            configured.catalog().query().map(CatalogQuery::page_size),
            Some(30)
        );
        assert_eq!(configured.catalog().items().len(), 30);

        configured.dispatch(Action::LoadMore);
        pump(&mut configured, 2).await;
        assert_eq!(configured.catalog().items().len(), 60);
        assert!(!configured.catalog().is_exhausted());

        let oversized = engine(FakeCatalog::new(0)).with_page_size(500);
        assert_eq!(oversized.page_size, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn short_search_clears_catalog() {
        let mut engine = engine(FakeCatalog::new(5));
        engine.dispatch(Action::ShowCatalog(CatalogQuery::latest()));
        pump(&mut engine, 2).await;
        engine.dispatch(Action::SearchInput("s".to_string()));
        pump(&mut engine, 1).await;
        assert!(engine.catalog().items().is_empty());
        assert!(engine.catalog().query().is_none());
        assert!(engine.trigger().observed().is_none());
    }

    #[tokio::test]
    async fn reader_flow_with_navigation() {
        let mut engine = engine(FakeCatalog::new(0));
        engine.dispatch(Action::OpenManga("m1".to_string()));
        pump(&mut engine, 2).await;
        assert_eq!(engine.details().map(|d| d.entry.id.as_str()), Some("m1"));

        engine.dispatch(Action::OpenChapter("c2".to_string()));
        pump(&mut engine, 2).await;
        assert_eq!(
            engine.session().pages().map(|p| p.urls[0].as_str()),
            Some("https://cdn/x/data/c2/1.png")
        );
        assert_eq!(engine.take_scroll_target(), Some(0.0));

        engine.dispatch(Action::ReaderScrolled(ScrollMetrics::new(900.0, 2_000.0, 500.0)));
        pump(&mut engine, 1).await;
        assert_eq!(engine.session().position(), Some(1));

        engine.dispatch(Action::Reader(ReaderCommand::ScrollBack));
        pump(&mut engine, 1).await;
        assert_eq!(engine.take_scroll_target(), Some(500.0));

        engine.dispatch(Action::ReaderKey(KeyEvent::new(
            KeyCode::Char('n'),
            KeyModifiers::empty(),
        )));
        pump(&mut engine, 2).await;
        assert_eq!(engine.session().current_chapter_id(), Some("c1"));

        // c1 is the last chapter
        engine.dispatch(Action::AdvanceChapter(Direction::Next));
        pump(&mut engine, 1).await;
        assert_eq!(engine.session().current_chapter_id(), Some("c1"));
        assert!(engine.session().pages().is_some());

        engine.dispatch(Action::AdvanceChapter(Direction::Prev));
        pump(&mut engine, 2).await;
        assert_eq!(engine.session().current_chapter_id(), Some("c2"));

        engine.dispatch(Action::ReaderKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::empty())));
        pump(&mut engine, 1).await;
        assert_eq!(engine.session().state(), &SessionState::Idle);

        // chapter keys do nothing once the reader is closed
        engine.dispatch(Action::ReaderKey(KeyEvent::new(
            KeyCode::Char('n'),
            KeyModifiers::empty(),
        )));
        engine.dispatch(Action::AdvanceChapter(Direction::Prev));
        pump(&mut engine, 2).await;
        assert_eq!(engine.session().state(), &SessionState::Idle);
        assert!(engine.session().pending().is_none());
    }

    #[tokio::test]
    async fn failed_chapter_notifies_and_retries() {
        let mut source = FakeCatalog::new(0);
        source.fail_chapter = Some("bad".to_string());
        let mut engine = engine(source);

        engine.dispatch(Action::OpenChapter("bad".to_string()));
        pump(&mut engine, 2).await;
        assert!(engine.session().error().is_some());
        let note = engine.notification().unwrap();
        assert_eq!(note.notification_type(), NotificationType::Error);

        engine.dispatch(Action::RetryChapter);
        pump(&mut engine, 2).await;
        assert!(matches!(engine.session().state(), SessionState::Failed { .. }));

        engine.dispatch(Action::ClearNotification);
        pump(&mut engine, 1).await;
        assert!(engine.notification().is_none());
    }

    #[tokio::test]
    async fn favorites_toggle_through_actions() {
        let mut engine = engine(FakeCatalog::new(0));
        let favorite = entry("m1".to_string());

        engine.dispatch(Action::AddFavorite(favorite.clone()));
        engine.dispatch(Action::AddFavorite(favorite.clone()));
        pump(&mut engine, 2).await;
        assert_eq!(engine.favorites().list().len(), 1);

        engine.dispatch(Action::ToggleFavorite(favorite.clone()));
        pump(&mut engine, 1).await;
        assert!(!engine.favorites().contains("m1"));

        engine.dispatch(Action::ToggleFavorite(favorite));
        engine.dispatch(Action::RemoveFavorite("m1".to_string()));
        pump(&mut engine, 2).await;
        assert!(engine.favorites().is_empty());
    }

    #[tokio::test]
    async fn quit_stops_run_loop() {
        let mut engine = engine(FakeCatalog::new(0));
        engine.dispatch(Action::Quit);
        engine.run().await;
        assert!(!engine.is_running());
    }
}
