pub mod error;
mod wire;

pub use error::FetchError;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::internal::cache::Cache;
use crate::internal::models::{
    CatalogEntry, CatalogQuery, ChapterPageSet, ChapterSummary, MAX_PAGE_SIZE, MangaDetails,
};
use wire::{EntityResponse, ListResponse, RawChapter, RawManga, RawManifest};

/// Relationships embedded in every catalog and details response so covers,
/// authors and artists arrive in the same round trip.
const MANGA_INCLUDES: &[&str] = &["cover_art", "author", "artist"];
const FEED_INCLUDES: &[&str] = &["scanlation_group"];
const MAX_FEED_PAGE_SIZE: usize = 500;

/// Everything the engine needs from the catalog. Implemented by
/// [`CatalogClient`] and by in-memory fakes in tests.
pub trait CatalogSource: Send + Sync + 'static {
    /// One page of a catalog listing, already normalized.
    fn fetch_page(
        &self,
        query: &CatalogQuery,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, FetchError>> + Send;

    fn fetch_manga_details(
        &self,
        manga_id: &str,
    ) -> impl Future<Output = Result<MangaDetails, FetchError>> + Send;

    /// The complete chapter feed of a work, newest first.
    fn fetch_chapters(
        &self,
        manga_id: &str,
    ) -> impl Future<Output = Result<Vec<ChapterSummary>, FetchError>> + Send;

    /// Resolve a chapter's page manifest into image URLs.
    fn fetch_chapter_pages(
        &self,
        chapter_id: &str,
    ) -> impl Future<Output = Result<ChapterPageSet, FetchError>> + Send;
}

/// HTTP client for the MangaDex-style catalog API.
///
/// Requests are never retried here; every failure is mapped onto
/// [`FetchError`] and handed back. Details and chapter lists are memoized per
/// manga id for `cache_ttl_secs`; page manifests are always fetched fresh.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    config: ApiConfig,
    details_cache: Cache<String, MangaDetails>,
    chapters_cache: Cache<String, Vec<ChapterSummary>>,
}

impl CatalogClient {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Ok(Self {
            client,
            details_cache: Cache::new(ttl),
            chapters_cache: Cache::new(ttl),
            config,
        })
    }

    /// Point the client at another API host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Query parameters for one catalog page, in the order they are sent.
    ///
    /// Content rating and original language constraints are always attached.
    /// An empty tag set adds no tag filter at all.
    pub fn catalog_params(
        &self,
        query: &CatalogQuery,
        offset: usize,
        limit: usize,
    ) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(title) = query.title() {
            params.push(("title".to_string(), title.to_string()));
        }
        for tag in query.tags() {
            params.push(("includedTags[]".to_string(), tag.clone()));
        }
        for rating in &self.config.content_ratings {
            params.push(("contentRating[]".to_string(), rating.clone()));
        }
        for language in &self.config.original_languages {
            params.push(("originalLanguage[]".to_string(), language.clone()));
        }
        let sort = query.sort();
        params.push((
            format!("order[{}]", sort.api_field()),
            sort.direction().to_string(),
        ));
        params.push(("limit".to_string(), limit.clamp(1, MAX_PAGE_SIZE).to_string()));
        params.push(("offset".to_string(), offset.to_string()));
        for include in MANGA_INCLUDES {
            params.push(("includes[]".to_string(), include.to_string()));
        }
        params.push(("hasAvailableChapters".to_string(), "true".to_string()));
        params
    }

    fn feed_params(&self, offset: usize, limit: usize) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .config
            .translated_languages
            .iter()
            .map(|language| ("translatedLanguage[]".to_string(), language.clone()))
            .collect();
        params.push(("order[chapter]".to_string(), "desc".to_string()));
        params.push(("limit".to_string(), limit.to_string()));
        params.push(("offset".to_string(), offset.to_string()));
        for include in FEED_INCLUDES {
            params.push(("includes[]".to_string(), include.to_string()));
        }
        params
    }

    /// GET `path` and decode the JSON body, mapping statuses onto the error
    /// taxonomy. `what` names the resource in error messages.
    async fn get_json<T>(
        &self,
        path: &str,
        params: &[(String, String)],
        what: &str,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let resp = self.client.get(&url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            warn!(%status, %url, retry_after, "Catalog API request failed");
            return Err(FetchError::from_status(status, retry_after, what));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(format!("{what}: {e}")))
    }

    /// One page of the catalog for `query`.
    #[tracing::instrument(skip(self, query), fields(query = %query))]
    pub async fn search_manga(
        &self,
        query: &CatalogQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, FetchError> {
        let params = self.catalog_params(query, offset, limit);
        let response: ListResponse<RawManga> =
            self.get_json("/manga", &params, "catalog page").await?;

        debug!(
            returned = response.data.len(),
            total = response.total,
            "Fetched catalog page"
        );
        response
            .data
            .into_iter()
            .map(RawManga::into_entry)
            .collect()
    }

    #[tracing::instrument(skip(self))]
    pub async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, FetchError> {
        let key = manga_id.to_string();
        if let Some(details) = self.details_cache.get(&key) {
            debug!("Manga details served from cache");
            return Ok(details);
        }

        let params: Vec<(String, String)> = MANGA_INCLUDES
            .iter()
            .map(|include| ("includes[]".to_string(), include.to_string()))
            .collect();
        let response: EntityResponse<RawManga> = self
            .get_json(
                &format!("/manga/{manga_id}"),
                &params,
                &format!("manga {manga_id}"),
            )
            .await?;

        let details = response.data.into_details()?;
        self.details_cache.set(key, details.clone());
        Ok(details)
    }

    /// Walk the chapter feed on offset until a short page comes back.
    #[tracing::instrument(skip(self))]
    pub async fn chapter_feed(&self, manga_id: &str) -> Result<Vec<ChapterSummary>, FetchError> {
        let key = manga_id.to_string();
        if let Some(chapters) = self.chapters_cache.get(&key) {
            debug!("Chapter feed served from cache");
            return Ok(chapters);
        }

        let limit = self.config.feed_page_size.clamp(1, MAX_FEED_PAGE_SIZE);
        let path = format!("/manga/{manga_id}/feed");
        let what = format!("chapter feed for {manga_id}");
        let mut chapters = Vec::new();
        let mut offset = 0;

        loop {
            let params = self.feed_params(offset, limit);
            let response: ListResponse<RawChapter> = self.get_json(&path, &params, &what).await?;
            let returned = response.data.len();
            for raw in response.data {
                chapters.push(raw.into_summary()?);
            }
            debug!(offset, returned, "Fetched chapter feed page");
            if returned < limit {
                break;
            }
            offset += limit;
        }

        info!(count = chapters.len(), "Loaded chapter feed");
        self.chapters_cache.set(key, chapters.clone());
        Ok(chapters)
    }

    /// Resolve the page manifest for a chapter. Never cached.
    #[tracing::instrument(skip(self))]
    pub async fn chapter_manifest(&self, chapter_id: &str) -> Result<ChapterPageSet, FetchError> {
        let manifest: RawManifest = self
            .get_json(
                &format!("/at-home/server/{chapter_id}"),
                &[],
                &format!("chapter {chapter_id}"),
            )
            .await?;
        let pages = manifest.into_page_set(chapter_id, self.config.page_quality)?;
        debug!(pages = pages.total(), "Resolved chapter manifest");
        Ok(pages)
    }

    /// Drop memoized details and chapters for a work.
    pub fn invalidate(&self, manga_id: &str) {
        let key = manga_id.to_string();
        self.details_cache.invalidate(&key);
        self.chapters_cache.invalidate(&key);
    }
}

impl CatalogSource for CatalogClient {
    fn fetch_page(
        &self,
        query: &CatalogQuery,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, FetchError>> + Send {
        self.search_manga(query, offset, limit)
    }

    fn fetch_manga_details(
        &self,
        manga_id: &str,
    ) -> impl Future<Output = Result<MangaDetails, FetchError>> + Send {
        self.manga_details(manga_id)
    }

    fn fetch_chapters(
        &self,
        manga_id: &str,
    ) -> impl Future<Output = Result<Vec<ChapterSummary>, FetchError>> + Send {
        self.chapter_feed(manga_id)
    }

    fn fetch_chapter_pages(
        &self,
        chapter_id: &str,
    ) -> impl Future<Output = Result<ChapterPageSet, FetchError>> + Send {
        self.chapter_manifest(chapter_id)
    }
}
