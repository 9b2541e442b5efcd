use std::collections::BTreeSet;
use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::utils::url::{CoverSize, cover_url};

/// Largest page the catalog API will serve in one request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Searches shorter than this are not sent to the API.
pub const MIN_SEARCH_LEN: usize = 2;

/// Ordering applied to a catalog listing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Latest,
    Trending,
    Rating,
    Title,
    Relevance,
}

impl SortKey {
    /// Field name used inside the API's `order[...]` parameter.
    pub fn api_field(&self) -> &'static str {
        match self {
            Self::Latest => "updatedAt",
            Self::Trending => "followedCount",
            Self::Rating => "rating",
            Self::Title => "title",
            Self::Relevance => "relevance",
        }
    }

    /// Alphabetical order runs A to Z; every other sort puts the highest
    /// value first.
    pub fn direction(&self) -> &'static str {
        match self {
            Self::Title => "asc",
            _ => "desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Latest => "Latest Updates",
            Self::Trending => "Trending",
            Self::Rating => "Top Rated",
            Self::Title => "Alphabetical",
            Self::Relevance => "Best Match",
        }
    }
}

/// What a catalog view asks for. Immutable once built; a different query means
/// a fresh accumulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogQuery {
    tags: BTreeSet<String>,
    sort: SortKey,
    page_size: usize,
    title: Option<String>,
}

impl CatalogQuery {
    /// `page_size` is clamped into `1..=MAX_PAGE_SIZE`.
    pub fn new<I, T>(tags: I, sort: SortKey, page_size: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            sort,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            title: None,
        }
    }

    pub fn latest() -> Self {
        Self::new(Vec::<String>::new(), SortKey::Latest, MAX_PAGE_SIZE)
    }

    pub fn trending() -> Self {
        Self::new(Vec::<String>::new(), SortKey::Trending, MAX_PAGE_SIZE)
    }

    pub fn by_tags<I, T>(tags: I, sort: SortKey) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(tags, sort, MAX_PAGE_SIZE)
    }

    /// Title search ordered by relevance. `None` when the text is too short to
    /// be worth a request.
    pub fn search(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.chars().count() < MIN_SEARCH_LEN {
            return None;
        }
        Some(Self {
            title: Some(text.to_string()),
            ..Self::new(Vec::<String>::new(), SortKey::Relevance, MAX_PAGE_SIZE)
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.tags.is_empty() && self.title.is_none()
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort={} limit={}", self.sort, self.page_size)?;
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, " tags={}", tags.join(","))?;
        }
        if let Some(title) = &self.title {
            write!(f, " title={title:?}")?;
        }
        Ok(())
    }
}

/// Publication status as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PublicationStatus {
    pub fn from_api(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("ongoing") => Self::Ongoing,
            Some("completed") => Self::Completed,
            Some("hiatus") => Self::Hiatus,
            Some("cancelled") => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

/// Enough to build a cover URL later; no request is needed to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverRef {
    pub manga_id: String,
    pub file_name: String,
}

impl CoverRef {
    pub fn url(&self, cdn_base: &str, size: CoverSize) -> String {
        cover_url(cdn_base, &self.manga_id, &self.file_name, size)
    }
}

/// A normalized catalog work. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub cover: Option<CoverRef>,
    pub status: PublicationStatus,
    /// `None` means unrated, which is not the same as a score of zero.
    pub rating: Option<f32>,
    pub tags: Vec<String>,
}

impl CatalogEntry {
    pub fn rating_label(&self) -> String {
        match self.rating {
            Some(score) => format!("{score:.1}"),
            None => "N/A".to_string(),
        }
    }
}

/// Everything the details view shows for a single work.
#[derive(Debug, Clone, PartialEq)]
pub struct MangaDetails {
    pub entry: CatalogEntry,
    pub description: Option<String>,
    pub year: Option<u16>,
    pub authors: Vec<String>,
    pub artists: Vec<String>,
}

/// One row of a work's chapter feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSummary {
    pub id: String,
    /// Chapter number as published; may be fractional ("12.5") or absent for oneshots.
    pub number: Option<String>,
    pub volume: Option<String>,
    pub title: Option<String>,
    pub pages: u32,
    pub published_at: Option<Timestamp>,
    pub group: String,
}

impl ChapterSummary {
    pub fn numeric(&self) -> Option<f64> {
        self.number
            .as_deref()
            .and_then(|n| n.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
    }

    pub fn label(&self) -> String {
        match &self.number {
            Some(number) => format!("Chapter {number}"),
            None => "Oneshot".to_string(),
        }
    }
}

/// Image references for every page of one chapter, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPageSet {
    pub chapter_id: String,
    pub urls: Vec<String>,
}

impl ChapterPageSet {
    pub fn total(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// URL for a 0-based page index.
    pub fn page(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn sort_key_api_fields() {
        assert_eq!(SortKey::Latest.api_field(), "updatedAt");
        assert_eq!(SortKey::Trending.api_field(), "followedCount");
        assert_eq!(SortKey::Rating.api_field(), "rating");
        assert_eq!(SortKey::Title.api_field(), "title");
        assert_eq!(SortKey::Title.direction(), "asc");
        assert_eq!(SortKey::Latest.direction(), "desc");
    }

    #[test]
    fn sort_key_parses_from_ui_ids() {
        for key in SortKey::iter() {
            assert_eq!(SortKey::from_str(&key.to_string()).unwrap(), key);
        }
        assert_eq!(SortKey::from_str("Trending").unwrap(), SortKey::Trending);
        assert!(SortKey::from_str("popularity").is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        let q = CatalogQuery::new(["a"], SortKey::Latest, 0);
        assert_eq!(q.page_size(), 1);
        let q = CatalogQuery::new(["a"], SortKey::Latest, 500);
        assert_eq!(q.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn tag_order_does_not_change_identity() {
        let a = CatalogQuery::by_tags(["x", "y"], SortKey::Rating);
        let b = CatalogQuery::by_tags(["y", "x"], SortKey::Rating);
        assert_eq!(a, b);
        assert_ne!(a, CatalogQuery::by_tags(["x", "y"], SortKey::Latest));
    }

    #[test]
    fn search_requires_two_characters() {
        assert!(CatalogQuery::search(" a ").is_none());
        let q = CatalogQuery::search(" solo ").unwrap();
        assert_eq!(q.title(), Some("solo"));
        assert_eq!(q.sort(), SortKey::Relevance);
        assert!(!q.is_unfiltered());
    }

    #[test]
    fn status_from_api() {
        assert_eq!(
            PublicationStatus::from_api(Some("completed")),
            PublicationStatus::Completed
        );
        assert_eq!(
            PublicationStatus::from_api(Some("weird")),
            PublicationStatus::Unknown
        );
        assert_eq!(PublicationStatus::from_api(None), PublicationStatus::Unknown);
    }

    #[test]
    fn chapter_numeric_and_label() {
        let mut chapter = ChapterSummary {
            id: "c".into(),
            number: Some("12.5".into()),
            volume: None,
            title: None,
            pages: 20,
            published_at: None,
            group: "Unknown Group".into(),
        };
        assert_eq!(chapter.numeric(), Some(12.5));
        assert_eq!(chapter.label(), "Chapter 12.5");
        chapter.number = None;
        assert_eq!(chapter.numeric(), None);
        assert_eq!(chapter.label(), "Oneshot");
    }

    #[test]
    fn rating_label_distinguishes_unrated() {
        let mut entry = CatalogEntry {
            id: "m".into(),
            title: "t".into(),
            cover: None,
            status: PublicationStatus::Unknown,
            rating: None,
            tags: vec![],
        };
        assert_eq!(entry.rating_label(), "N/A");
        entry.rating = Some(0.0);
        assert_eq!(entry.rating_label(), "0.0");
    }
}
