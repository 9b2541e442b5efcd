//! Raw response shapes of the catalog API and their conversion into the
//! internal models. Nothing outside this module sees an unvalidated record.

use serde::Deserialize;
use serde_json::Value;

use crate::api::FetchError;
use crate::internal::models::{
    CatalogEntry, ChapterPageSet, ChapterSummary, CoverRef, MangaDetails, PublicationStatus,
};
use crate::utils::datetime::parse_api_timestamp;
use crate::utils::url::{PageQuality, page_url};

pub(crate) const PREFERRED_LANGUAGE: &str = "en";
pub(crate) const UNKNOWN_GROUP: &str = "Unknown Group";
const UNTITLED: &str = "Untitled";

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntityResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawManga {
    id: Option<String>,
    attributes: Option<RawMangaAttributes>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawMangaAttributes {
    #[serde(default)]
    title: Value,
    #[serde(default, rename = "altTitles")]
    alt_titles: Vec<Value>,
    #[serde(default)]
    description: Value,
    status: Option<String>,
    year: Option<i64>,
    rating: Option<RawRating>,
    #[serde(default)]
    tags: Vec<RawTag>,
}

/// Ratings arrive either as a bare score or as a statistics object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRating {
    Score(f32),
    Stats {
        average: Option<f32>,
        bayesian: Option<f32>,
    },
}

impl RawRating {
    fn score(&self) -> Option<f32> {
        let score = match self {
            Self::Score(score) => Some(*score),
            Self::Stats { average, bayesian } => average.or(*bayesian),
        };
        score.filter(|score| score.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct RawTag {
    attributes: Option<RawTagAttributes>,
}

#[derive(Debug, Deserialize)]
struct RawTagAttributes {
    #[serde(default)]
    name: Value,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    #[serde(rename = "type")]
    kind: String,
    attributes: Option<Value>,
}

impl RawRelationship {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawChapter {
    id: Option<String>,
    attributes: Option<RawChapterAttributes>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawChapterAttributes {
    chapter: Option<String>,
    volume: Option<String>,
    title: Option<String>,
    #[serde(default)]
    pages: u32,
    #[serde(rename = "publishAt")]
    publish_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawManifest {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    chapter: Option<RawManifestChapter>,
}

#[derive(Debug, Deserialize)]
struct RawManifestChapter {
    hash: Option<String>,
    data: Option<Vec<String>>,
    #[serde(rename = "dataSaver")]
    data_saver: Option<Vec<String>>,
}

/// Pick a localized string: the preferred language when present and
/// non-empty, otherwise the first non-empty value in document order.
/// Empty localized maps come through as `[]`, which yields `None`.
pub(crate) fn localized(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    let text = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    map.get(PREFERRED_LANGUAGE)
        .and_then(text)
        .or_else(|| map.values().find_map(text))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn require_id(id: Option<String>, what: &str) -> Result<String, FetchError> {
    non_empty(id).ok_or_else(|| FetchError::Malformed(format!("{what} record without id")))
}

impl RawManga {
    /// Validate and flatten into a catalog entry.
    pub(crate) fn into_entry(self) -> Result<CatalogEntry, FetchError> {
        self.into_details().map(|details| details.entry)
    }

    pub(crate) fn into_details(self) -> Result<MangaDetails, FetchError> {
        let id = require_id(self.id, "manga")?;
        let attributes = self
            .attributes
            .ok_or_else(|| FetchError::Malformed(format!("manga {id} without attributes")))?;

        let title = localized(&attributes.title)
            .or_else(|| {
                // Prefer an English alt title over an arbitrary one
                let english = attributes.alt_titles.iter().find_map(|alt| {
                    alt.get(PREFERRED_LANGUAGE)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
                english.or_else(|| attributes.alt_titles.iter().find_map(localized))
            })
            .unwrap_or_else(|| UNTITLED.to_string());

        let cover = self
            .relationships
            .iter()
            .find(|rel| rel.kind == "cover_art")
            .and_then(|rel| rel.attribute("fileName"))
            .map(|file_name| CoverRef {
                manga_id: id.clone(),
                file_name: file_name.to_string(),
            });

        let names_of = |kind: &str| -> Vec<String> {
            self.relationships
                .iter()
                .filter(|rel| rel.kind == kind)
                .filter_map(|rel| rel.attribute("name"))
                .map(str::to_string)
                .collect()
        };

        let tags = attributes
            .tags
            .iter()
            .filter_map(|tag| tag.attributes.as_ref())
            .filter_map(|attrs| localized(&attrs.name))
            .collect();

        let entry = CatalogEntry {
            title,
            cover,
            status: PublicationStatus::from_api(attributes.status.as_deref()),
            rating: attributes.rating.as_ref().and_then(RawRating::score),
            tags,
            id,
        };

        Ok(MangaDetails {
            description: localized(&attributes.description),
            year: attributes.year.and_then(|y| u16::try_from(y).ok()),
            authors: names_of("author"),
            artists: names_of("artist"),
            entry,
        })
    }
}

impl RawChapter {
    pub(crate) fn into_summary(self) -> Result<ChapterSummary, FetchError> {
        let id = require_id(self.id, "chapter")?;
        let attributes = self
            .attributes
            .ok_or_else(|| FetchError::Malformed(format!("chapter {id} without attributes")))?;

        let group = self
            .relationships
            .iter()
            .find(|rel| rel.kind == "scanlation_group")
            .and_then(|rel| rel.attribute("name"))
            .unwrap_or(UNKNOWN_GROUP)
            .to_string();

        Ok(ChapterSummary {
            id,
            number: non_empty(attributes.chapter),
            volume: non_empty(attributes.volume),
            title: non_empty(attributes.title),
            pages: attributes.pages,
            published_at: attributes
                .publish_at
                .as_deref()
                .and_then(parse_api_timestamp),
            group,
        })
    }
}

impl RawManifest {
    /// Compose `{baseUrl}/{data|data-saver}/{hash}/{file}` for every page, in
    /// manifest order.
    pub(crate) fn into_page_set(
        self,
        chapter_id: &str,
        quality: PageQuality,
    ) -> Result<ChapterPageSet, FetchError> {
        let missing =
            |field: &str| FetchError::Malformed(format!("manifest for {chapter_id} missing {field}"));

        let base_url = non_empty(self.base_url).ok_or_else(|| missing("baseUrl"))?;
        let chapter = self.chapter.ok_or_else(|| missing("chapter"))?;
        let hash = non_empty(chapter.hash).ok_or_else(|| missing("chapter.hash"))?;
        let files = match quality {
            PageQuality::Data => chapter.data.ok_or_else(|| missing("chapter.data"))?,
            PageQuality::DataSaver => chapter
                .data_saver
                .ok_or_else(|| missing("chapter.dataSaver"))?,
        };

        Ok(ChapterPageSet {
            chapter_id: chapter_id.to_string(),
            urls: files
                .iter()
                .map(|file| page_url(&base_url, quality, &hash, file))
                .collect(),
        })
    }
}
