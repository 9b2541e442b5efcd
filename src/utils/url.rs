use serde::{Deserialize, Serialize};

pub const COVER_CDN_BASE_URL: &str = "https://uploads.mangadex.org/covers";

/// Cover variants served by the CDN. Thumbnails are pre-rendered JPEGs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverSize {
    #[default]
    Original,
    Thumb256,
    Thumb512,
}

impl CoverSize {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Original => "",
            Self::Thumb256 => ".256.jpg",
            Self::Thumb512 => ".512.jpg",
        }
    }
}

/// Which image set of a page manifest to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageQuality {
    #[default]
    Data,
    DataSaver,
}

impl PageQuality {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::DataSaver => "data-saver",
        }
    }
}

/// `{cdn}/{manga_id}/{file_name}[size suffix]`
pub fn cover_url(cdn_base: &str, manga_id: &str, file_name: &str, size: CoverSize) -> String {
    format!(
        "{}/{}/{}{}",
        cdn_base.trim_end_matches('/'),
        manga_id,
        file_name,
        size.suffix()
    )
}

/// `{base}/data/{hash}/{file}` (or `data-saver`).
pub fn page_url(base_url: &str, quality: PageQuality, hash: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        quality.path_segment(),
        hash,
        file_name
    )
}
