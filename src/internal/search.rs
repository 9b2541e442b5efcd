use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::models::ChapterSummary;

/// Search type - how to interpret the filter text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchType {
    #[default]
    Literal,
    Regex,
}

impl SearchType {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Literal => Self::Regex,
            Self::Regex => Self::Literal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "Literal",
            Self::Regex => "Regex",
        }
    }
}

/// Narrows a chapter list by chapter number, title or scanlation group.
#[derive(Debug, Clone, Default)]
pub struct ChapterFilter {
    pub text: String,
    pub search_type: SearchType,
    compiled_regex: Option<Regex>,
    pub regex_error: Option<String>,
}

impl ChapterFilter {
    pub fn new(text: impl Into<String>, search_type: SearchType) -> Self {
        let text = text.into();
        let (compiled_regex, regex_error) = match search_type {
            SearchType::Regex => match RegexBuilder::new(&text).case_insensitive(true).build() {
                Ok(re) => (Some(re), None),
                Err(e) => (None, Some(format!("Regex error: {}", e))),
            },
            SearchType::Literal => (None, None),
        };

        Self {
            text,
            search_type,
            compiled_regex,
            regex_error,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(text, SearchType::Literal)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// An empty filter matches everything; an invalid regex matches nothing.
    pub fn matches(&self, chapter: &ChapterSummary) -> bool {
        if self.is_empty() {
            return true;
        }
        let fields = [
            chapter.number.as_deref(),
            chapter.title.as_deref(),
            Some(chapter.group.as_str()),
        ];
        fields.into_iter().flatten().any(|field| self.matches_text(field))
    }

    fn matches_text(&self, text: &str) -> bool {
        match self.search_type {
            SearchType::Literal => text
                .to_lowercase()
                .contains(&self.text.trim().to_lowercase()),
            SearchType::Regex => match &self.compiled_regex {
                Some(re) => re.is_match(text),
                None => false,
            },
        }
    }

    /// Matching chapters, preserving the input order.
    pub fn apply<'a>(&self, chapters: &'a [ChapterSummary]) -> Vec<&'a ChapterSummary> {
        chapters.iter().filter(|c| self.matches(c)).collect()
    }
}
