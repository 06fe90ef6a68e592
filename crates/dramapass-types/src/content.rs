//! Serialized video content types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Content slug of the form `<series>_part_<n>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentSlug(pub String);

impl ContentSlug {
    const PART_MARKER: &'static str = "_part_";
    const MAX_LEN: usize = 200;

    /// Build the slug for a series part
    pub fn new(series: &str, part: u32) -> Self {
        Self(format!("{series}{}{part}", Self::PART_MARKER))
    }

    /// Validate a slug received from a deep link or callback
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if s.len() > Self::MAX_LEN
            || !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ParseError::InvalidSlug(s.to_string()));
        }
        let slug = Self(s.to_string());
        match slug.split() {
            Some((series, _)) if !series.is_empty() => Ok(slug),
            _ => Err(ParseError::InvalidSlug(s.to_string())),
        }
    }

    fn split(&self) -> Option<(&str, u32)> {
        let (series, part) = self.0.rsplit_once(Self::PART_MARKER)?;
        Some((series, part.parse().ok()?))
    }

    /// Series prefix
    pub fn series(&self) -> &str {
        self.split().map_or(self.0.as_str(), |(series, _)| series)
    }

    /// Part number encoded in the slug
    pub fn part(&self) -> Option<u32> {
        self.split().map(|(_, part)| part)
    }

    /// Slug of another part of the same series
    pub fn sibling(&self, part: u32) -> Self {
        Self::new(self.series(), part)
    }

    /// Borrow the slug as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single part of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Slug
    pub slug: ContentSlug,
    /// Title shown as caption
    pub title: String,
    /// Only VIP subscribers may watch
    pub vip_only: bool,
    /// 1-based part index
    pub part: u32,
    /// Declared number of parts in the series
    pub total_parts: u32,
    /// Backing media reference (platform file id or URL)
    pub media_ref: String,
    /// When the part was ingested
    pub uploaded_at: DateTime<Utc>,
}

/// Navigation hints for the previous and next parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Previous part, absent on part 1
    pub previous: Option<ContentSlug>,
    /// Next part, absent on the last declared part
    pub next: Option<ContentSlug>,
}

impl ContentItem {
    /// Pagination hints bounded by part 1 and `total_parts`
    pub fn pagination(&self) -> Pagination {
        Pagination {
            previous: (self.part > 1).then(|| self.slug.sibling(self.part - 1)),
            next: (self.part < self.total_parts).then(|| self.slug.sibling(self.part + 1)),
        }
    }
}
