//! Wire types for the Seerr v1 API.
//!
//! The raw-status → availability mapping and the two-shape `seasons` field
//! are hard external contracts; both live here, next to the types they
//! describe.

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Media kind the server distinguishes. Serializes lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Parse a raw `mediaType` field. Trending responses also carry
    /// `person`/`collection` rows; those return `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library/request state of a catalog item, derived from the server's
/// numeric status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Requested,
    Unknown,
}

impl Availability {
    /// Server status code mapping: {1, 2, 4} available (in library or
    /// partially so), {3, 5} pending/processing requests, anything else
    /// unknown. Must reproduce the server's enums exactly.
    pub fn from_status(status: Option<i64>) -> Self {
        match status {
            Some(1) | Some(2) | Some(4) => Self::Available,
            Some(3) | Some(5) => Self::Requested,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Requested => "Requested",
            Self::Unknown => "Unknown",
        }
    }
}

/// Nested media info; `status` is the library status (4 = available).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaInfo {
    pub status: Option<i64>,
    pub status_code: Option<i64>,
}

/// A single raw catalog item (movie or TV) from search/discover responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaItem {
    pub id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub status: Option<i64>,
    pub media_info: Option<MediaInfo>,
}

impl MediaItem {
    /// Top-level status, falling back through the nested media info.
    fn raw_status(&self) -> Option<i64> {
        self.status
            .or_else(|| self.media_info.as_ref().and_then(|m| m.status))
            .or_else(|| self.media_info.as_ref().and_then(|m| m.status_code))
    }

    pub fn availability(&self) -> Availability {
        Availability::from_status(self.raw_status())
    }

    /// Convert to the display model. Items with an unrecognized media type
    /// default to movie, matching the server's own fallback.
    pub fn into_search_result(self) -> SearchResult {
        let tmdb_id = self.tmdb_id.or(self.id).unwrap_or(0);
        let media_type = self
            .media_type
            .as_deref()
            .and_then(MediaType::from_raw)
            .unwrap_or(MediaType::Movie);
        let title = self.title.clone().or_else(|| self.name.clone()).unwrap_or_default();
        let date = self
            .release_date
            .clone()
            .or_else(|| self.first_air_date.clone())
            .unwrap_or_default();
        let year: String = date.chars().take(4).collect();
        let year = if year.len() == 4 { year } else { String::new() };
        let availability = self.availability();

        SearchResult {
            id: format!("{media_type}_{tmdb_id}"),
            tmdb_id,
            media_type,
            title,
            year,
            poster_path: self.poster_path,
            availability,
        }
    }
}

/// A catalog item ready for display. `id` is the dedup/display key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub tmdb_id: i64,
    pub media_type: MediaType,
    pub title: String,
    /// Four digits, or empty when the release date is unknown.
    pub year: String,
    pub poster_path: Option<String>,
    pub availability: Availability,
}

/// Wrapper for `GET /api/v1/search`; the server may split results across
/// three collections depending on version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Option<Vec<MediaItem>>,
    pub movies: Option<Vec<MediaItem>>,
    pub tv: Option<Vec<MediaItem>>,
}

impl SearchResponse {
    /// Merge the three collections into one ordered sequence.
    pub fn merged(self) -> Vec<MediaItem> {
        let mut items = self.results.unwrap_or_default();
        items.extend(self.movies.unwrap_or_default());
        items.extend(self.tv.unwrap_or_default());
        items
    }
}

/// Wrapper for `GET /api/v1/discover/...`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverResponse {
    pub results: Option<Vec<MediaItem>>,
}

/// Seasons for a TV request: everything, or an explicit list.
/// Serializes as the literal string `"all"` or as an array of integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seasons {
    All,
    List(Vec<u32>),
}

impl Serialize for Seasons {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::List(numbers) => numbers.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Seasons {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SeasonsVisitor;

        impl<'de> Visitor<'de> for SeasonsVisitor {
            type Value = Seasons;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("the string \"all\" or an array of season numbers")
            }

            fn visit_str<E: serde::de::Error>(self, _value: &str) -> Result<Seasons, E> {
                Ok(Seasons::All)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Seasons, A::Error> {
                let mut numbers = Vec::new();
                while let Some(n) = seq.next_element::<u32>()? {
                    numbers.push(n);
                }
                Ok(Seasons::List(numbers))
            }
        }

        deserializer.deserialize_any(SeasonsVisitor)
    }
}

/// Body for `POST /api/v1/request`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub media_type: MediaType,
    pub media_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Seasons>,
}

impl CreateRequestBody {
    /// Request body for a catalog item. TV requests always ask for all
    /// seasons; movies carry no seasons field at all.
    pub fn for_item(item: &SearchResult) -> Self {
        Self {
            media_type: item.media_type,
            media_id: item.tmdb_id,
            seasons: match item.media_type {
                MediaType::Tv => Some(Seasons::All),
                MediaType::Movie => None,
            },
        }
    }
}

/// Body for `POST /api/v1/auth/local`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
