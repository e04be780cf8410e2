//! Demon records
//!
//! `CatalogDemon` is the shape served by the demon list catalog; `Demon` is
//! the trimmed record the roulette keeps in its pool and writes into saves.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Base of the per-position link stored on every simplified demon
pub const DEMON_LINK_BASE: &str = "https://pointercrate.com/demonlist";

/// Length of an external video ID
pub const VIDEO_ID_LEN: usize = 11;

static VIDEO_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .expect("video URL pattern is valid")
});

static BARE_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("bare video ID pattern is valid"));

/// A demon in the roulette pool
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Demon {
    pub name: String,

    /// Position on the list (1-based)
    pub position: i32,

    /// Bare video ID, never a URL
    #[serde(default)]
    pub video: Option<String>,

    pub creator: String,

    #[serde(rename = "levelID", default, skip_serializing_if = "Option::is_none")]
    pub level_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Demon {
    /// Placeholder for a pool entry that could not be read back from a save
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_string(),
            position: 0,
            video: None,
            creator: "Unknown".to_string(),
            level_id: None,
            link: Some(String::new()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

/// Player reference (publisher / verifier) in a catalog record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogPlayer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub banned: bool,
}

/// Demon as listed by the catalog service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CatalogDemon {
    pub id: u64,
    #[serde(default)]
    pub level_id: Option<u64>,
    pub name: String,
    pub position: i32,
    pub publisher: CatalogPlayer,
    #[serde(default)]
    pub requirement: f64,
    pub verifier: CatalogPlayer,
    #[serde(default)]
    pub video: Option<String>,
}

/// Project a catalog record onto the pool shape
pub fn simplify_demon(demon: &CatalogDemon) -> Demon {
    Demon {
        name: demon.name.clone(),
        position: demon.position,
        video: demon.video.as_deref().and_then(extract_video_id),
        creator: demon.publisher.name.clone(),
        level_id: demon.level_id,
        link: Some(demon_link(demon.position)),
    }
}

/// List page for a position. Applied as-is, even for non-positive positions.
pub fn demon_link(position: i32) -> String {
    format!("{}/{}/", DEMON_LINK_BASE, position)
}

/// Pull the 11-character video ID out of a watch / embed / short link, or
/// accept an already bare ID. Best effort: the ID itself is not validated.
pub fn extract_video_id(video: &str) -> Option<String> {
    if let Some(caps) = VIDEO_URL_PATTERN.captures(video) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    let trimmed = video.trim();
    if BARE_VIDEO_ID.is_match(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}
