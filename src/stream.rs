use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../assets/fallback_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamCategory {
    Pcm,
    Pcb,
    Commerce,
    Arts,
}

impl StreamCategory {
    pub const ALL: [StreamCategory; 4] = [
        StreamCategory::Pcm,
        StreamCategory::Pcb,
        StreamCategory::Commerce,
        StreamCategory::Arts,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StreamCategory::Pcm => "pcm",
            StreamCategory::Pcb => "pcb",
            StreamCategory::Commerce => "commerce",
            StreamCategory::Arts => "arts",
        }
    }
}

/// Maps a free-text stream label onto a catalog bucket.
///
/// Rules are tried in order and the first hit wins, so a label that
/// mentions both "medical" and "commerce" lands in `Pcb`. Anything
/// unrecognised, including a missing label, falls back to `Pcm`.
pub fn classify(label: Option<&str>) -> StreamCategory {
    let Some(label) = label else {
        return StreamCategory::Pcm;
    };
    let s = label.to_lowercase();
    let has = |needle: &str| s.contains(needle);

    if has("pcm") || has("engineering") || (has("science") && has("math")) {
        StreamCategory::Pcm
    } else if has("pcb") || has("medical") || has("bio") {
        StreamCategory::Pcb
    } else if has("commerce") || has("business") {
        StreamCategory::Commerce
    } else if has("arts") || has("humanities") {
        StreamCategory::Arts
    } else {
        StreamCategory::Pcm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierBadge {
    Dream,
    Tier1,
    Standard,
}

impl TierBadge {
    pub fn from_tier(tier: &str) -> Self {
        let t = tier.to_lowercase();
        if t.contains("dream") {
            TierBadge::Dream
        } else if t.contains('1') {
            TierBadge::Tier1
        } else {
            TierBadge::Standard
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            TierBadge::Dream => "★",
            TierBadge::Tier1 => "◆",
            TierBadge::Standard => "·",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("catalog has no entry for stream `{0}`")]
    MissingCategory(&'static str),
    #[error("catalog lists stream `{0}` more than once")]
    DuplicateCategory(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCollege {
    pub name: String,
    pub tier: String,
    #[serde(default)]
    pub location: Option<String>,
    pub match_score: u32,
    #[serde(default)]
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStream {
    pub category: StreamCategory,
    pub label: String,
    pub description: String,
    pub colleges: Vec<CatalogCollege>,
}

/// Static colleges shown when the engine returns no institution matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackCatalog {
    streams: Vec<CatalogStream>,
}

impl FallbackCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Every category must be present exactly once.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: FallbackCatalog = serde_json::from_str(raw)?;
        for category in StreamCategory::ALL {
            match catalog.streams.iter().filter(|s| s.category == category).count() {
                0 => return Err(CatalogError::MissingCategory(category.key())),
                1 => {}
                _ => return Err(CatalogError::DuplicateCategory(category.key())),
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, category: StreamCategory) -> Option<&CatalogStream> {
        self.streams.iter().find(|s| s.category == category)
    }

    pub fn streams(&self) -> impl Iterator<Item = &CatalogStream> {
        StreamCategory::ALL.into_iter().filter_map(|c| self.get(c))
    }
}
