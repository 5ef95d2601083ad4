//! Delivery strategy ladder
//!
//! The embedding surface gives no way to know ahead of time which URL form a
//! given drive item will play under, so sources are tried in a fixed order:
//!
//! | index | strategy         | surface           |
//! |-------|------------------|-------------------|
//! | 0     | preview, hd1080  | native media      |
//! | 1     | preview, hd720   | native media      |
//! | 2     | preview, default | native media      |
//! | 3     | generic embed    | embedded document |

use crate::{types::SurfaceKind, Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Number of strategies in the ladder
pub const STRATEGY_COUNT: u8 = 4;

/// One delivery approach for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Preview URL requesting the highest rendering quality
    PreviewHd1080,
    /// Preview URL requesting a reduced rendering quality
    PreviewHd720,
    /// Preview URL with the platform default quality
    PreviewDefault,
    /// Generic embed endpoint, rendered in an embedded document
    GenericEmbed,
}

impl Strategy {
    /// All strategies in ladder order
    pub const LADDER: [Strategy; STRATEGY_COUNT as usize] = [
        Strategy::PreviewHd1080,
        Strategy::PreviewHd720,
        Strategy::PreviewDefault,
        Strategy::GenericEmbed,
    ];

    /// First strategy tried for every activation
    pub const FIRST: Strategy = Strategy::PreviewHd1080;

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Strategy> {
        Self::LADDER.get(index as usize).copied()
    }

    /// The strategy tried after this one fails, if any
    pub fn next(self) -> Option<Strategy> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    pub fn surface_kind(self) -> SurfaceKind {
        match self {
            Strategy::GenericEmbed => SurfaceKind::EmbeddedDocument,
            _ => SurfaceKind::NativeMedia,
        }
    }

    /// Seek, fullscreen and play/pause can only be driven on native media
    pub fn controls_available(self) -> bool {
        self.surface_kind() == SurfaceKind::NativeMedia
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::PreviewHd1080 => write!(f, "preview-hd1080"),
            Strategy::PreviewHd720 => write!(f, "preview-hd720"),
            Strategy::PreviewDefault => write!(f, "preview-default"),
            Strategy::GenericEmbed => write!(f, "generic-embed"),
        }
    }
}

/// URL shapes used to build a source for each strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyTable {
    /// Base under which `<id>/preview` is appended
    pub preview_base: Url,
    /// Endpoint receiving `export=preview&id=<id>`
    pub embed_base: Url,
    /// Quality requested by the first strategy
    pub high_quality: String,
    /// Quality requested by the second strategy
    pub reduced_quality: String,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            preview_base: Url::parse("https://drive.google.com/file/d/")
                .expect("static preview base is a valid URL"),
            embed_base: Url::parse("https://drive.google.com/uc")
                .expect("static embed base is a valid URL"),
            high_quality: "hd1080".to_string(),
            reduced_quality: "hd720".to_string(),
        }
    }
}

impl StrategyTable {
    /// Build the source URL for `item_id` under `strategy`.
    ///
    /// Pure: the same inputs always produce the same URL.
    pub fn resolve(&self, item_id: &str, strategy: Strategy) -> Result<Url> {
        match strategy {
            Strategy::PreviewHd1080 => self.preview(item_id, Some(&self.high_quality)),
            Strategy::PreviewHd720 => self.preview(item_id, Some(&self.reduced_quality)),
            Strategy::PreviewDefault => self.preview(item_id, None),
            Strategy::GenericEmbed => {
                let mut url = self.embed_base.clone();
                url.query_pairs_mut()
                    .clear()
                    .append_pair("export", "preview")
                    .append_pair("id", item_id);
                Ok(url)
            }
        }
    }

    fn preview(&self, item_id: &str, quality: Option<&str>) -> Result<Url> {
        let mut url = self.preview_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("preview base cannot take a path: {}", self.preview_base)))?
            .pop_if_empty()
            .push(item_id)
            .push("preview");
        url.set_query(None);
        if let Some(quality) = quality {
            url.query_pairs_mut().append_pair("quality", quality);
        }
        Ok(url)
    }

    /// Check that every strategy can produce a URL
    pub fn validate(&self) -> Result<()> {
        if self.preview_base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "preview base cannot take a path: {}",
                self.preview_base
            )));
        }
        if self.high_quality.is_empty() || self.reduced_quality.is_empty() {
            return Err(Error::InvalidConfig("quality labels must not be empty".into()));
        }
        Ok(())
    }
}
