//! Playlist session - active item tracking and navigation
//!
//! Navigation saturates at both ends: `next` on the last item and `previous`
//! on the first are no-ops, never wrap, and never fail. The item list is a
//! snapshot taken at open and is never mutated afterwards.

use crate::{types::PlayableItem, Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Ordered items plus the index of the one being played
#[derive(Debug, Clone)]
pub struct PlaylistSession {
    items: Arc<[PlayableItem]>,
    active_index: usize,
    sidebar_visible: bool,
}

impl PlaylistSession {
    /// Open a session, starting at `initial_item_id` when it is present.
    ///
    /// An empty `items` yields an inert session: it has no active item and
    /// playback UI must not be rendered for it.
    pub fn open(items: impl Into<Arc<[PlayableItem]>>, initial_item_id: Option<&str>) -> Self {
        let items = items.into();
        let active_index = initial_item_id
            .and_then(|id| items.iter().position(|item| item.id == id))
            .unwrap_or(0);

        debug!(items = items.len(), active_index, "Playlist opened");

        Self {
            items,
            active_index,
            sidebar_visible: true,
        }
    }

    /// True when there is nothing to play
    pub fn is_inert(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PlayableItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the active item; meaningless for an inert session
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_item(&self) -> Option<&PlayableItem> {
        self.items.get(self.active_index)
    }

    pub fn is_first(&self) -> bool {
        self.active_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.active_index + 1 >= self.items.len()
    }

    /// Items queued after the active one
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.active_index + 1)
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    /// Advance by one. Returns true if the active index changed.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.active_index += 1;
        true
    }

    /// Step back by one. Returns true if the active index changed.
    pub fn previous(&mut self) -> bool {
        if self.active_index == 0 || self.is_inert() {
            return false;
        }
        self.active_index -= 1;
        true
    }

    /// Make `index` active, even if it already is (replay)
    pub fn select_index(&mut self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(Error::InvalidIndex {
                index,
                len: self.items.len(),
            });
        }
        self.active_index = index;
        Ok(())
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_visible = !self.sidebar_visible;
        self.sidebar_visible
    }
}
