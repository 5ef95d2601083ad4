//! Source resolver - fallback state machine for the active item
//!
//! ```text
//!            activate / retry(after mount)
//!                      │
//!                      ▼
//!   ┌────────── Loading(0) ──fail──▶ Loading(1) ──fail──▶ Loading(2) ──fail──▶ Loading(3)
//!   │               │                   │                   │                   │
//!   │            success             success             success          fail │ success
//!   │               ▼                   ▼                   ▼                   ▼   ▼
//!   │            Settled ◀──────────────┴───────────────────┴──────── Exhausted  Settled
//!   │
//!   └─ retry (any state) ─▶ Retrying ─(new surface mounted)─▶ Loading(0)
//! ```
//!
//! The resolver only tracks state. Mounting surfaces and arming timers is the
//! controller's job; every transition reports whether a re-mount is needed.

use crate::{
    strategy::{Strategy, StrategyTable},
    types::{FallbackStatus, PlayableItem, SurfaceKind},
    Result,
};
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of feeding a signal into the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new source was selected; the surface must be re-mounted
    Remount,
    /// The current source is confirmed working
    Settled,
    /// The last strategy failed
    Exhausted,
    /// The signal does not apply in the current state
    Ignored,
}

/// Fallback attempt for the currently active item
#[derive(Debug, Clone)]
pub struct FallbackAttempt {
    item_id: String,
    strategy: Strategy,
    resolved_url: Url,
    status: FallbackStatus,
}

impl FallbackAttempt {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn strategy_index(&self) -> u8 {
        self.strategy.index()
    }

    pub fn resolved_url(&self) -> &Url {
        &self.resolved_url
    }

    pub fn status(&self) -> FallbackStatus {
        self.status
    }

    pub fn surface_kind(&self) -> SurfaceKind {
        self.strategy.surface_kind()
    }
}

/// Fallback state machine scoped to one active item at a time
#[derive(Debug, Clone)]
pub struct SourceResolver {
    table: StrategyTable,
    attempt: Option<FallbackAttempt>,
}

impl SourceResolver {
    pub fn new(table: StrategyTable) -> Self {
        Self {
            table,
            attempt: None,
        }
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    /// Attempt for the active item, if any item is active
    pub fn attempt(&self) -> Option<&FallbackAttempt> {
        self.attempt.as_ref()
    }

    pub fn status(&self) -> Option<FallbackStatus> {
        self.attempt.as_ref().map(|a| a.status)
    }

    /// Start over at `Loading(0)` for a newly activated item
    pub fn activate(&mut self, item: &PlayableItem) -> Result<Transition> {
        let resolved_url = self.table.resolve(&item.id, Strategy::FIRST)?;
        info!(item = %item.id, url = %resolved_url, "Activating source");
        self.attempt = Some(FallbackAttempt {
            item_id: item.id.clone(),
            strategy: Strategy::FIRST,
            resolved_url,
            status: FallbackStatus::Loading(Strategy::FIRST.index()),
        });
        Ok(Transition::Remount)
    }

    /// Drop all attempt state
    pub fn clear(&mut self) {
        self.attempt = None;
    }

    /// The surface reported that the current source loaded
    pub fn on_load_success(&mut self) -> Transition {
        let Some(attempt) = self.attempt.as_mut() else {
            return Transition::Ignored;
        };
        match attempt.status {
            FallbackStatus::Loading(n) => {
                attempt.status = FallbackStatus::Settled;
                info!(item = %attempt.item_id, strategy = n, "Source settled");
                Transition::Settled
            }
            status => {
                debug!(item = %attempt.item_id, %status, "Ignoring load success");
                Transition::Ignored
            }
        }
    }

    /// The surface reported that the current source failed to load
    pub fn on_load_failure(&mut self) -> Result<Transition> {
        let Some(attempt) = self.attempt.as_mut() else {
            return Ok(Transition::Ignored);
        };
        let FallbackStatus::Loading(_) = attempt.status else {
            debug!(item = %attempt.item_id, status = %attempt.status, "Ignoring load failure");
            return Ok(Transition::Ignored);
        };

        match attempt.strategy.next() {
            Some(next) => {
                let resolved_url = self.table.resolve(&attempt.item_id, next)?;
                info!(
                    item = %attempt.item_id,
                    from = %attempt.strategy,
                    to = %next,
                    "Source failed, falling back"
                );
                attempt.strategy = next;
                attempt.resolved_url = resolved_url;
                attempt.status = FallbackStatus::Loading(next.index());
                Ok(Transition::Remount)
            }
            None => {
                warn!(item = %attempt.item_id, "All delivery strategies failed");
                attempt.status = FallbackStatus::Exhausted;
                Ok(Transition::Exhausted)
            }
        }
    }

    /// Manual retry: back to the first strategy, pending a fresh mount
    pub fn retry(&mut self) -> Result<Transition> {
        let Some(attempt) = self.attempt.as_mut() else {
            return Ok(Transition::Ignored);
        };
        attempt.resolved_url = self.table.resolve(&attempt.item_id, Strategy::FIRST)?;
        attempt.strategy = Strategy::FIRST;
        attempt.status = FallbackStatus::Retrying;
        info!(item = %attempt.item_id, "Manual retry");
        Ok(Transition::Remount)
    }

    /// The surface for a retry has been mounted; `Retrying` ends here
    pub fn begin_attempt(&mut self) {
        if let Some(attempt) = self.attempt.as_mut() {
            if attempt.status == FallbackStatus::Retrying {
                attempt.status = FallbackStatus::Loading(attempt.strategy.index());
            }
        }
    }
}
