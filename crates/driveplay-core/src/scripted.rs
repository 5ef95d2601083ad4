//! Scripted playback surface
//!
//! A [`SurfaceFactory`] that does not render anything: each mount consumes
//! the next [`ScriptStep`] and reports the matching signals. Every mount is
//! recorded in a shared [`MountLog`] so callers can inspect what was mounted
//! and drive signals by hand. Used by the CLI simulator and by tests.

use crate::{
    surface::{MountRequest, MountedSurface, SignalSink, SurfaceFactory},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a scripted surface does right after it is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Report a successful load
    Load,
    /// Report a load failure
    Fail,
    /// Report a successful load followed by the natural end
    End,
    /// Report nothing
    Silent,
    /// Refuse to mount at all
    Reject,
}

impl FromStr for ScriptStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "load" | "ok" => Ok(ScriptStep::Load),
            "fail" | "error" => Ok(ScriptStep::Fail),
            "end" => Ok(ScriptStep::End),
            "silent" | "hang" => Ok(ScriptStep::Silent),
            "reject" => Ok(ScriptStep::Reject),
            other => Err(Error::InvalidConfig(format!("unknown script step '{}'", other))),
        }
    }
}

/// Parse a comma separated script such as `fail,fail,load,end`
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>> {
    script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(ScriptStep::from_str)
        .collect()
}

/// Control call received by a scripted surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCall {
    Play,
    Pause,
    Mute(bool),
}

/// One recorded mount
#[derive(Debug, Clone)]
pub struct MountRecord {
    pub request: MountRequest,
    pub sink: SignalSink,
    pub step: ScriptStep,
    torn_down: Arc<AtomicBool>,
    muted: Arc<AtomicBool>,
    controls: Arc<Mutex<Vec<ControlCall>>>,
}

impl MountRecord {
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Current mute state of the surface, starting from the request
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn controls(&self) -> Vec<ControlCall> {
        lock(&self.controls).clone()
    }
}

/// Shared record of every mount a [`ScriptedSurfaceFactory`] performed
#[derive(Debug, Clone, Default)]
pub struct MountLog(Arc<Mutex<Vec<MountRecord>>>);

impl MountLog {
    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.0).is_empty()
    }

    pub fn latest(&self) -> Option<MountRecord> {
        lock(&self.0).last().cloned()
    }

    pub fn all(&self) -> Vec<MountRecord> {
        lock(&self.0).clone()
    }

    /// Records whose surface is still mounted
    pub fn live(&self) -> Vec<MountRecord> {
        lock(&self.0)
            .iter()
            .filter(|record| !record.is_torn_down())
            .cloned()
            .collect()
    }

    fn push(&self, record: MountRecord) {
        lock(&self.0).push(record);
    }
}

/// Surface factory driven by a list of steps
#[derive(Debug)]
pub struct ScriptedSurfaceFactory {
    script: VecDeque<ScriptStep>,
    /// Step used once the script runs out
    fallback: ScriptStep,
    log: MountLog,
}

impl ScriptedSurfaceFactory {
    /// Factory whose surfaces never report anything on their own
    pub fn manual() -> Self {
        Self::new(Vec::new(), ScriptStep::Silent)
    }

    pub fn new(script: impl IntoIterator<Item = ScriptStep>, fallback: ScriptStep) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            log: MountLog::default(),
        }
    }

    pub fn log(&self) -> MountLog {
        self.log.clone()
    }
}

impl SurfaceFactory for ScriptedSurfaceFactory {
    fn mount(&mut self, request: &MountRequest, sink: SignalSink) -> Result<Box<dyn MountedSurface>> {
        let step = self.script.pop_front().unwrap_or(self.fallback);
        let surface = ScriptedSurface {
            torn_down: Arc::new(AtomicBool::new(false)),
            muted: Arc::new(AtomicBool::new(request.muted)),
            controls: Arc::new(Mutex::new(Vec::new())),
        };
        self.log.push(MountRecord {
            request: request.clone(),
            sink: sink.clone(),
            step,
            torn_down: surface.torn_down.clone(),
            muted: surface.muted.clone(),
            controls: surface.controls.clone(),
        });

        match step {
            ScriptStep::Reject => {
                surface.torn_down.store(true, Ordering::SeqCst);
                return Err(Error::surface(format!("scripted rejection of {}", request.mount_id)));
            }
            ScriptStep::Load => {
                sink.loaded();
            }
            ScriptStep::Fail => {
                sink.failed();
            }
            ScriptStep::End => {
                sink.loaded();
                sink.ended();
            }
            ScriptStep::Silent => {}
        }
        Ok(Box::new(surface))
    }
}

struct ScriptedSurface {
    torn_down: Arc<AtomicBool>,
    muted: Arc<AtomicBool>,
    controls: Arc<Mutex<Vec<ControlCall>>>,
}

impl MountedSurface for ScriptedSurface {
    fn teardown(self: Box<Self>) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    fn play(&mut self) -> Result<()> {
        lock(&self.controls).push(ControlCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        lock(&self.controls).push(ControlCall::Pause);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted.store(muted, Ordering::SeqCst);
        lock(&self.controls).push(ControlCall::Mute(muted));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let steps = parse_script("fail, FAIL,load,end,").unwrap();
        assert_eq!(
            steps,
            vec![ScriptStep::Fail, ScriptStep::Fail, ScriptStep::Load, ScriptStep::End]
        );
        assert!(parse_script("fail,explode").is_err());
        assert!(parse_script("").unwrap().is_empty());
    }
}
