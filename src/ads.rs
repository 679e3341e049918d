//! Ad gate
//!
//! Continuing a lost game sits behind a rewarded ad; every few restarts sit
//! behind an interstitial. The gate runs one ad at a time:
//! Idle -> Loading -> Showing -> Idle. A broken ad network never blocks the
//! player: the gate shows its own timed placeholder instead.

use serde::{Deserialize, Serialize};

use crate::error::AdError;
use crate::sim::timers::{Scheduler, TimerHandle};
use crate::tuning::Tuning;

/// Which ad is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdKind {
    /// Rewarded: grants a continue
    Continue,
    /// Interstitial between games; the restart happens regardless
    Periodic,
}

impl AdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdKind::Continue => "continue",
            AdKind::Periodic => "periodic",
        }
    }

    /// Rewarded ads grant a continue when dismissed
    pub fn is_rewarded(&self) -> bool {
        matches!(self, AdKind::Continue)
    }

    fn index(&self) -> usize {
        match self {
            AdKind::Continue => 0,
            AdKind::Periodic => 1,
        }
    }
}

/// Source of real ads
pub trait AdNetwork {
    /// Start loading an ad of `kind`
    fn prepare_ad(&mut self, kind: AdKind) -> Result<(), AdError>;

    /// Present a prepared ad. `false` means nothing could be shown.
    fn show(&mut self, kind: AdKind) -> bool;

    /// Forget any loaded ad after a presentation
    fn reset(&mut self);
}

/// Network with no inventory: loads "succeed" but nothing is ever shown,
/// so every presentation is the placeholder.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAds {
    loaded: [bool; 2],
}

impl SimulatedAds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, kind: AdKind) -> bool {
        self.loaded[kind.index()]
    }
}

impl AdNetwork for SimulatedAds {
    fn prepare_ad(&mut self, kind: AdKind) -> Result<(), AdError> {
        self.loaded[kind.index()] = true;
        Ok(())
    }

    fn show(&mut self, _kind: AdKind) -> bool {
        false
    }

    fn reset(&mut self) {
        self.loaded = [false; 2];
    }
}

/// Gate phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdPhase {
    Idle,
    Loading { kind: AdKind },
    Showing {
        kind: AdKind,
        /// The network had nothing; our placeholder is up
        placeholder: bool,
        closable: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdTimer {
    Loaded,
    Closable,
}

/// Phase change reported by [`AdGate::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdUpdate {
    Showing { kind: AdKind, placeholder: bool },
    Closable { kind: AdKind },
}

/// A finished presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdCompletion {
    pub kind: AdKind,
    pub placeholder: bool,
}

/// One-ad-at-a-time state machine over an [`AdNetwork`]
pub struct AdGate {
    network: Box<dyn AdNetwork>,
    phase: AdPhase,
    timers: Scheduler<AdTimer>,
    closable_timer: Option<TimerHandle>,
    load_ms: u64,
    min_display_ms: u64,
}

impl AdGate {
    pub fn new(network: Box<dyn AdNetwork>, tuning: &Tuning) -> Self {
        Self {
            network,
            phase: AdPhase::Idle,
            timers: Scheduler::new(),
            closable_timer: None,
            load_ms: tuning.ad_load_ms,
            min_display_ms: tuning.ad_min_display_ms,
        }
    }

    pub fn phase(&self) -> AdPhase {
        self.phase
    }

    /// An ad is loading or on screen
    pub fn is_busy(&self) -> bool {
        self.phase != AdPhase::Idle
    }

    pub fn kind(&self) -> Option<AdKind> {
        match self.phase {
            AdPhase::Idle => None,
            AdPhase::Loading { kind } | AdPhase::Showing { kind, .. } => Some(kind),
        }
    }

    /// Start loading an ad. Returns `false` if one is already running.
    pub fn begin(&mut self, kind: AdKind, now_ms: u64) -> bool {
        if self.is_busy() {
            log::debug!("Ignoring {} ad request, gate busy", kind.as_str());
            return false;
        }
        if let Err(e) = self.network.prepare_ad(kind) {
            log::warn!("Ad network failed to prepare {} ad, using placeholder: {}", kind.as_str(), e);
        }
        self.timers.schedule(now_ms, self.load_ms, AdTimer::Loaded);
        self.phase = AdPhase::Loading { kind };
        log::info!("Loading {} ad", kind.as_str());
        true
    }

    /// Fire due load/closable timers
    pub fn advance(&mut self, now_ms: u64) -> Vec<AdUpdate> {
        let mut updates = Vec::new();
        for (handle, timer) in self.timers.drain_due(now_ms) {
            match (timer, self.phase) {
                (AdTimer::Loaded, AdPhase::Loading { kind }) => {
                    let placeholder = !self.network.show(kind);
                    if placeholder {
                        log::info!("No {} ad available, showing placeholder", kind.as_str());
                    }
                    self.closable_timer =
                        Some(self.timers.schedule(now_ms, self.min_display_ms, AdTimer::Closable));
                    self.phase = AdPhase::Showing {
                        kind,
                        placeholder,
                        closable: false,
                    };
                    updates.push(AdUpdate::Showing { kind, placeholder });
                }
                (
                    AdTimer::Closable,
                    AdPhase::Showing {
                        kind, placeholder, ..
                    },
                ) if self.closable_timer == Some(handle) => {
                    self.closable_timer = None;
                    self.phase = AdPhase::Showing {
                        kind,
                        placeholder,
                        closable: true,
                    };
                    updates.push(AdUpdate::Closable { kind });
                }
                _ => {}
            }
        }
        updates
    }

    /// Whole seconds until the ad may be dismissed
    pub fn seconds_left(&self, now_ms: u64) -> Option<u64> {
        let due = self.closable_timer.and_then(|h| self.timers.due_at(h))?;
        Some(due.saturating_sub(now_ms).div_ceil(1000))
    }

    pub fn can_dismiss(&self) -> bool {
        matches!(self.phase, AdPhase::Showing { closable: true, .. })
    }

    /// Close the ad. Ignored until the minimum display time has passed.
    pub fn dismiss(&mut self) -> Option<AdCompletion> {
        let AdPhase::Showing {
            kind,
            placeholder,
            closable: true,
        } = self.phase
        else {
            return None;
        };
        self.network.reset();
        self.phase = AdPhase::Idle;
        log::info!("{} ad finished", kind.as_str());
        Some(AdCompletion { kind, placeholder })
    }

    /// Abort whatever is running (teardown)
    pub fn cancel(&mut self) {
        if self.is_busy() {
            log::info!("Cancelling ad");
            self.network.reset();
        }
        self.timers.clear();
        self.closable_timer = None;
        self.phase = AdPhase::Idle;
    }
}
