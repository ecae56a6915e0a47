use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Capture engine state machine.
///
/// State transitions:
/// ```text
/// constructed → preparing ⇄ playing
///                  ↑  ↓       ↓
///               reinitializing
///
/// preparing / playing / reinitializing → stopped (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Constructed,
    Preparing,
    Playing,
    Reinitializing,
    Stopped,
}

impl CaptureState {
    const ALL: [CaptureState; 5] = [
        Self::Constructed,
        Self::Preparing,
        Self::Playing,
        Self::Reinitializing,
        Self::Stopped,
    ];

    /// Whether `self → next` is a legal transition.
    ///
    /// Re-entering the same state is not a transition and is rejected.
    pub fn can_transition_to(self, next: CaptureState) -> bool {
        use CaptureState::*;
        matches!(
            (self, next),
            (Constructed, Preparing)
                | (Constructed, Stopped)
                | (Preparing, Playing)
                | (Preparing, Reinitializing)
                | (Preparing, Stopped)
                | (Playing, Preparing)
                | (Playing, Reinitializing)
                | (Playing, Stopped)
                | (Reinitializing, Preparing)
                | (Reinitializing, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Constructed => 0,
            Self::Preparing => 1,
            Self::Playing => 2,
            Self::Reinitializing => 3,
            Self::Stopped => 4,
        }
    }

    fn from_u8(raw: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|state| state.to_u8() == raw)
            .unwrap_or(Self::Stopped)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constructed => "constructed",
            Self::Preparing => "preparing",
            Self::Playing => "playing",
            Self::Reinitializing => "reinitializing",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a `CaptureState`.
///
/// Read from the render thread on every `get_buffer`, written by the capture
/// thread, the device-change notifier, and the owner. All writes go through
/// the transition table.
#[derive(Debug)]
pub struct AtomicCaptureState(AtomicU8);

impl AtomicCaptureState {
    pub fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn load(&self) -> CaptureState {
        CaptureState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from exactly `from` to `to`. Fails if the current state differs
    /// or the transition is not in the table.
    pub fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move from whatever the current state is to `to`, if the table allows it.
    ///
    /// Returns the state that was replaced, or `None` when the move was rejected.
    pub fn transition_from_any(&self, to: CaptureState) -> Option<CaptureState> {
        let mut current = self.load();
        loop {
            if !current.can_transition_to(to) {
                return None;
            }
            match self.0.compare_exchange_weak(
                current.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(raw) => current = CaptureState::from_u8(raw),
            }
        }
    }
}
