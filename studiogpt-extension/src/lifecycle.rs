use serde::{Deserialize, Serialize};

/// Extension runtime state.
///
/// Transitions are strictly sequential and driven by the host:
/// `Unloaded -> Loading -> Active -> Unloading -> Unloaded`, plus
/// `Loading -> Unloaded` when a load attempt fails and rolls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    Unloaded,
    Loading,
    Active,
    Unloading,
}

/// An operation was invoked outside its valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: {from:?} -> {to:?}")]
pub struct LifecycleError {
    pub from: ExtensionState,
    pub to: ExtensionState,
}

/// One recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ExtensionState,
    pub to: ExtensionState,
    pub timestamp: String,
    pub error: Option<String>,
}

/// Enforces the extension state machine and keeps a transition log.
#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    state: ExtensionState,
    log: Vec<TransitionRecord>,
}

impl LifecycleMachine {
    pub fn new() -> Self {
        Self {
            state: ExtensionState::Unloaded,
            log: Vec::new(),
        }
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    pub fn log(&self) -> &[TransitionRecord] {
        &self.log
    }

    /// Attempt a transition. Invalid transitions fail and leave the state
    /// unchanged.
    pub fn transition(&mut self, to: ExtensionState) -> Result<(), LifecycleError> {
        if !Self::is_valid(self.state, to) {
            return Err(LifecycleError {
                from: self.state,
                to,
            });
        }
        self.record(to, None);
        Ok(())
    }

    /// Transition `Loading -> Unloaded` after a failed load attempt,
    /// attaching the error to the transition record.
    pub fn fail_load(&mut self, error: &str) -> Result<(), LifecycleError> {
        if self.state != ExtensionState::Loading {
            return Err(LifecycleError {
                from: self.state,
                to: ExtensionState::Unloaded,
            });
        }
        self.record(ExtensionState::Unloaded, Some(error.to_string()));
        Ok(())
    }

    fn record(&mut self, to: ExtensionState, error: Option<String>) {
        tracing::debug!(from = ?self.state, ?to, "lifecycle transition");
        self.log.push(TransitionRecord {
            from: self.state,
            to,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error,
        });
        self.state = to;
    }

    fn is_valid(from: ExtensionState, to: ExtensionState) -> bool {
        use ExtensionState::*;
        matches!(
            (from, to),
            (Unloaded, Loading) | (Loading, Active) | (Active, Unloading) | (Unloading, Unloaded)
        )
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
