//! Registration handles and the host registry boundary.
//!
//! Every piece of host-visible state an extension contributes is represented
//! by a [`RegistrationHandle`], owned by the extension that created it and
//! released through the same handle on teardown. The host's own registries
//! (menus, settings panels, subsystems, bridge commands) sit behind the
//! [`HostRegistry`] trait as external collaborators.

use serde::{Deserialize, Serialize};

/// The kinds of host-visible contribution an extension can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    MenuEntry,
    SettingsObject,
    Subsystem,
    BridgeCommand,
}

/// One piece of host-visible state contributed by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationHandle {
    /// Unique within the owning extension, monotonically assigned.
    pub id: u64,
    pub kind: ContributionKind,
    pub name: String,
}

/// The host rejected a contribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("duplicate name: '{0}' is already registered")]
    DuplicateName(String),

    #[error("host rejected {kind:?} '{name}': {reason}")]
    Rejected {
        kind: ContributionKind,
        name: String,
        reason: String,
    },
}

/// The host's registries, consumed through explicit register/unregister
/// pairs. Registration can fail; release through a valid handle cannot.
pub trait HostRegistry {
    fn register_menu_entry(&mut self, handle: &RegistrationHandle)
    -> Result<(), RegistrationError>;
    fn unregister_menu_entry(&mut self, handle: &RegistrationHandle);

    fn register_settings_object(
        &mut self,
        handle: &RegistrationHandle,
    ) -> Result<(), RegistrationError>;
    fn unregister_settings_object(&mut self, handle: &RegistrationHandle);

    fn register_subsystem(&mut self, handle: &RegistrationHandle) -> Result<(), RegistrationError>;
    fn unregister_subsystem(&mut self, handle: &RegistrationHandle);

    fn register_bridge_command(
        &mut self,
        handle: &RegistrationHandle,
    ) -> Result<(), RegistrationError>;
    fn unregister_bridge_command(&mut self, handle: &RegistrationHandle);
}

/// Records handles in registration order; release is strictly LIFO so any
/// implicit dependency between registered items is respected on unwind.
#[derive(Debug, Clone, Default)]
pub struct RegistrationLedger {
    handles: Vec<RegistrationHandle>,
    next_id: u64,
}

impl RegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a handle for a contribution about to be registered. The handle is
    /// only recorded once [`RegistrationLedger::record`] is called, so a
    /// failed host registration leaves no trace.
    pub fn mint(&mut self, kind: ContributionKind, name: &str) -> RegistrationHandle {
        let id = self.next_id;
        self.next_id += 1;
        RegistrationHandle {
            id,
            kind,
            name: name.into(),
        }
    }

    pub fn record(&mut self, handle: RegistrationHandle) {
        self.handles.push(handle);
    }

    /// Remove and return the most recently recorded handle.
    pub fn pop(&mut self) -> Option<RegistrationHandle> {
        self.handles.pop()
    }

    /// Handles currently registered, in registration order.
    pub fn outstanding(&self) -> &[RegistrationHandle] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
