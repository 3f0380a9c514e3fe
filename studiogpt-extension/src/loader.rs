//! Extension load/unload orchestration.
//!
//! The host main thread drives every transition; the loader itself never
//! initiates one. A load attempt either completes every registration before
//! `Active` is reported, or rolls back everything it registered and reports
//! `Unloaded` with the error — the extension is never left partially active.

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::lifecycle::{ExtensionState, LifecycleMachine, TransitionRecord};
use crate::registration::{
    ContributionKind, HostRegistry, RegistrationError, RegistrationHandle, RegistrationLedger,
};

/// One contribution the extension declares, registered in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub kind: ContributionKind,
    pub name: String,
}

impl Contribution {
    pub fn new(kind: ContributionKind, name: &str) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Drives an extension through its lifecycle against a [`HostRegistry`].
#[derive(Debug)]
pub struct ExtensionLoader {
    contributions: Vec<Contribution>,
    lifecycle: LifecycleMachine,
    ledger: RegistrationLedger,
    cancel: CancellationToken,
}

impl ExtensionLoader {
    pub fn new(contributions: Vec<Contribution>) -> Self {
        Self {
            contributions,
            lifecycle: LifecycleMachine::new(),
            ledger: RegistrationLedger::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ExtensionState {
        self.lifecycle.state()
    }

    pub fn transition_log(&self) -> &[TransitionRecord] {
        self.lifecycle.log()
    }

    /// Handles currently registered with the host, in registration order.
    pub fn outstanding_handles(&self) -> &[RegistrationHandle] {
        self.ledger.outstanding()
    }

    /// Token handed to the extension's request owners. It is cancelled when
    /// unloading begins; cancelling is idempotent.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register every declared contribution and report `Active`.
    ///
    /// On the first registration failure, all prior registrations from this
    /// attempt are unwound in reverse order, the reported state is
    /// `Unloaded`, and the error is returned to the caller.
    pub fn load(&mut self, host: &mut dyn HostRegistry) -> Result<()> {
        self.lifecycle.transition(ExtensionState::Loading)?;
        tracing::info!(contributions = self.contributions.len(), "loading extension");

        for contribution in self.contributions.clone() {
            let handle = self.ledger.mint(contribution.kind, &contribution.name);
            match Self::register_one(host, &handle) {
                Ok(()) => self.ledger.record(handle),
                Err(err) => {
                    tracing::warn!(%err, "registration failed, rolling back load attempt");
                    self.unwind(host);
                    self.lifecycle.fail_load(&err.to_string())?;
                    return Err(err.into());
                }
            }
        }

        self.lifecycle.transition(ExtensionState::Active)?;
        tracing::info!(handles = self.ledger.len(), "extension active");
        Ok(())
    }

    /// Deregister exactly the registered set, newest first, and report
    /// `Unloaded`. In-flight requests owned by this extension are cancelled
    /// first.
    pub fn unload(&mut self, host: &mut dyn HostRegistry) -> Result<()> {
        self.lifecycle.transition(ExtensionState::Unloading)?;
        self.cancel.cancel();
        self.unwind(host);
        self.lifecycle.transition(ExtensionState::Unloaded)?;
        // Fresh token for a potential reload; the old one stays cancelled for
        // whoever still holds it.
        self.cancel = CancellationToken::new();
        tracing::info!("extension unloaded");
        Ok(())
    }

    /// Release every recorded handle in LIFO order.
    fn unwind(&mut self, host: &mut dyn HostRegistry) {
        while let Some(handle) = self.ledger.pop() {
            Self::unregister_one(host, &handle);
        }
    }

    fn register_one(
        host: &mut dyn HostRegistry,
        handle: &RegistrationHandle,
    ) -> std::result::Result<(), RegistrationError> {
        match handle.kind {
            ContributionKind::MenuEntry => host.register_menu_entry(handle),
            ContributionKind::SettingsObject => host.register_settings_object(handle),
            ContributionKind::Subsystem => host.register_subsystem(handle),
            ContributionKind::BridgeCommand => host.register_bridge_command(handle),
        }
    }

    fn unregister_one(host: &mut dyn HostRegistry, handle: &RegistrationHandle) {
        match handle.kind {
            ContributionKind::MenuEntry => host.unregister_menu_entry(handle),
            ContributionKind::SettingsObject => host.unregister_settings_object(handle),
            ContributionKind::Subsystem => host.unregister_subsystem(handle),
            ContributionKind::BridgeCommand => host.unregister_bridge_command(handle),
        }
    }
}

/// The contribution set the shipped extension declares: one menu entry, the
/// settings panel, the agent subsystem, and the bridge commands enabled by
/// default.
pub fn default_contributions() -> Vec<Contribution> {
    vec![
        Contribution::new(ContributionKind::SettingsObject, "studiogpt_settings"),
        Contribution::new(ContributionKind::Subsystem, "studiogpt_agent"),
        Contribution::new(ContributionKind::MenuEntry, "open_assistant"),
        Contribution::new(ContributionKind::BridgeCommand, "script_execute"),
        Contribution::new(ContributionKind::BridgeCommand, "scene_query"),
        Contribution::new(ContributionKind::BridgeCommand, "viewport_screenshot"),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
