//! A disposable in-memory host.
//!
//! Implements the host registry boundary against plain vectors so lifecycle
//! behavior can be driven without a running editor. Never wraps production
//! state. Every call is recorded in order, and specific names can be set up
//! to fail, simulating a host-side rejection such as a name collision.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use studiogpt_extension::registration::{
    ContributionKind, HostRegistry, RegistrationError, RegistrationHandle,
};

/// Whether a recorded call registered or released a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostAction {
    Register,
    Unregister,
}

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    pub action: HostAction,
    pub kind: ContributionKind,
    pub name: String,
}

/// In-memory stand-in for the host's registries.
#[derive(Debug, Clone, Default)]
pub struct SandboxHost {
    menu_entries: Vec<String>,
    settings_objects: Vec<String>,
    subsystems: Vec<String>,
    bridge_commands: Vec<String>,
    events: Vec<HostEvent>,
    rejections: BTreeSet<String>,
}

impl SandboxHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future registration of `name` fail, simulating a host that
    /// already holds that name.
    pub fn reject_name(&mut self, name: &str) {
        self.rejections.insert(name.into());
    }

    pub fn clear_rejections(&mut self) {
        self.rejections.clear();
    }

    /// All recorded calls, in order.
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Names currently registered for `kind`, in registration order.
    pub fn registered(&self, kind: ContributionKind) -> &[String] {
        match kind {
            ContributionKind::MenuEntry => &self.menu_entries,
            ContributionKind::SettingsObject => &self.settings_objects,
            ContributionKind::Subsystem => &self.subsystems,
            ContributionKind::BridgeCommand => &self.bridge_commands,
        }
    }

    /// Total registrations currently held across all registries.
    pub fn outstanding_count(&self) -> usize {
        self.menu_entries.len()
            + self.settings_objects.len()
            + self.subsystems.len()
            + self.bridge_commands.len()
    }

    /// Whether the host is back to its pre-load condition.
    pub fn is_pristine(&self) -> bool {
        self.outstanding_count() == 0
    }

    fn registry_mut(&mut self, kind: ContributionKind) -> &mut Vec<String> {
        match kind {
            ContributionKind::MenuEntry => &mut self.menu_entries,
            ContributionKind::SettingsObject => &mut self.settings_objects,
            ContributionKind::Subsystem => &mut self.subsystems,
            ContributionKind::BridgeCommand => &mut self.bridge_commands,
        }
    }

    fn accept(&mut self, handle: &RegistrationHandle) -> Result<(), RegistrationError> {
        if self.rejections.contains(&handle.name) {
            return Err(RegistrationError::Rejected {
                kind: handle.kind,
                name: handle.name.clone(),
                reason: "name unavailable".into(),
            });
        }
        let registry = self.registry_mut(handle.kind);
        if registry.contains(&handle.name) {
            return Err(RegistrationError::DuplicateName(handle.name.clone()));
        }
        registry.push(handle.name.clone());
        self.events.push(HostEvent {
            action: HostAction::Register,
            kind: handle.kind,
            name: handle.name.clone(),
        });
        Ok(())
    }

    fn release(&mut self, handle: &RegistrationHandle) {
        let registry = self.registry_mut(handle.kind);
        registry.retain(|name| name != &handle.name);
        self.events.push(HostEvent {
            action: HostAction::Unregister,
            kind: handle.kind,
            name: handle.name.clone(),
        });
    }
}

impl HostRegistry for SandboxHost {
    fn register_menu_entry(
        &mut self,
        handle: &RegistrationHandle,
    ) -> Result<(), RegistrationError> {
        self.accept(handle)
    }

    fn unregister_menu_entry(&mut self, handle: &RegistrationHandle) {
        self.release(handle);
    }

    fn register_settings_object(
        &mut self,
        handle: &RegistrationHandle,
    ) -> Result<(), RegistrationError> {
        self.accept(handle)
    }

    fn unregister_settings_object(&mut self, handle: &RegistrationHandle) {
        self.release(handle);
    }

    fn register_subsystem(&mut self, handle: &RegistrationHandle) -> Result<(), RegistrationError> {
        self.accept(handle)
    }

    fn unregister_subsystem(&mut self, handle: &RegistrationHandle) {
        self.release(handle);
    }

    fn register_bridge_command(
        &mut self,
        handle: &RegistrationHandle,
    ) -> Result<(), RegistrationError> {
        self.accept(handle)
    }

    fn unregister_bridge_command(&mut self, handle: &RegistrationHandle) {
        self.release(handle);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64, kind: ContributionKind, name: &str) -> RegistrationHandle {
        RegistrationHandle {
            id,
            kind,
            name: name.into(),
        }
    }

    #[test]
    fn registers_and_releases_by_kind() {
        let mut host = SandboxHost::new();
        let menu = handle(0, ContributionKind::MenuEntry, "open_assistant");
        let subsystem = handle(1, ContributionKind::Subsystem, "agent");

        host.register_menu_entry(&menu).unwrap();
        host.register_subsystem(&subsystem).unwrap();
        assert_eq!(host.outstanding_count(), 2);
        assert_eq!(host.registered(ContributionKind::MenuEntry), ["open_assistant"]);

        host.unregister_subsystem(&subsystem);
        host.unregister_menu_entry(&menu);
        assert!(host.is_pristine());
        assert_eq!(host.events().len(), 4);
    }

    #[test]
    fn duplicate_name_within_a_kind_is_rejected() {
        let mut host = SandboxHost::new();
        host.register_menu_entry(&handle(0, ContributionKind::MenuEntry, "same"))
            .unwrap();
        let err = host
            .register_menu_entry(&handle(1, ContributionKind::MenuEntry, "same"))
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("same".into()));
    }

    #[test]
    fn same_name_in_different_kinds_is_allowed() {
        let mut host = SandboxHost::new();
        host.register_menu_entry(&handle(0, ContributionKind::MenuEntry, "studiogpt"))
            .unwrap();
        host.register_subsystem(&handle(1, ContributionKind::Subsystem, "studiogpt"))
            .unwrap();
        assert_eq!(host.outstanding_count(), 2);
    }

    #[test]
    fn injected_rejection_fires_until_cleared() {
        let mut host = SandboxHost::new();
        host.reject_name("agent");

        let agent = handle(0, ContributionKind::Subsystem, "agent");
        assert!(matches!(
            host.register_subsystem(&agent),
            Err(RegistrationError::Rejected { .. })
        ));

        host.clear_rejections();
        host.register_subsystem(&agent).unwrap();
    }

    #[test]
    fn events_record_order_and_action() {
        let mut host = SandboxHost::new();
        let entry = handle(0, ContributionKind::MenuEntry, "m");
        host.register_menu_entry(&entry).unwrap();
        host.unregister_menu_entry(&entry);

        assert_eq!(host.events()[0].action, HostAction::Register);
        assert_eq!(host.events()[1].action, HostAction::Unregister);
        assert_eq!(host.events()[1].name, "m");
    }
}
