pub mod commands;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod registration;
pub mod settings;

// Re-export key types for convenience.
pub use commands::{CommandError, CommandRegistry, CommandSpec, JsonSchema, built_in_specs};
pub use error::{ExtensionError, Result};
pub use lifecycle::{ExtensionState, LifecycleError, LifecycleMachine, TransitionRecord};
pub use loader::{Contribution, ExtensionLoader, default_contributions};
pub use module::{CapabilityUse, GraphError, ModuleDescriptor, ModuleGraph};
pub use registration::{
    ContributionKind, HostRegistry, RegistrationError, RegistrationHandle, RegistrationLedger,
};
pub use settings::{SettingsStore, StudioGptSettings};
