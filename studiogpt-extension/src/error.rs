use crate::lifecycle::LifecycleError;
use crate::registration::RegistrationError;

/// Errors produced by extension load/unload operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

pub type Result<T> = std::result::Result<T, ExtensionError>;
