use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No adapter factory is registered for the requested service type.
    #[error("unsupported service type {0}")]
    UnsupportedService(&'static str),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
