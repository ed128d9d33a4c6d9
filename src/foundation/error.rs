/// Convenience result type used across Vellum.
pub type VellumResult<T> = Result<T, VellumError>;

/// Top-level error taxonomy used by the rendering entry points.
///
/// Effect-level problems (a missing clip path, a mask that fails to allocate) never surface
/// here; they degrade the effect and are reported as [`crate::Diagnostic`]s instead.
#[derive(thiserror::Error, Debug)]
pub enum VellumError {
    /// Invalid caller-provided data (configuration, document structure).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while driving a render that cannot be recovered locally.
    #[error("render error: {0}")]
    Render(String),

    /// A drawing target could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// An IRI reference could not be resolved where one is mandatory.
    #[error("reference error: {0}")]
    Reference(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VellumError {
    /// Build a [`VellumError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VellumError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`VellumError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`VellumError::Reference`] value.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
