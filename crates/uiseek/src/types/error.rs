/*! Error types for tree search and native provider calls. */

use crate::a11y::CapabilityId;

/// Failures reported by a [`TreeProvider`](crate::provider::TreeProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
  /// The native layer rejected a cached reference; the node it named is gone.
  #[error("Native reference is no longer valid")]
  StaleReference,

  #[error("Operation not supported by provider: {0}")]
  Unsupported(&'static str),

  #[error("Native call failed: {0}")]
  Native(String),
}

impl ProviderError {
  pub const fn is_stale(&self) -> bool {
    matches!(self, Self::StaleReference)
  }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while locating or using a control.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutomationError {
  /// A predicate search used up its time budget.
  #[error("Find control timeout: {predicate} (traversed {traverse_count} nodes)")]
  NotFound {
    /// Rendered predicate tree.
    predicate: String,
    /// Nodes visited by the last search pass.
    traverse_count: usize,
  },

  /// The node exists but does not expose the capability.
  #[error("The control doesn't support {0}")]
  CapabilityUnsupported(CapabilityId),

  /// Empty predicate or invalid regex. Never retried.
  #[error("Malformed predicate: {0}")]
  MalformedPredicate(String),

  #[error(transparent)]
  Provider(#[from] ProviderError),
}

impl AutomationError {
  /// Whether this error can be cured by re-resolving the handle.
  pub const fn is_stale(&self) -> bool {
    matches!(self, Self::Provider(ProviderError::StaleReference))
  }
}

/// Result type for search and handle operations.
pub type AutomationResult<T> = Result<T, AutomationError>;
