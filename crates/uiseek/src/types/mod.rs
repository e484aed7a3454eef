/*! Core types shared across the crate. */

#![allow(missing_docs)]

mod error;
mod geometry;
mod ids;

pub use error::{AutomationError, AutomationResult, ProviderError, ProviderResult};
pub use geometry::Rect;
pub use ids::{ProcessId, WindowHandle};
