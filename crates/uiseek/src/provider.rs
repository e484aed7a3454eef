/*!
Native tree provider abstraction.

This trait is the contract between the search engine and the operating
system's accessibility layer. Core code only uses this trait - never
platform-specific types directly.

Every call may fail: native references expire whenever the UI changes, and
the provider reports that as [`ProviderError::StaleReference`]. Staleness is
never detectable ahead of time, only when a call is attempted.
*/

use std::fmt::Debug;
use std::hash::Hash;

use crate::a11y::{CapabilityId, ControlType};
use crate::types::{ProcessId, ProviderError, ProviderResult, Rect, WindowHandle};

/// Access to a live accessibility tree.
///
/// All navigation primitives return `Ok(None)` for "no such node", and an
/// error only when the native layer rejects the call.
pub trait TreeProvider: 'static {
  /// Opaque native reference. Clone is expected to be cheap (reference counted).
  type Node: Clone + Eq + Hash + Debug;

  /// Opaque capability (pattern) object.
  type Capability;

  /// The root of the tree (the desktop). Always present.
  fn root(&self) -> Self::Node;

  /// First child of `node` in document order.
  fn first_child(&self, node: &Self::Node) -> ProviderResult<Option<Self::Node>>;

  /// Next sibling of `node` in document order.
  fn next_sibling(&self, node: &Self::Node) -> ProviderResult<Option<Self::Node>>;

  /// Parent of `node`. `None` for the root.
  fn parent(&self, node: &Self::Node) -> ProviderResult<Option<Self::Node>>;

  /// Query a capability. `Ok(None)` when the node does not expose it.
  fn capability(
    &self,
    node: &Self::Node,
    id: CapabilityId,
  ) -> ProviderResult<Option<Self::Capability>>;

  /// Control type, matched exactly by predicates.
  fn control_type(&self, node: &Self::Node) -> ProviderResult<ControlType>;

  /// Native class name.
  fn class_name(&self, node: &Self::Node) -> ProviderResult<String>;

  /// Automation id assigned by the application. Often empty.
  fn automation_id(&self, node: &Self::Node) -> ProviderResult<String>;

  /// Display name.
  fn name(&self, node: &Self::Node) -> ProviderResult<String>;

  /// Bounding rectangle in screen pixels.
  fn bounding_rectangle(&self, node: &Self::Node) -> ProviderResult<Rect>;

  /// Native window handle, zero for windowless nodes.
  fn native_window_handle(&self, node: &Self::Node) -> ProviderResult<WindowHandle>;

  /// Owning process.
  fn process_id(&self, node: &Self::Node) -> ProviderResult<ProcessId>;

  /// Move keyboard focus to `node`.
  fn set_focus(&self, _node: &Self::Node) -> ProviderResult<()> {
    Err(ProviderError::Unsupported("set_focus"))
  }

  /// One-line rendering of a capability's current state for diagnostic dumps,
  /// e.g. `ValuePattern.Value: "hello"`.
  fn describe_capability(
    &self,
    _id: CapabilityId,
    _capability: &Self::Capability,
  ) -> ProviderResult<Option<String>> {
    Ok(None)
  }
}
