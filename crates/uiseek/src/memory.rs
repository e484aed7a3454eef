/*!
In-memory tree provider.

A [`TreeProvider`] over an arena of nodes. Useful for exercising searches
without an OS accessibility layer, and for simulating a live UI: nodes can be
added, renamed and removed while handles into the tree are held, and removed
nodes answer every call with [`ProviderError::StaleReference`] just like an
expired native reference.

```
use uiseek::a11y::ControlType;
use uiseek::memory::{MemoryTree, NodeSpec};

let tree = MemoryTree::new();
let window = tree.add_child(tree.root_node(), NodeSpec::new(ControlType::Window).name("Editor"));
let ok = tree.add_child(window, NodeSpec::new(ControlType::Button).name("OK"));
tree.remove(ok);
assert_eq!(tree.len(), 2);
```
*/

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::a11y::{CapabilityId, ControlType};
use crate::provider::TreeProvider;
use crate::types::{ProcessId, ProviderError, ProviderResult, Rect, WindowHandle};

/// Reference to a node of a [`MemoryTree`]. Stays valid (but stale) after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
  /// Arena index, in creation order. The root is 0.
  pub const fn index(self) -> usize {
    self.0
  }
}

/// Attributes of a node to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct NodeSpec {
  control_type: ControlType,
  class_name: String,
  automation_id: String,
  name: String,
  rect: Rect,
  window_handle: WindowHandle,
  process_id: ProcessId,
}

impl NodeSpec {
  /// A node of the given type with empty attributes.
  pub fn new(control_type: ControlType) -> Self {
    Self {
      control_type,
      class_name: String::new(),
      automation_id: String::new(),
      name: String::new(),
      rect: Rect::default(),
      window_handle: WindowHandle::default(),
      process_id: ProcessId(0),
    }
  }

  /// Display name.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Native class name.
  pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
    self.class_name = class_name.into();
    self
  }

  /// Automation id.
  pub fn automation_id(mut self, automation_id: impl Into<String>) -> Self {
    self.automation_id = automation_id.into();
    self
  }

  /// Bounding rectangle.
  pub const fn rect(mut self, rect: Rect) -> Self {
    self.rect = rect;
    self
  }

  /// Native window handle.
  pub const fn window_handle(mut self, handle: u64) -> Self {
    self.window_handle = WindowHandle(handle);
    self
  }

  /// Owning process.
  pub const fn process_id(mut self, pid: u32) -> Self {
    self.process_id = ProcessId(pid);
    self
  }
}

/// Capability object handed out by [`MemoryTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCapability {
  /// Which capability this is.
  pub id: CapabilityId,
  summary: Option<String>,
  broken: bool,
}

struct MemoryNode {
  spec: NodeSpec,
  parent: Option<NodeRef>,
  children: Vec<NodeRef>,
  alive: bool,
  focused: bool,
  capabilities: HashMap<CapabilityId, MemoryCapability>,
}

impl MemoryNode {
  fn new(spec: NodeSpec, parent: Option<NodeRef>) -> Self {
    Self {
      spec,
      parent,
      children: Vec::new(),
      alive: true,
      focused: false,
      capabilities: HashMap::new(),
    }
  }
}

/// Mutable in-memory accessibility tree.
pub struct MemoryTree {
  nodes: RwLock<Vec<MemoryNode>>,
  calls: AtomicUsize,
}

impl std::fmt::Debug for MemoryTree {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryTree")
      .field("len", &self.len())
      .finish_non_exhaustive()
  }
}

impl Default for MemoryTree {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryTree {
  /// Tree containing only the desktop root.
  pub fn new() -> Self {
    let root = NodeSpec::new(ControlType::Pane)
      .name("Desktop")
      .class_name("#32769");
    Self {
      nodes: RwLock::new(vec![MemoryNode::new(root, None)]),
      calls: AtomicUsize::new(0),
    }
  }

  /// The desktop root.
  pub const fn root_node(&self) -> NodeRef {
    NodeRef(0)
  }

  /// Number of live nodes, root included.
  pub fn len(&self) -> usize {
    self.nodes.read().iter().filter(|n| n.alive).count()
  }

  /// Always false: the root cannot be removed.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Append a child under `parent`.
  pub fn add_child(&self, parent: NodeRef, spec: NodeSpec) -> NodeRef {
    let mut nodes = self.nodes.write();
    let id = NodeRef(nodes.len());
    nodes.push(MemoryNode::new(spec, Some(parent)));
    if let Some(p) = nodes.get_mut(parent.0) {
      p.children.push(id);
    }
    id
  }

  /// Insert a child under `parent` at `position` (clamped to the child count).
  pub fn insert_child_at(&self, parent: NodeRef, position: usize, spec: NodeSpec) -> NodeRef {
    let mut nodes = self.nodes.write();
    let id = NodeRef(nodes.len());
    nodes.push(MemoryNode::new(spec, Some(parent)));
    if let Some(p) = nodes.get_mut(parent.0) {
      let at = position.min(p.children.len());
      p.children.insert(at, id);
    }
    id
  }

  /// Remove a node and its subtree. References to removed nodes become stale.
  /// Iterative to avoid stack overflow on deep trees.
  pub fn remove(&self, node: NodeRef) {
    if node == self.root_node() {
      return;
    }
    let mut nodes = self.nodes.write();
    let parent = nodes.get(node.0).and_then(|n| n.parent);
    if let Some(p) = parent.and_then(|p| nodes.get_mut(p.0)) {
      p.children.retain(|&c| c != node);
    }

    let mut queue = vec![node];
    while let Some(id) = queue.pop() {
      if let Some(n) = nodes.get_mut(id.0) {
        n.alive = false;
        queue.append(&mut n.children);
      }
    }
  }

  /// Change a node's display name.
  pub fn rename(&self, node: NodeRef, name: impl Into<String>) {
    if let Some(n) = self.nodes.write().get_mut(node.0) {
      n.spec.name = name.into();
    }
  }

  /// Expose a capability on `node`, with an optional state summary for dumps.
  pub fn add_capability(&self, node: NodeRef, id: CapabilityId, summary: Option<&str>) {
    self.insert_capability(
      node,
      MemoryCapability {
        id,
        summary: summary.map(str::to_string),
        broken: false,
      },
    );
  }

  /// Expose a capability whose state cannot be read.
  pub fn add_broken_capability(&self, node: NodeRef, id: CapabilityId) {
    self.insert_capability(
      node,
      MemoryCapability {
        id,
        summary: None,
        broken: true,
      },
    );
  }

  fn insert_capability(&self, node: NodeRef, capability: MemoryCapability) {
    if let Some(n) = self.nodes.write().get_mut(node.0) {
      n.capabilities.insert(capability.id, capability);
    }
  }

  /// Whether `node` currently holds keyboard focus.
  pub fn is_focused(&self, node: NodeRef) -> bool {
    self.nodes.read().get(node.0).is_some_and(|n| n.focused)
  }

  /// Native calls served so far.
  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::Relaxed)
  }

  /// Reset the native call counter.
  pub fn reset_call_count(&self) {
    self.calls.store(0, Ordering::Relaxed);
  }

  /// Run `f` against a live node, counting the call.
  fn with_live<R>(
    &self,
    node: NodeRef,
    f: impl FnOnce(&[MemoryNode], &MemoryNode) -> R,
  ) -> ProviderResult<R> {
    self.calls.fetch_add(1, Ordering::Relaxed);
    let nodes = self.nodes.read();
    let entry = nodes
      .get(node.0)
      .ok_or_else(|| ProviderError::Native(format!("unknown node {}", node.0)))?;
    if !entry.alive {
      return Err(ProviderError::StaleReference);
    }
    Ok(f(&nodes, entry))
  }
}

impl TreeProvider for MemoryTree {
  type Node = NodeRef;
  type Capability = MemoryCapability;

  fn root(&self) -> NodeRef {
    self.root_node()
  }

  fn first_child(&self, node: &NodeRef) -> ProviderResult<Option<NodeRef>> {
    self.with_live(*node, |_, n| n.children.first().copied())
  }

  fn next_sibling(&self, node: &NodeRef) -> ProviderResult<Option<NodeRef>> {
    self.with_live(*node, |nodes, n| {
      let siblings = &nodes.get(n.parent?.0)?.children;
      let position = siblings.iter().position(|c| c == node)?;
      siblings.get(position + 1).copied()
    })
  }

  fn parent(&self, node: &NodeRef) -> ProviderResult<Option<NodeRef>> {
    self.with_live(*node, |_, n| n.parent)
  }

  fn capability(
    &self,
    node: &NodeRef,
    id: CapabilityId,
  ) -> ProviderResult<Option<MemoryCapability>> {
    self.with_live(*node, |_, n| n.capabilities.get(&id).cloned())
  }

  fn control_type(&self, node: &NodeRef) -> ProviderResult<ControlType> {
    self.with_live(*node, |_, n| n.spec.control_type)
  }

  fn class_name(&self, node: &NodeRef) -> ProviderResult<String> {
    self.with_live(*node, |_, n| n.spec.class_name.clone())
  }

  fn automation_id(&self, node: &NodeRef) -> ProviderResult<String> {
    self.with_live(*node, |_, n| n.spec.automation_id.clone())
  }

  fn name(&self, node: &NodeRef) -> ProviderResult<String> {
    self.with_live(*node, |_, n| n.spec.name.clone())
  }

  fn bounding_rectangle(&self, node: &NodeRef) -> ProviderResult<Rect> {
    self.with_live(*node, |_, n| n.spec.rect)
  }

  fn native_window_handle(&self, node: &NodeRef) -> ProviderResult<WindowHandle> {
    self.with_live(*node, |_, n| n.spec.window_handle)
  }

  fn process_id(&self, node: &NodeRef) -> ProviderResult<ProcessId> {
    self.with_live(*node, |_, n| n.spec.process_id)
  }

  fn set_focus(&self, node: &NodeRef) -> ProviderResult<()> {
    self.with_live(*node, |_, _| ())?;
    let mut nodes = self.nodes.write();
    for n in nodes.iter_mut() {
      n.focused = false;
    }
    if let Some(n) = nodes.get_mut(node.0) {
      n.focused = true;
    }
    Ok(())
  }

  fn describe_capability(
    &self,
    id: CapabilityId,
    capability: &MemoryCapability,
  ) -> ProviderResult<Option<String>> {
    if capability.broken {
      return Err(ProviderError::Native(format!("{id} state unavailable")));
    }
    Ok(capability.summary.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn button(name: &str) -> NodeSpec {
    NodeSpec::new(ControlType::Button).name(name)
  }

  #[test]
  fn navigation_follows_insertion_order() {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    let a = tree.add_child(root, button("a"));
    let b = tree.add_child(root, button("b"));
    let a1 = tree.add_child(a, button("a1"));

    assert_eq!(tree.first_child(&root), Ok(Some(a)));
    assert_eq!(tree.next_sibling(&a), Ok(Some(b)));
    assert_eq!(tree.next_sibling(&b), Ok(None));
    assert_eq!(tree.first_child(&a), Ok(Some(a1)));
    assert_eq!(tree.first_child(&b), Ok(None));
    assert_eq!(tree.parent(&a1), Ok(Some(a)));
    assert_eq!(tree.parent(&root), Ok(None));
    assert_eq!(tree.next_sibling(&root), Ok(None));
  }

  #[test]
  fn insert_at_position() {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    let a = tree.add_child(root, button("a"));
    let c = tree.add_child(root, button("c"));
    let b = tree.insert_child_at(root, 1, button("b"));
    let front = tree.insert_child_at(root, 0, button("front"));

    assert_eq!(tree.first_child(&root), Ok(Some(front)));
    assert_eq!(tree.next_sibling(&front), Ok(Some(a)));
    assert_eq!(tree.next_sibling(&a), Ok(Some(b)));
    assert_eq!(tree.next_sibling(&b), Ok(Some(c)));
  }

  #[test]
  fn removed_subtree_is_stale() {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    let a = tree.add_child(root, button("a"));
    let a1 = tree.add_child(a, button("a1"));
    let b = tree.add_child(root, button("b"));

    tree.remove(a);

    assert_eq!(tree.name(&a), Err(ProviderError::StaleReference));
    assert_eq!(tree.parent(&a1), Err(ProviderError::StaleReference));
    assert_eq!(tree.first_child(&root), Ok(Some(b)));
    assert_eq!(tree.len(), 2);
  }

  #[test]
  fn root_cannot_be_removed() {
    let tree = MemoryTree::new();
    tree.remove(tree.root_node());
    assert_eq!(tree.len(), 1);
    assert!(!tree.is_empty());
  }

  #[test]
  fn capabilities_are_per_node() {
    let tree = MemoryTree::new();
    let edit = tree.add_child(tree.root_node(), NodeSpec::new(ControlType::Edit));
    tree.add_capability(edit, CapabilityId::Value, Some("ValuePattern.Value: \"hi\""));

    let value = tree.capability(&edit, CapabilityId::Value).ok().flatten();
    assert_eq!(value.as_ref().map(|c| c.id), Some(CapabilityId::Value));
    assert_eq!(tree.capability(&edit, CapabilityId::Toggle), Ok(None));
  }

  #[test]
  fn calls_are_counted() {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    tree.reset_call_count();
    let _ = tree.first_child(&root);
    let _ = tree.name(&root);
    assert_eq!(tree.call_count(), 2);
  }

  #[test]
  fn set_focus_moves_focus() {
    let tree = MemoryTree::new();
    let a = tree.add_child(tree.root_node(), button("a"));
    let b = tree.add_child(tree.root_node(), button("b"));
    assert_eq!(tree.set_focus(&a), Ok(()));
    assert_eq!(tree.set_focus(&b), Ok(()));
    assert!(!tree.is_focused(a));
    assert!(tree.is_focused(b));
  }
}
