/*!
Lazy control handles.

A [`ControlHandle`] records how to find a node (predicate, search root, depth
bound, match index) and caches the native reference once found. Consuming operations reuse the
cached reference and resolve only when nothing is cached; capability queries
and focus changes always re-resolve first. Every one runs under a
stale-reference guard: if the native layer rejects the cached reference, the
handle is invalidated and resolved again, up to
[`SearchConfig::stale_retry_limit`](crate::SearchConfig::stale_retry_limit)
times within one timeout budget.

Handles are shared: cloning yields the same logical handle, and resolving
through any clone updates the cache for all of them.

Handles produced by [`ControlHandle::first_child`] and
[`ControlHandle::next_sibling`] remember the handle they were derived from,
so they can be re-derived with a single native call instead of a search.
*/

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use super::{deadline_after, Locator, Shared, TreeWalker, UNBOUNDED_DEPTH};
use crate::a11y::{CapabilityId, ControlType};
use crate::predicate::SearchPredicate;
use crate::provider::TreeProvider;
use crate::types::{
  AutomationError, AutomationResult, ProcessId, ProviderResult, Rect, WindowHandle,
};

/// One navigation primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
  FirstChild,
  NextSibling,
}

impl Step {
  pub(crate) fn call<P: TreeProvider>(
    self,
    provider: &P,
    node: &P::Node,
  ) -> ProviderResult<Option<P::Node>> {
    match self {
      Self::FirstChild => provider.first_child(node),
      Self::NextSibling => provider.next_sibling(node),
    }
  }
}

/// "This handle is the `step` of `from`." Weak, so dropping the origin simply
/// disables the shortcut.
pub(crate) struct Lineage<P: TreeProvider> {
  pub(crate) step: Step,
  pub(crate) from: Weak<Mutex<HandleState<P>>>,
}

pub(crate) struct HandleState<P: TreeProvider> {
  pub(crate) predicate: Option<Arc<SearchPredicate<P>>>,
  /// `None` means the tree root.
  pub(crate) search_root: Option<ControlHandle<P>>,
  pub(crate) search_depth: u32,
  /// 1-based.
  pub(crate) found_index: u32,
  pub(crate) cached: Option<P::Node>,
  pub(crate) is_root: bool,
  pub(crate) directly_assigned: bool,
  pub(crate) lineage: Option<Lineage<P>>,
  /// Set by the walker right before it asks for this handle's first child;
  /// suppresses lineage tagging for that one call.
  pub(crate) walking: bool,
  pub(crate) traverse_count: usize,
}

impl<P: TreeProvider> HandleState<P> {
  fn blank() -> Self {
    Self {
      predicate: None,
      search_root: None,
      search_depth: UNBOUNDED_DEPTH,
      found_index: 1,
      cached: None,
      is_root: false,
      directly_assigned: false,
      lineage: None,
      walking: false,
      traverse_count: 0,
    }
  }
}

/// Lazily resolved reference to a control in the live tree.
pub struct ControlHandle<P: TreeProvider> {
  pub(crate) shared: Arc<Shared<P>>,
  state: Arc<Mutex<HandleState<P>>>,
}

impl<P: TreeProvider> Clone for ControlHandle<P> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
      state: Arc::clone(&self.state),
    }
  }
}

impl<P: TreeProvider> std::fmt::Debug for ControlHandle<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let (cached, is_root, depth, index) = self.read(|s| {
      (
        s.cached.clone(),
        s.is_root,
        s.search_depth,
        s.found_index,
      )
    });
    f.debug_struct("ControlHandle")
      .field("predicate", &self.describe())
      .field("cached", &cached)
      .field("is_root", &is_root)
      .field("search_depth", &depth)
      .field("found_index", &index)
      .finish_non_exhaustive()
  }
}

impl<P: TreeProvider> ControlHandle<P> {
  fn with_state(shared: &Arc<Shared<P>>, state: HandleState<P>) -> Self {
    Self {
      shared: Arc::clone(shared),
      state: Arc::new(Mutex::new(state)),
    }
  }

  pub(crate) fn root(shared: &Arc<Shared<P>>) -> Self {
    Self::with_state(
      shared,
      HandleState {
        cached: Some(shared.provider.root()),
        is_root: true,
        ..HandleState::blank()
      },
    )
  }

  pub(crate) fn assigned(
    shared: &Arc<Shared<P>>,
    node: P::Node,
    lineage: Option<Lineage<P>>,
  ) -> Self {
    Self::with_state(
      shared,
      HandleState {
        cached: Some(node),
        directly_assigned: true,
        lineage,
        ..HandleState::blank()
      },
    )
  }

  pub(crate) fn searchable(
    shared: &Arc<Shared<P>>,
    predicate: SearchPredicate<P>,
    search_root: Option<Self>,
    search_depth: u32,
    found_index: u32,
  ) -> Self {
    Self::with_state(
      shared,
      HandleState {
        predicate: Some(Arc::new(predicate)),
        search_root,
        search_depth,
        found_index,
        ..HandleState::blank()
      },
    )
  }

  /// Read handle state. Never call the provider or other handles inside the closure.
  pub(crate) fn read<R>(&self, f: impl FnOnce(&HandleState<P>) -> R) -> R {
    f(&self.state.lock())
  }

  /// Write handle state. Never call the provider or other handles inside the closure.
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut HandleState<P>) -> R) -> R {
    f(&mut self.state.lock())
  }

  pub(crate) fn upgrade(&self, from: &Weak<Mutex<HandleState<P>>>) -> Option<Self> {
    from.upgrade().map(|state| Self {
      shared: Arc::clone(&self.shared),
      state,
    })
  }

  pub(crate) fn provider(&self) -> &P {
    &self.shared.provider
  }

  /// Whether both values are the same logical handle.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.state, &other.state)
  }

  /// Whether this is the tree-root handle.
  pub fn is_root(&self) -> bool {
    self.read(|s| s.is_root)
  }

  /// The native reference as currently cached, without resolving.
  pub fn cached_node(&self) -> Option<P::Node> {
    self.read(|s| s.cached.clone())
  }

  /// Nodes visited by the search pass that last found this handle.
  pub fn traverse_count(&self) -> usize {
    self.read(|s| s.traverse_count)
  }

  /// Rendered predicate, used in logs and errors.
  pub fn describe(&self) -> String {
    let (predicate, is_root) = self.read(|s| (s.predicate.clone(), s.is_root));
    match predicate {
      Some(predicate) => predicate.to_string(),
      None if is_root => "{Root}".to_string(),
      None => "{Assigned}".to_string(),
    }
  }

  pub(crate) fn not_found(&self) -> AutomationError {
    AutomationError::NotFound {
      predicate: self.describe(),
      traverse_count: self.traverse_count(),
    }
  }

  /// Start describing a handle searched for below this one.
  pub fn locate(&self, predicate: SearchPredicate<P>) -> Locator<P> {
    Locator::new(&self.shared, predicate, Some(self.clone()))
  }

  /// Drop the cached reference so the next use resolves again.
  /// Directly-assigned handles keep theirs: they have nothing to re-search with.
  pub(crate) fn invalidate(&self) {
    let root = self.is_root().then(|| self.provider().root());
    self.write(|s| {
      if s.is_root {
        s.cached = root;
      } else if s.predicate.is_some() || s.lineage.is_some() {
        s.cached = None;
      }
    });
  }

  pub(crate) fn mark_walking(&self) {
    self.write(|s| s.walking = true);
  }

  /// Run `op` on the cached reference as-is: no resolution, no retry.
  pub(crate) fn peek<R>(
    &self,
    op: impl FnOnce(&P, &P::Node) -> ProviderResult<R>,
  ) -> AutomationResult<R> {
    let node = self.cached_node().ok_or_else(|| self.not_found())?;
    Ok(op(self.provider(), &node)?)
  }

  /// Run `op` on the cached reference, resolving first only if nothing is
  /// cached. Recovers from stale references.
  pub(crate) fn guarded<R>(
    &self,
    op: impl Fn(&P, &P::Node) -> ProviderResult<R>,
  ) -> AutomationResult<R> {
    self.run_guarded(false, op)
  }

  /// Like [`guarded`](Self::guarded), but always re-resolves first.
  pub(crate) fn refreshed<R>(
    &self,
    op: impl Fn(&P, &P::Node) -> ProviderResult<R>,
  ) -> AutomationResult<R> {
    self.run_guarded(true, op)
  }

  fn run_guarded<R>(
    &self,
    mut refind: bool,
    op: impl Fn(&P, &P::Node) -> ProviderResult<R>,
  ) -> AutomationResult<R> {
    let config = self.shared.config;
    let deadline = deadline_after(config.timeout);
    let mut recoveries = 0;
    loop {
      let node = match self.cached_node() {
        Some(node) if !refind => node,
        _ => self.resolved_until(deadline, config.poll_interval)?,
      };
      match op(self.provider(), &node) {
        Err(e) if e.is_stale() && recoveries < config.stale_retry_limit => {
          recoveries += 1;
          log::debug!(
            "Stale reference for {}, resolving again ({recoveries}/{})",
            self.describe(),
            config.stale_retry_limit
          );
          self.invalidate();
          refind = true;
        }
        result => return result.map_err(AutomationError::from),
      }
    }
  }

  /// The native reference, resolving first if nothing is cached.
  pub fn node(&self) -> AutomationResult<P::Node> {
    self.guarded(|_, node| Ok(node.clone()))
  }

  pub fn name(&self) -> AutomationResult<String> {
    self.guarded(|p, n| p.name(n))
  }

  pub fn class_name(&self) -> AutomationResult<String> {
    self.guarded(|p, n| p.class_name(n))
  }

  pub fn automation_id(&self) -> AutomationResult<String> {
    self.guarded(|p, n| p.automation_id(n))
  }

  pub fn control_type(&self) -> AutomationResult<ControlType> {
    self.guarded(|p, n| p.control_type(n))
  }

  pub fn bounding_rectangle(&self) -> AutomationResult<Rect> {
    self.guarded(|p, n| p.bounding_rectangle(n))
  }

  pub fn native_window_handle(&self) -> AutomationResult<WindowHandle> {
    self.guarded(|p, n| p.native_window_handle(n))
  }

  pub fn process_id(&self) -> AutomationResult<ProcessId> {
    self.guarded(|p, n| p.process_id(n))
  }

  /// Query a capability.
  ///
  /// Fails with [`AutomationError::CapabilityUnsupported`] when the node
  /// exists but doesn't expose `id`. Always re-resolves first.
  pub fn capability(&self, id: CapabilityId) -> AutomationResult<P::Capability> {
    self
      .refreshed(|p, n| p.capability(n, id))?
      .ok_or(AutomationError::CapabilityUnsupported(id))
  }

  /// Move keyboard focus to this control. Always re-resolves first.
  pub fn set_focus(&self) -> AutomationResult<()> {
    self.refreshed(|p, n| p.set_focus(n))
  }

  /// First child, or `None` for a leaf.
  pub fn first_child(&self) -> AutomationResult<Option<Self>> {
    self.step(Step::FirstChild, true)
  }

  /// Next sibling in document order, or `None` for the last child.
  pub fn next_sibling(&self) -> AutomationResult<Option<Self>> {
    self.step(Step::NextSibling, true)
  }

  /// Parent, or `None` for the root.
  pub fn parent(&self) -> AutomationResult<Option<Self>> {
    let parent = self.guarded(|p, n| p.parent(n))?;
    Ok(parent.map(|node| Self::assigned(&self.shared, node, None)))
  }

  /// Navigate one step. The new handle is tagged with its lineage unless the
  /// walker flagged this handle, in which case the flag is consumed instead.
  pub(crate) fn step(&self, step: Step, auto_refind: bool) -> AutomationResult<Option<Self>> {
    let walking = self.write(|s| std::mem::take(&mut s.walking));
    let next = if auto_refind {
      self.guarded(|p, n| step.call(p, n))?
    } else {
      self.peek(|p, n| step.call(p, n))?
    };
    Ok(next.map(|node| {
      let lineage = (!walking).then(|| Lineage {
        step,
        from: Arc::downgrade(&self.state),
      });
      Self::assigned(&self.shared, node, lineage)
    }))
  }

  /// Depth-first walk of the subtree below this handle, re-resolving each
  /// handle before reading its neighbours.
  pub fn walk(&self, include_top: bool, max_depth: u32) -> TreeWalker<P> {
    TreeWalker::new(self.clone(), include_top, max_depth, true)
  }
}
