/*!
Lazy depth-first traversal.

Uses an explicit stack with one slot per depth instead of recursion, so very
deep trees can't overflow the call stack. Nothing is fetched until the
consumer asks for the next item: after yielding a node, its next sibling and
first child are only read on the following call.
*/

use super::handle::{ControlHandle, Step};
use crate::provider::TreeProvider;
use crate::types::AutomationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  /// The top itself is due.
  Top,
  /// The top's first child hasn't been read yet.
  Seed,
  Walking,
}

impl Phase {
  const fn initial(include_top: bool) -> Self {
    if include_top {
      Self::Top
    } else {
      Self::Seed
    }
  }
}

/// Pre-order iterator over `(handle, depth)` pairs below a top handle.
///
/// Depth is relative to the top: its children are at depth 1. Nodes deeper
/// than `max_depth` are not visited. A subtree whose children can't be read
/// is skipped.
pub struct TreeWalker<P: TreeProvider> {
  top: ControlHandle<P>,
  include_top: bool,
  max_depth: u32,
  auto_refind: bool,
  phase: Phase,
  /// `slots[d]` holds the next unvisited node at depth `d + 1`.
  slots: Vec<Option<ControlHandle<P>>>,
  /// Last yielded node; its neighbours are read on the next call.
  last: Option<ControlHandle<P>>,
  /// Failure reading the top's first child.
  error: Option<AutomationError>,
}

impl<P: TreeProvider> std::fmt::Debug for TreeWalker<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TreeWalker")
      .field("top", &self.top)
      .field("include_top", &self.include_top)
      .field("max_depth", &self.max_depth)
      .field("depth", &self.slots.len())
      .finish_non_exhaustive()
  }
}

impl<P: TreeProvider> TreeWalker<P> {
  pub(crate) const fn new(
    top: ControlHandle<P>,
    include_top: bool,
    max_depth: u32,
    auto_refind: bool,
  ) -> Self {
    Self {
      top,
      include_top,
      max_depth,
      auto_refind,
      phase: Phase::initial(include_top),
      slots: Vec::new(),
      last: None,
      error: None,
    }
  }

  /// Start over from the top. Already-yielded handles stay valid.
  pub fn restart(&mut self) {
    self.phase = Phase::initial(self.include_top);
    self.slots.clear();
    self.last = None;
    self.error = None;
  }

  /// Why the walk ended early, if the top's children couldn't be read.
  pub const fn error(&self) -> Option<&AutomationError> {
    self.error.as_ref()
  }

  pub(crate) fn take_error(&mut self) -> Option<AutomationError> {
    self.error.take()
  }

  fn step(&mut self, from: &ControlHandle<P>, step: Step, is_top: bool) -> Option<ControlHandle<P>> {
    match from.step(step, self.auto_refind) {
      Ok(next) => next,
      Err(e) => {
        log::debug!("Walk skipped {step:?} of {}: {e}", from.describe());
        if is_top {
          self.error = Some(e);
        }
        None
      }
    }
  }

  fn depth(&self) -> u32 {
    u32::try_from(self.slots.len()).unwrap_or(u32::MAX)
  }

  /// Replace `last` in its slot with its next sibling, then descend into its
  /// children if the depth bound allows.
  fn advance(&mut self, last: &ControlHandle<P>) {
    let depth = self.depth();
    let sibling = self.step(last, Step::NextSibling, false);
    if let Some(slot) = self.slots.last_mut() {
      *slot = sibling;
    }
    if depth < self.max_depth {
      last.mark_walking();
      if let Some(child) = self.step(last, Step::FirstChild, false) {
        self.slots.push(Some(child));
      }
    }
  }
}

impl<P: TreeProvider> Iterator for TreeWalker<P> {
  type Item = (ControlHandle<P>, u32);

  fn next(&mut self) -> Option<Self::Item> {
    if self.phase == Phase::Top {
      self.phase = Phase::Seed;
      return Some((self.top.clone(), 0));
    }

    if self.phase == Phase::Seed {
      self.phase = Phase::Walking;
      if self.max_depth == 0 {
        return None;
      }
      let top = self.top.clone();
      top.mark_walking();
      let first = self.step(&top, Step::FirstChild, true);
      self.slots.push(first);
    }

    if let Some(last) = self.last.take() {
      self.advance(&last);
    }

    loop {
      let depth = self.depth();
      match self.slots.last_mut()?.take() {
        Some(node) => {
          self.last = Some(node.clone());
          return Some((node, depth));
        }
        None => {
          self.slots.pop();
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::a11y::ControlType;
  use crate::memory::{MemoryTree, NodeRef, NodeSpec};
  use crate::provider::TreeProvider;
  use crate::{Automation, UNBOUNDED_DEPTH};

  fn named(name: &str) -> NodeSpec {
    NodeSpec::new(ControlType::Custom).name(name)
  }

  /// root > a > (a1 > a11), a2 ; root > b
  fn small() -> Automation<MemoryTree> {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    let a = tree.add_child(root, named("a"));
    let a1 = tree.add_child(a, named("a1"));
    tree.add_child(a1, named("a11"));
    tree.add_child(a, named("a2"));
    tree.add_child(root, named("b"));
    Automation::new(tree)
  }

  fn names(walker: TreeWalker<MemoryTree>) -> Vec<(String, u32)> {
    walker
      .map(|(h, depth)| (h.peek(|p, n| p.name(n)).unwrap_or_default(), depth))
      .collect()
  }

  fn pairs(items: &[(&str, u32)]) -> Vec<(String, u32)> {
    items.iter().map(|(n, d)| ((*n).to_string(), *d)).collect()
  }

  #[test]
  fn pre_order_with_depths() {
    let automation = small();
    assert_eq!(
      names(automation.walk(false, UNBOUNDED_DEPTH)),
      pairs(&[("a", 1), ("a1", 2), ("a11", 3), ("a2", 2), ("b", 1)])
    );
  }

  #[test]
  fn include_top_yields_top_first() {
    let automation = small();
    let walked = names(automation.walk(true, 1));
    assert_eq!(walked, pairs(&[("Desktop", 0), ("a", 1), ("b", 1)]));
  }

  #[test]
  fn depth_zero_yields_only_top() {
    let automation = small();
    assert_eq!(names(automation.walk(true, 0)), pairs(&[("Desktop", 0)]));
    assert!(names(automation.walk(false, 0)).is_empty());
  }

  #[test]
  fn depth_bound_prunes_subtrees() {
    let automation = small();
    assert_eq!(
      names(automation.walk(false, 2)),
      pairs(&[("a", 1), ("a1", 2), ("a2", 2), ("b", 1)])
    );
  }

  #[test]
  fn leaf_top_yields_nothing() -> crate::AutomationResult<()> {
    let automation = small();
    let b = automation
      .locate(crate::SearchPredicate::new().name("b"))
      .handle();
    b.ensure()?;
    assert!(names(b.walk(false, UNBOUNDED_DEPTH)).is_empty());
    Ok(())
  }

  #[test]
  fn walk_is_lazy() {
    let automation = small();
    let tree = automation.provider();
    tree.reset_call_count();
    let mut walker = automation.walk(false, UNBOUNDED_DEPTH);
    assert_eq!(tree.call_count(), 0);
    walker.next();
    let after_first = tree.call_count();
    walker.next();
    assert!(tree.call_count() > after_first);
  }

  #[test]
  fn restart_replays_the_walk() {
    let automation = small();
    let mut walker = automation.walk(true, UNBOUNDED_DEPTH);
    let first: Vec<_> = walker.by_ref().map(|(_, d)| d).collect();
    walker.restart();
    let second: Vec<_> = walker.map(|(_, d)| d).collect();
    assert_eq!(first, second);
    assert_eq!(first, [0, 1, 2, 3, 2, 1]);
  }

  #[test]
  fn stale_top_reports_error() {
    let automation = small();
    let tree = automation.provider();
    let a = tree.first_child(&tree.root_node()).ok().flatten();
    let Some(a) = a else {
      panic!("fixture has children");
    };
    let handle = automation.from_node(a);
    tree.remove(a);

    let mut walker = TreeWalker::new(handle, false, UNBOUNDED_DEPTH, false);
    assert!(walker.next().is_none());
    assert!(walker.error().is_some_and(AutomationError::is_stale));
  }

  #[test]
  fn removed_subtree_is_skipped_mid_walk() {
    let automation = small();
    let tree = automation.provider();
    let mut walker = TreeWalker::new(automation.root(), false, UNBOUNDED_DEPTH, false);
    let (a, _) = walker.next().unwrap_or_else(|| panic!("fixture has children"));
    if let Some(node) = a.cached_node() {
      tree.remove(node);
    }
    assert_eq!(walker.count(), 0, "siblings and children of a removed node are unreachable");
  }

  #[test]
  fn walks_deep_chains_without_recursion() {
    let tree = MemoryTree::new();
    let mut parent = tree.root_node();
    for i in 0..20_000 {
      parent = tree.add_child(parent, named(&i.to_string()));
    }
    let automation = Automation::new(tree);
    let last = automation.walk(false, UNBOUNDED_DEPTH).last().map(|(_, d)| d);
    assert_eq!(last, Some(20_000));
  }

  mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Recursive reference traversal straight over the provider.
    fn reference(tree: &MemoryTree, node: NodeRef, depth: u32, max: u32, out: &mut Vec<(NodeRef, u32)>) {
      if depth >= max {
        return;
      }
      let mut child = tree.first_child(&node).ok().flatten();
      while let Some(c) = child {
        out.push((c, depth + 1));
        reference(tree, c, depth + 1, max, out);
        child = tree.next_sibling(&c).ok().flatten();
      }
    }

    /// Each entry picks a parent among the nodes created so far.
    fn build(parents: &[usize]) -> MemoryTree {
      let tree = MemoryTree::new();
      let mut created = vec![tree.root_node()];
      for (i, pick) in parents.iter().enumerate() {
        let parent = created[pick % created.len()];
        created.push(tree.add_child(parent, named(&i.to_string())));
      }
      tree
    }

    proptest! {
      #[test]
      fn matches_recursive_pre_order(
        parents in prop::collection::vec(0usize..64, 0..60),
        max_depth in 0u32..8,
        include_top in any::<bool>(),
      ) {
        let tree = build(&parents);
        let mut expected = Vec::new();
        if include_top {
          expected.push((tree.root_node(), 0));
        }
        reference(&tree, tree.root_node(), 0, max_depth, &mut expected);

        let automation = Automation::new(tree);
        let walked: Vec<_> = automation
          .walk(include_top, max_depth)
          .filter_map(|(h, d)| h.cached_node().map(|n| (n, d)))
          .collect();
        prop_assert_eq!(walked, expected);
      }

      #[test]
      fn search_finds_kth_in_walk_order(
        parents in prop::collection::vec(0usize..16, 1..40),
        k in 1u32..6,
      ) {
        let tree = build(&parents);
        let mut order = Vec::new();
        reference(&tree, tree.root_node(), 0, u32::MAX, &mut order);

        // Nodes named with an even number match.
        let even: Vec<_> = order
          .iter()
          .filter(|(n, _)| tree.name(n).is_ok_and(|s| s.parse::<u32>().is_ok_and(|v| v % 2 == 0)))
          .copied()
          .collect();

        let automation = Automation::new(tree);
        let predicate = crate::SearchPredicate::new()
          .regex_name("[0-9]*[02468]")
          .unwrap_or_else(|e| panic!("{e}"));
        let found = automation
          .search(&automation.root(), &predicate, UNBOUNDED_DEPTH, k)
          .unwrap_or_else(|e| panic!("{e}"));

        let expected = usize::try_from(k - 1).ok().and_then(|i| even.get(i)).copied();
        prop_assert_eq!(found.and_then(|f| f.handle.cached_node().map(|n| (n, f.depth))), expected);
      }
    }
  }
}
