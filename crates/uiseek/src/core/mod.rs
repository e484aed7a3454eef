/*!
Core automation instance - owns the provider and hands out lazy control handles.

# Module Structure

- `mod.rs` - Automation struct, construction, locators, top-level search entry points
- `handle.rs` - `ControlHandle`: cached reference, guarded accessors, lineage-tagged traversal
- `resolve.rs` - existence checks, the resolution state machine, single search passes
- `walker.rs` - lazy depth-first `TreeWalker`

# Example

```
use uiseek::a11y::ControlType;
use uiseek::memory::{MemoryTree, NodeSpec};
use uiseek::{Automation, SearchPredicate};

let tree = MemoryTree::new();
let window = tree.add_child(tree.root_node(), NodeSpec::new(ControlType::Window).name("Editor"));
tree.add_child(window, NodeSpec::new(ControlType::Button).name("OK"));

let automation = Automation::new(tree);
let editor = automation
  .locate(SearchPredicate::new().control_type(ControlType::Window).name("Editor"))
  .depth(1)
  .handle();
let ok = editor
  .locate(SearchPredicate::new().control_type(ControlType::Button).name("OK"))
  .handle();

assert_eq!(ok.name()?, "OK");
# Ok::<(), uiseek::AutomationError>(())
```
*/

mod handle;
mod resolve;
mod walker;

pub use handle::ControlHandle;
pub use resolve::Found;
pub use walker::TreeWalker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SearchConfig;
use crate::predicate::SearchPredicate;
use crate::provider::TreeProvider;
use crate::types::AutomationResult;

/// Search depth meaning "no limit".
pub const UNBOUNDED_DEPTH: u32 = u32::MAX;

/// Fallback horizon for budgets too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// State shared by an automation instance and all of its handles.
pub(crate) struct Shared<P: TreeProvider> {
  pub(crate) provider: P,
  pub(crate) config: SearchConfig,
}

/// Entry point: a provider plus search configuration.
///
/// Clone is cheap (Arc bump). Handles keep the shared state alive on their own,
/// so an `Automation` may be dropped while handles are still in use.
pub struct Automation<P: TreeProvider> {
  shared: Arc<Shared<P>>,
}

impl<P: TreeProvider> Clone for Automation<P> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<P: TreeProvider> std::fmt::Debug for Automation<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Automation")
      .field("config", &self.shared.config)
      .finish_non_exhaustive()
  }
}

/// Builder for configuring an Automation instance.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use uiseek::memory::MemoryTree;
/// use uiseek::AutomationBuilder;
///
/// let automation = AutomationBuilder::new()
///   .timeout(Duration::from_secs(2))
///   .report_absence(true)
///   .build(MemoryTree::new());
/// assert!(automation.config().report_absence);
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct AutomationBuilder {
  config: SearchConfig,
}

impl AutomationBuilder {
  /// Builder with default configuration.
  pub const fn new() -> Self {
    Self {
      config: SearchConfig::new(),
    }
  }

  /// Budget for operations that resolve implicitly. Default: 10s.
  pub const fn timeout(mut self, timeout: Duration) -> Self {
    self.config.timeout = timeout;
    self
  }

  /// Sleep between search attempts. Default: 500ms.
  pub const fn poll_interval(mut self, interval: Duration) -> Self {
    self.config.poll_interval = interval;
    self
  }

  /// Warn on every failed existence check. Default: false.
  pub const fn report_absence(mut self, report: bool) -> Self {
    self.config.report_absence = report;
    self
  }

  /// Log traversal count and elapsed time of successful searches. Default: false.
  pub const fn log_search_time(mut self, log: bool) -> Self {
    self.config.log_search_time = log;
    self
  }

  /// Stale-reference recoveries per operation. Default: 6.
  pub const fn stale_retry_limit(mut self, limit: u32) -> Self {
    self.config.stale_retry_limit = limit;
    self
  }

  /// Build the instance around `provider`.
  pub fn build<P: TreeProvider>(self, provider: P) -> Automation<P> {
    Automation::with_config(provider, self.config)
  }
}

impl<P: TreeProvider> Automation<P> {
  /// Create an instance with default configuration.
  ///
  /// For custom configuration, use [`AutomationBuilder`].
  pub fn new(provider: P) -> Self {
    Self::with_config(provider, SearchConfig::default())
  }

  pub fn with_config(provider: P, config: SearchConfig) -> Self {
    Self {
      shared: Arc::new(Shared { provider, config }),
    }
  }

  pub fn config(&self) -> &SearchConfig {
    &self.shared.config
  }

  /// The underlying provider.
  pub fn provider(&self) -> &P {
    &self.shared.provider
  }

  /// Handle for the tree root. Always resolves.
  pub fn root(&self) -> ControlHandle<P> {
    ControlHandle::root(&self.shared)
  }

  /// Wrap an existing native reference. The handle has no predicate, so it can
  /// only be validated, never re-searched.
  pub fn from_node(&self, node: P::Node) -> ControlHandle<P> {
    ControlHandle::assigned(&self.shared, node, None)
  }

  /// Start describing a handle that searches the whole tree for `predicate`.
  pub fn locate(&self, predicate: SearchPredicate<P>) -> Locator<P> {
    Locator::new(&self.shared, predicate, None)
  }

  /// Walk the whole tree from the root. See [`ControlHandle::walk`].
  pub fn walk(&self, include_top: bool, max_depth: u32) -> TreeWalker<P> {
    self.root().walk(include_top, max_depth)
  }

  /// Free-form search from the root. See [`ControlHandle::find`].
  pub fn find(
    &self,
    compare: impl FnMut(&ControlHandle<P>, u32) -> bool,
    max_depth: u32,
    find_from_self: bool,
    found_index: u32,
  ) -> AutomationResult<Option<Found<P>>> {
    self
      .root()
      .find(compare, max_depth, find_from_self, found_index)
  }

  /// One search pass below `root` for the `found_index`-th (1-based) match,
  /// without waiting or retrying.
  pub fn search(
    &self,
    root: &ControlHandle<P>,
    predicate: &SearchPredicate<P>,
    max_depth: u32,
    found_index: u32,
  ) -> AutomationResult<Option<Found<P>>> {
    resolve::validate(predicate, found_index)?;
    Ok(root.search_below(predicate, max_depth, found_index)?.found)
  }
}

/// Describes a predicate-based handle before it is created.
///
/// Nothing is searched until the handle is used.
#[must_use = "Locator does nothing until .handle() is called"]
pub struct Locator<P: TreeProvider> {
  shared: Arc<Shared<P>>,
  predicate: SearchPredicate<P>,
  search_root: Option<ControlHandle<P>>,
  search_depth: u32,
  found_index: u32,
}

impl<P: TreeProvider> Locator<P> {
  pub(crate) fn new(
    shared: &Arc<Shared<P>>,
    predicate: SearchPredicate<P>,
    search_root: Option<ControlHandle<P>>,
  ) -> Self {
    Self {
      shared: Arc::clone(shared),
      predicate,
      search_root,
      search_depth: UNBOUNDED_DEPTH,
      found_index: 1,
    }
  }

  /// Search below `root` instead of the tree root.
  pub fn within(mut self, root: &ControlHandle<P>) -> Self {
    self.search_root = Some(root.clone());
    self
  }

  /// Maximum depth below the search root. Default: unbounded.
  pub fn depth(mut self, depth: u32) -> Self {
    self.search_depth = depth;
    self
  }

  /// Take the k-th match in traversal order (1-based). Default: 1.
  pub fn index(mut self, found_index: u32) -> Self {
    self.found_index = found_index;
    self
  }

  /// Create the (unresolved) handle.
  pub fn handle(self) -> ControlHandle<P> {
    ControlHandle::searchable(
      &self.shared,
      self.predicate,
      self.search_root,
      self.search_depth,
      self.found_index,
    )
  }
}

impl<P: TreeProvider> std::fmt::Debug for Locator<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Locator")
      .field("predicate", &self.predicate)
      .field("search_depth", &self.search_depth)
      .field("found_index", &self.found_index)
      .finish_non_exhaustive()
  }
}

/// `budget` from now, saturating instead of overflowing.
pub(crate) fn deadline_after(budget: Duration) -> Instant {
  let now = Instant::now();
  now
    .checked_add(budget)
    .or_else(|| now.checked_add(FAR_FUTURE))
    .unwrap_or(now)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::a11y::ControlType;
  use crate::memory::{MemoryTree, NodeSpec};

  #[test]
  fn builder_sets_every_field() {
    let automation = AutomationBuilder::new()
      .timeout(Duration::from_millis(250))
      .poll_interval(Duration::from_millis(10))
      .report_absence(true)
      .log_search_time(true)
      .stale_retry_limit(2)
      .build(MemoryTree::new());

    let config = automation.config();
    assert_eq!(config.timeout, Duration::from_millis(250));
    assert_eq!(config.poll_interval, Duration::from_millis(10));
    assert!(config.report_absence);
    assert!(config.log_search_time);
    assert_eq!(config.stale_retry_limit, 2);
  }

  #[test]
  fn huge_budget_does_not_overflow() {
    assert!(deadline_after(Duration::MAX) >= Instant::now());
  }

  #[test]
  fn search_returns_kth_match() -> AutomationResult<()> {
    let tree = MemoryTree::new();
    let root = tree.root_node();
    for name in ["a", "b", "c"] {
      tree.add_child(root, NodeSpec::new(ControlType::Button).name(name));
    }
    let automation = Automation::new(tree);
    let buttons = SearchPredicate::new().control_type(ControlType::Button);

    let second = automation.search(&automation.root(), &buttons, 1, 2)?;
    let second = second.map(|f| (f.handle.name(), f.depth));
    assert_eq!(second, Some((Ok("b".to_string()), 1)));

    assert!(automation.search(&automation.root(), &buttons, 1, 4)?.is_none());
    Ok(())
  }

  #[test]
  fn search_rejects_empty_predicate() {
    let automation = Automation::new(MemoryTree::new());
    let result = automation.search(&automation.root(), &SearchPredicate::new(), 1, 1);
    assert!(matches!(
      result,
      Err(crate::AutomationError::MalformedPredicate(_))
    ));
  }
}
