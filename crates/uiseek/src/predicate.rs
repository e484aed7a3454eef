/*!
Declarative search predicates.

A [`SearchPredicate`] is a conjunction of [`Criterion`]s, at most one per
kind. Criteria are always evaluated in the same fixed order (cheap attribute
comparisons first, `Compare` and `Child` last) and evaluation stops at the
first failing criterion, so side-effecting `Compare` closures see a
reproducible call pattern.

```
use uiseek::a11y::ControlType;
use uiseek::memory::MemoryTree;
use uiseek::SearchPredicate;

let cancel = SearchPredicate::<MemoryTree>::new()
  .control_type(ControlType::Button)
  .name("Cancel");
let dialog = SearchPredicate::new()
  .control_type(ControlType::Pane)
  .child(cancel);

assert_eq!(
  dialog.to_string(),
  r#"{ControlType: PaneControl, Child: {ControlType: ButtonControl, Name: "Cancel"}}"#
);
```
*/

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::a11y::ControlType;
use crate::core::{ControlHandle, UNBOUNDED_DEPTH};
use crate::provider::TreeProvider;
use crate::types::{AutomationError, AutomationResult};

/// Free-form match function of `(candidate, depth)`.
pub type CompareFn<P> = Arc<dyn Fn(&ControlHandle<P>, u32) -> bool>;

/// Compiled `RegexName` pattern. Matches the whole name, not a substring.
#[derive(Debug, Clone)]
pub struct NamePattern {
  source: String,
  regex: Regex,
}

impl NamePattern {
  /// Compile `pattern`. Fails on invalid syntax.
  pub fn new(pattern: &str) -> AutomationResult<Self> {
    let regex = Regex::new(&format!("^(?:{pattern})$"))
      .map_err(|e| AutomationError::MalformedPredicate(format!("invalid RegexName: {e}")))?;
    Ok(Self {
      source: pattern.to_string(),
      regex,
    })
  }

  /// Pattern as written by the caller.
  pub fn as_str(&self) -> &str {
    &self.source
  }

  /// Whether `name` matches in full.
  pub fn is_match(&self, name: &str) -> bool {
    self.regex.is_match(name)
  }
}

/// One match rule of a [`SearchPredicate`].
pub enum Criterion<P: TreeProvider> {
  /// Exact control type.
  ControlType(ControlType),
  /// Exact class name.
  ClassName(String),
  /// Exact automation id.
  AutomationId(String),
  /// Exact depth below the search root (immediate children are depth 1).
  Depth(u32),
  /// Exact name.
  Name(String),
  /// Name contains this substring.
  SubName(String),
  /// Name matches this pattern in full.
  RegexName(NamePattern),
  /// Arbitrary predicate of `(candidate, depth)`.
  Compare(CompareFn<P>),
  /// Some descendant of the candidate matches the nested predicate.
  Child(Box<SearchPredicate<P>>),
}

impl<P: TreeProvider> Criterion<P> {
  /// Evaluation order. Also identifies the kind: a predicate holds one criterion per rank.
  const fn rank(&self) -> u8 {
    match self {
      Self::ControlType(_) => 0,
      Self::ClassName(_) => 1,
      Self::AutomationId(_) => 2,
      Self::Depth(_) => 3,
      Self::Name(_) => 4,
      Self::SubName(_) => 5,
      Self::RegexName(_) => 6,
      Self::Compare(_) => 7,
      Self::Child(_) => 8,
    }
  }

  /// Key used when rendering the predicate.
  pub const fn key(&self) -> &'static str {
    match self {
      Self::ControlType(_) => "ControlType",
      Self::ClassName(_) => "ClassName",
      Self::AutomationId(_) => "AutomationId",
      Self::Depth(_) => "Depth",
      Self::Name(_) => "Name",
      Self::SubName(_) => "SubName",
      Self::RegexName(_) => "RegexName",
      Self::Compare(_) => "Compare",
      Self::Child(_) => "Child",
    }
  }

  fn matches(&self, candidate: &ControlHandle<P>, depth: u32) -> bool {
    let outcome = match self {
      Self::ControlType(expected) => candidate
        .peek(|p, n| p.control_type(n))
        .map(|ct| ct == *expected),
      Self::ClassName(expected) => candidate
        .peek(|p, n| p.class_name(n))
        .map(|v| v == *expected),
      Self::AutomationId(expected) => candidate
        .peek(|p, n| p.automation_id(n))
        .map(|v| v == *expected),
      Self::Depth(expected) => Ok(depth == *expected),
      Self::Name(expected) => candidate.peek(|p, n| p.name(n)).map(|v| v == *expected),
      Self::SubName(part) => candidate
        .peek(|p, n| p.name(n))
        .map(|v| v.contains(part.as_str())),
      Self::RegexName(pattern) => candidate
        .peek(|p, n| p.name(n))
        .map(|v| pattern.is_match(&v)),
      Self::Compare(compare) => Ok(compare(candidate, depth)),
      Self::Child(nested) => candidate
        .search_below(nested, UNBOUNDED_DEPTH, 1)
        .map(|pass| pass.found.is_some()),
    };

    outcome.unwrap_or_else(|e| {
      log::trace!("{} check failed on candidate at depth {depth}: {e}", self.key());
      false
    })
  }
}

impl<P: TreeProvider> Clone for Criterion<P> {
  fn clone(&self) -> Self {
    match self {
      Self::ControlType(v) => Self::ControlType(*v),
      Self::ClassName(v) => Self::ClassName(v.clone()),
      Self::AutomationId(v) => Self::AutomationId(v.clone()),
      Self::Depth(v) => Self::Depth(*v),
      Self::Name(v) => Self::Name(v.clone()),
      Self::SubName(v) => Self::SubName(v.clone()),
      Self::RegexName(v) => Self::RegexName(v.clone()),
      Self::Compare(v) => Self::Compare(Arc::clone(v)),
      Self::Child(v) => Self::Child(v.clone()),
    }
  }
}

impl<P: TreeProvider> fmt::Display for Criterion<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: ", self.key())?;
    match self {
      Self::ControlType(v) => write!(f, "{v}"),
      Self::ClassName(v) | Self::AutomationId(v) | Self::Name(v) | Self::SubName(v) => {
        write!(f, "{v:?}")
      }
      Self::Depth(v) => write!(f, "{v}"),
      Self::RegexName(v) => write!(f, "{:?}", v.as_str()),
      Self::Compare(_) => f.write_str("<fn>"),
      Self::Child(v) => write!(f, "{v}"),
    }
  }
}

impl<P: TreeProvider> fmt::Debug for Criterion<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

/// Which node(s) to match. All criteria must hold.
#[must_use]
pub struct SearchPredicate<P: TreeProvider> {
  /// Sorted by rank, at most one per rank.
  criteria: Vec<Criterion<P>>,
}

impl<P: TreeProvider> SearchPredicate<P> {
  /// An empty predicate. Resolving a handle with it fails until a criterion is added.
  pub const fn new() -> Self {
    Self {
      criteria: Vec::new(),
    }
  }

  /// Add a criterion, replacing any existing one of the same kind.
  pub fn with(mut self, criterion: Criterion<P>) -> Self {
    let rank = criterion.rank();
    match self.criteria.binary_search_by_key(&rank, Criterion::rank) {
      Ok(at) => {
        if let Some(slot) = self.criteria.get_mut(at) {
          *slot = criterion;
        }
      }
      Err(at) => self.criteria.insert(at, criterion),
    }
    self
  }

  /// Match an exact control type.
  pub fn control_type(self, control_type: ControlType) -> Self {
    self.with(Criterion::ControlType(control_type))
  }

  /// Match an exact class name.
  pub fn class_name(self, class_name: impl Into<String>) -> Self {
    self.with(Criterion::ClassName(class_name.into()))
  }

  /// Match an exact automation id.
  pub fn automation_id(self, automation_id: impl Into<String>) -> Self {
    self.with(Criterion::AutomationId(automation_id.into()))
  }

  /// Match only at this depth below the search root.
  pub fn depth(self, depth: u32) -> Self {
    self.with(Criterion::Depth(depth))
  }

  /// Match an exact name.
  pub fn name(self, name: impl Into<String>) -> Self {
    self.with(Criterion::Name(name.into()))
  }

  /// Match names containing `part`.
  pub fn sub_name(self, part: impl Into<String>) -> Self {
    self.with(Criterion::SubName(part.into()))
  }

  /// Match names against a regex (full match). Fails here, not at search time,
  /// if the pattern doesn't compile.
  pub fn regex_name(self, pattern: &str) -> AutomationResult<Self> {
    Ok(self.with(Criterion::RegexName(NamePattern::new(pattern)?)))
  }

  /// Match with an arbitrary closure of `(candidate, depth)`.
  pub fn compare(self, compare: impl Fn(&ControlHandle<P>, u32) -> bool + 'static) -> Self {
    self.with(Criterion::Compare(Arc::new(compare)))
  }

  /// Require a descendant matching `nested`, at any depth below the candidate.
  pub fn child(self, nested: SearchPredicate<P>) -> Self {
    self.with(Criterion::Child(Box::new(nested)))
  }

  /// Criteria in evaluation order.
  pub fn criteria(&self) -> &[Criterion<P>] {
    &self.criteria
  }

  pub fn is_empty(&self) -> bool {
    self.criteria.is_empty()
  }

  pub fn len(&self) -> usize {
    self.criteria.len()
  }

  /// Whether `candidate`, found at `depth` below the search root, satisfies
  /// every criterion. Provider failures count as a non-match.
  pub fn matches(&self, candidate: &ControlHandle<P>, depth: u32) -> bool {
    self.criteria.iter().all(|c| c.matches(candidate, depth))
  }
}

impl<P: TreeProvider> Default for SearchPredicate<P> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: TreeProvider> Clone for SearchPredicate<P> {
  fn clone(&self) -> Self {
    Self {
      criteria: self.criteria.clone(),
    }
  }
}

impl<P: TreeProvider> fmt::Display for SearchPredicate<P> {
  /// Renders as `{ControlType: ButtonControl, Name: "OK"}`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("{")?;
    for (i, criterion) in self.criteria.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{criterion}")?;
    }
    f.write_str("}")
  }
}

impl<P: TreeProvider> fmt::Debug for SearchPredicate<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SearchPredicate{self}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::{MemoryTree, NodeSpec};
  use crate::Automation;
  use std::cell::RefCell;
  use std::rc::Rc;

  type Pred = SearchPredicate<MemoryTree>;

  fn fixture() -> (Automation<MemoryTree>, crate::memory::NodeRef) {
    let tree = MemoryTree::new();
    let pane = tree.add_child(
      tree.root_node(),
      NodeSpec::new(ControlType::Pane)
        .class_name("Dialog")
        .automation_id("confirm"),
    );
    let ok = tree.add_child(
      pane,
      NodeSpec::new(ControlType::Button)
        .name("Save As")
        .class_name("Button")
        .automation_id("saveAs"),
    );
    (Automation::new(tree), ok)
  }

  fn matches(pred: &Pred, depth: u32) -> bool {
    let (automation, ok) = fixture();
    pred.matches(&automation.from_node(ok), depth)
  }

  #[test]
  fn criteria_keep_fixed_order_regardless_of_insertion() {
    let pred = Pred::new()
      .name("OK")
      .depth(2)
      .control_type(ControlType::Button);
    let keys: Vec<_> = pred.criteria().iter().map(Criterion::key).collect();
    assert_eq!(keys, ["ControlType", "Depth", "Name"]);
  }

  #[test]
  fn same_kind_replaces() {
    let pred = Pred::new().name("first").name("second");
    assert_eq!(pred.len(), 1);
    assert_eq!(pred.to_string(), r#"{Name: "second"}"#);
  }

  #[test]
  fn exact_attributes() {
    assert!(matches(&Pred::new().control_type(ControlType::Button), 2));
    assert!(!matches(&Pred::new().control_type(ControlType::Edit), 2));
    assert!(matches(&Pred::new().class_name("Button"), 2));
    assert!(matches(&Pred::new().automation_id("saveAs"), 2));
    assert!(!matches(&Pred::new().automation_id("save"), 2));
    assert!(matches(&Pred::new().name("Save As"), 2));
    assert!(!matches(&Pred::new().name("Save"), 2));
  }

  #[test]
  fn depth_is_compared_exactly() {
    assert!(matches(&Pred::new().depth(2), 2));
    assert!(!matches(&Pred::new().depth(1), 2));
  }

  #[test]
  fn sub_name_is_containment() {
    assert!(matches(&Pred::new().sub_name("Save"), 1));
    assert!(matches(&Pred::new().sub_name("e A"), 1));
    assert!(!matches(&Pred::new().sub_name("save"), 1));
  }

  #[test]
  fn regex_name_requires_full_match() -> AutomationResult<()> {
    assert!(matches(&Pred::new().regex_name(r"Save\s+As")?, 1));
    assert!(matches(&Pred::new().regex_name("S.*")?, 1));
    assert!(!matches(&Pred::new().regex_name("Save")?, 1), "prefix only");
    assert!(!matches(&Pred::new().regex_name("As")?, 1), "suffix only");
    Ok(())
  }

  #[test]
  fn invalid_regex_fails_at_construction() {
    let err = Pred::new().regex_name("Save(").unwrap_err();
    assert!(matches!(err, AutomationError::MalformedPredicate(_)));
  }

  #[test]
  fn conjunction_short_circuits_before_compare() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let pred = Pred::new()
      .control_type(ControlType::Edit)
      .compare(move |_, _| {
        *counter.borrow_mut() += 1;
        true
      });
    assert!(!matches(&pred, 2));
    assert_eq!(*calls.borrow(), 0, "compare must not run after a failing key");
  }

  #[test]
  fn compare_receives_depth() {
    let pred = Pred::new().compare(|_, depth| depth == 7);
    assert!(matches(&pred, 7));
    assert!(!matches(&pred, 6));
  }

  #[test]
  fn stale_candidate_is_a_non_match() {
    let (automation, ok) = fixture();
    let handle = automation.from_node(ok);
    automation.provider().remove(ok);
    assert!(!Pred::new().name("Save As").matches(&handle, 2));
  }

  #[test]
  fn rendering() -> AutomationResult<()> {
    let pred = Pred::new()
      .control_type(ControlType::Button)
      .sub_name("Sa")
      .regex_name("S.*")?
      .compare(|_, _| true)
      .depth(3);
    assert_eq!(
      pred.to_string(),
      r#"{ControlType: ButtonControl, Depth: 3, SubName: "Sa", RegexName: "S.*", Compare: <fn>}"#
    );
    assert_eq!(Pred::new().to_string(), "{}");
    Ok(())
  }
}
