/*!
Handle resolution.

Deciding whether a handle currently exists, in order:

1. Root handles always exist.
2. Lineage: a handle derived via first-child/next-sibling re-derives itself
   from its origin with one native call. If the origin itself can't be
   resolved, fall through.
3. Directly-assigned handles are validated: the cached node must be the root
   or still have a parent.
4. Predicate handles are searched for, repeatedly, until found or the budget
   runs out.

All nested resolution (search roots, lineage origins) shares the caller's
deadline, so the total wait never exceeds the budget by more than one search
pass.
*/

use std::time::{Duration, Instant};

use super::handle::{ControlHandle, Step};
use super::{deadline_after, TreeWalker};
use crate::predicate::SearchPredicate;
use crate::provider::TreeProvider;
use crate::types::{AutomationError, AutomationResult};

/// A match from a single search pass.
pub struct Found<P: TreeProvider> {
  /// Directly-assigned handle for the matched node.
  pub handle: ControlHandle<P>,
  /// Depth below the search root.
  pub depth: u32,
  /// Nodes visited up to and including the match.
  pub traverse_count: usize,
}

impl<P: TreeProvider> Clone for Found<P> {
  fn clone(&self) -> Self {
    Self {
      handle: self.handle.clone(),
      depth: self.depth,
      traverse_count: self.traverse_count,
    }
  }
}

impl<P: TreeProvider> std::fmt::Debug for Found<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Found")
      .field("handle", &self.handle)
      .field("depth", &self.depth)
      .field("traverse_count", &self.traverse_count)
      .finish()
  }
}

pub(crate) struct SearchPass<P: TreeProvider> {
  pub(crate) found: Option<Found<P>>,
  pub(crate) traverse_count: usize,
}

enum LineageOutcome {
  Found,
  Absent,
  /// The origin couldn't be resolved; use the handle's own path instead.
  Unresolved,
}

pub(crate) fn validate<P: TreeProvider>(
  predicate: &SearchPredicate<P>,
  found_index: u32,
) -> AutomationResult<()> {
  if predicate.is_empty() {
    return Err(AutomationError::MalformedPredicate(
      "predicate has no criteria".to_string(),
    ));
  }
  if found_index == 0 {
    return Err(AutomationError::MalformedPredicate(
      "found index starts at 1".to_string(),
    ));
  }
  Ok(())
}

/// Walk below `root` until the `found_index`-th match.
///
/// Errors only if nothing matched and the root's own children couldn't be read.
fn search_pass<P: TreeProvider>(
  root: &ControlHandle<P>,
  mut matcher: impl FnMut(&ControlHandle<P>, u32) -> bool,
  max_depth: u32,
  include_top: bool,
  found_index: u32,
) -> AutomationResult<SearchPass<P>> {
  let mut walker = TreeWalker::new(root.clone(), include_top, max_depth, false);
  let mut traverse_count = 0;
  let mut matched = 0;

  while let Some((candidate, depth)) = walker.next() {
    traverse_count += 1;
    if !matcher(&candidate, depth) {
      continue;
    }
    matched += 1;
    if matched >= found_index {
      candidate.write(|s| s.traverse_count = traverse_count);
      return Ok(SearchPass {
        found: Some(Found {
          handle: candidate,
          depth,
          traverse_count,
        }),
        traverse_count,
      });
    }
  }

  if let Some(e) = walker.take_error() {
    return Err(e);
  }
  Ok(SearchPass {
    found: None,
    traverse_count,
  })
}

impl<P: TreeProvider> ControlHandle<P> {
  /// Wait up to `max_wait` for the control to exist, polling every `poll_interval`.
  ///
  /// A zero `max_wait` makes exactly one attempt. With `report_if_absent`,
  /// a negative result is logged as a warning.
  pub fn exists(
    &self,
    max_wait: Duration,
    poll_interval: Duration,
    report_if_absent: bool,
  ) -> AutomationResult<bool> {
    let report = report_if_absent || self.shared.config.report_absence;
    self.exists_until(deadline_after(max_wait), poll_interval, report)
  }

  /// Re-resolve the handle, like [`exists`](Self::exists) without a report.
  ///
  /// With `raise_on_timeout`, a miss becomes [`AutomationError::NotFound`]
  /// instead of `Ok(false)`.
  pub fn refind(
    &self,
    max_wait: Duration,
    poll_interval: Duration,
    raise_on_timeout: bool,
  ) -> AutomationResult<bool> {
    self.refind_until(deadline_after(max_wait), poll_interval, raise_on_timeout)
  }

  /// Re-resolve with the configured budget, failing if absent.
  pub fn ensure(&self) -> AutomationResult<()> {
    let config = self.shared.config;
    self.refind(config.timeout, config.poll_interval, true)?;
    Ok(())
  }

  /// Free-form search below this handle for the `found_index`-th node
  /// satisfying `compare(candidate, depth)`. Single pass, no waiting.
  ///
  /// With `find_from_self`, this handle is itself a candidate at depth 0.
  pub fn find(
    &self,
    compare: impl FnMut(&Self, u32) -> bool,
    max_depth: u32,
    find_from_self: bool,
    found_index: u32,
  ) -> AutomationResult<Option<Found<P>>> {
    if found_index == 0 {
      return Err(AutomationError::MalformedPredicate(
        "found index starts at 1".to_string(),
      ));
    }
    self.ensure()?;
    let pass = search_pass(self, compare, max_depth, find_from_self, found_index)?;
    Ok(pass.found)
  }

  /// One search pass below this handle, using the cached reference as-is.
  pub(crate) fn search_below(
    &self,
    predicate: &SearchPredicate<P>,
    max_depth: u32,
    found_index: u32,
  ) -> AutomationResult<SearchPass<P>> {
    search_pass(
      self,
      |candidate, depth| predicate.matches(candidate, depth),
      max_depth,
      false,
      found_index,
    )
  }

  pub(crate) fn refind_until(
    &self,
    deadline: Instant,
    poll_interval: Duration,
    raise: bool,
  ) -> AutomationResult<bool> {
    let report = !raise && self.shared.config.report_absence;
    let found = self.exists_until(deadline, poll_interval, report)?;
    if !found && raise {
      return Err(self.not_found());
    }
    Ok(found)
  }

  pub(crate) fn resolved_until(
    &self,
    deadline: Instant,
    poll_interval: Duration,
  ) -> AutomationResult<P::Node> {
    self.refind_until(deadline, poll_interval, true)?;
    self.cached_node().ok_or_else(|| self.not_found())
  }

  pub(crate) fn exists_until(
    &self,
    deadline: Instant,
    poll_interval: Duration,
    report: bool,
  ) -> AutomationResult<bool> {
    let (is_root, has_lineage, directly_assigned) =
      self.read(|s| (s.is_root, s.lineage.is_some(), s.directly_assigned));
    if is_root {
      return Ok(true);
    }

    if has_lineage {
      match self.resolve_lineage(deadline, poll_interval)? {
        LineageOutcome::Found => return Ok(true),
        LineageOutcome::Absent => {
          self.report_absent(report);
          return Ok(false);
        }
        LineageOutcome::Unresolved => {}
      }
    }

    let found = if directly_assigned {
      self.validate_assigned()
    } else {
      self.full_search(deadline, poll_interval)?
    };
    if !found {
      self.report_absent(report);
    }
    Ok(found)
  }

  fn report_absent(&self, report: bool) {
    if report {
      log::warn!("{} does not exist", self.describe());
    }
  }

  /// Re-derive along the lineage chain, top-down from the first handle
  /// without a live origin.
  fn resolve_lineage(
    &self,
    deadline: Instant,
    poll_interval: Duration,
  ) -> AutomationResult<LineageOutcome> {
    let mut chain: Vec<(Self, Step)> = Vec::new();
    let mut base = self.clone();
    while let Some((step, from)) =
      base.read(|s| s.lineage.as_ref().map(|l| (l.step, l.from.clone())))
    {
      let Some(origin) = base.upgrade(&from) else {
        break;
      };
      chain.push((base, step));
      base = origin;
    }
    if chain.is_empty() {
      return Ok(LineageOutcome::Unresolved);
    }

    if !base.exists_until(deadline, poll_interval, false)? {
      return Ok(LineageOutcome::Unresolved);
    }
    let Some(mut node) = base.cached_node() else {
      return Ok(LineageOutcome::Unresolved);
    };

    for (i, (handle, step)) in chain.iter().enumerate().rev() {
      match step.call(self.provider(), &node) {
        Ok(Some(next)) => {
          handle.write(|s| s.cached = Some(next.clone()));
          node = next;
        }
        Ok(None) if i == 0 => {
          self.write(|s| s.cached = None);
          return Ok(LineageOutcome::Absent);
        }
        Ok(None) => return Ok(LineageOutcome::Unresolved),
        Err(e) => {
          log::debug!("Lineage re-derivation failed for {}: {e}", self.describe());
          return Ok(LineageOutcome::Unresolved);
        }
      }
    }
    Ok(LineageOutcome::Found)
  }

  /// A directly-assigned node is alive if it is the root or still has a parent.
  fn validate_assigned(&self) -> bool {
    let Some(node) = self.cached_node() else {
      return false;
    };
    let provider = self.provider();
    if node == provider.root() {
      return true;
    }
    match provider.parent(&node) {
      Ok(parent) => parent.is_some(),
      Err(e) => {
        log::debug!("Assigned node failed validation: {e}");
        false
      }
    }
  }

  fn full_search(&self, deadline: Instant, poll_interval: Duration) -> AutomationResult<bool> {
    let (predicate, search_root, search_depth, found_index) = self.read(|s| {
      (
        s.predicate.clone(),
        s.search_root.clone(),
        s.search_depth,
        s.found_index,
      )
    });
    let Some(predicate) = predicate else {
      return Err(AutomationError::MalformedPredicate(
        "handle has neither a predicate nor a node".to_string(),
      ));
    };
    validate(&predicate, found_index)?;

    self.write(|s| s.cached = None);
    let root = search_root.unwrap_or_else(|| Self::root(&self.shared));
    if root.cached_node().is_none() && !root.exists_until(deadline, poll_interval, false)? {
      log::debug!("Search root of {predicate} could not be resolved");
      return Ok(false);
    }

    let started = Instant::now();
    loop {
      match root.search_below(&predicate, search_depth, found_index) {
        Ok(pass) => {
          self.write(|s| s.traverse_count = pass.traverse_count);
          if let Some(found) = pass.found {
            let node = found.handle.cached_node();
            self.write(|s| {
              s.cached = node;
              s.lineage = None;
            });
            if self.shared.config.log_search_time {
              log::debug!(
                "{predicate} found after {} nodes in {:.3}s",
                pass.traverse_count,
                started.elapsed().as_secs_f64()
              );
            }
            return Ok(true);
          }
        }
        Err(e) if e.is_stale() => {
          log::debug!("Search root of {predicate} went stale, resolving it again");
          root.invalidate();
          if !root.exists_until(deadline, poll_interval, false)? {
            return Ok(false);
          }
        }
        Err(e) => return Err(e),
      }

      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        return Ok(false);
      }
      std::thread::sleep(remaining.min(poll_interval));
    }
  }
}
