/*!
Diagnostic dumps of controls and subtrees.

Each node is rendered as a [`NodeRecord`] and logged as one JSON line at
info level. Attributes that can't be read are left at their defaults, so a
dump of a half-torn-down window still completes.
*/

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::a11y::CapabilityId;
use crate::core::{ControlHandle, UNBOUNDED_DEPTH};
use crate::provider::TreeProvider;
use crate::types::{AutomationResult, ProcessId, Rect, WindowHandle};

/// Names longer than this are cut unless [`DumpOptions::show_all_name`] is set.
pub const NAME_DISPLAY_LIMIT: usize = 30;

/// One dumped node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NodeRecord {
  pub depth: u32,
  pub control_type: String,
  pub class_name: String,
  pub automation_id: String,
  pub rect: Rect,
  pub name: String,
  pub native_window_handle: WindowHandle,
  pub process_id: Option<ProcessId>,
  /// Supported capabilities, e.g. `InvokePattern`.
  pub capabilities: Vec<String>,
  /// Capability state summaries, where the provider offers one.
  pub details: Vec<String>,
}

/// What to include in a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct DumpOptions {
  /// Deepest level below the top to include. Default: unbounded.
  pub max_depth: u32,
  /// Print names in full instead of cutting at [`NAME_DISPLAY_LIMIT`]. Default: true.
  pub show_all_name: bool,
  /// Include the owning process. Default: false.
  pub show_pid: bool,
  /// Added to every reported depth, for dumping a subtree in context. Default: 0.
  pub start_depth: u32,
}

impl Default for DumpOptions {
  fn default() -> Self {
    Self {
      max_depth: UNBOUNDED_DEPTH,
      show_all_name: true,
      show_pid: false,
      start_depth: 0,
    }
  }
}

impl DumpOptions {
  pub const fn max_depth(mut self, max_depth: u32) -> Self {
    self.max_depth = max_depth;
    self
  }

  pub const fn show_all_name(mut self, show: bool) -> Self {
    self.show_all_name = show;
    self
  }

  pub const fn show_pid(mut self, show: bool) -> Self {
    self.show_pid = show;
    self
  }

  pub const fn start_depth(mut self, depth: u32) -> Self {
    self.start_depth = depth;
    self
  }
}

fn truncate(name: String, show_all: bool) -> String {
  if show_all || name.chars().count() <= NAME_DISPLAY_LIMIT {
    return name;
  }
  name.chars().take(NAME_DISPLAY_LIMIT).collect()
}

impl<P: TreeProvider> ControlHandle<P> {
  /// Render this control as found at `depth`. Reads the cached reference
  /// without resolving; unreadable attributes are left empty.
  pub fn record(&self, depth: u32, options: &DumpOptions) -> NodeRecord {
    fn or_default<T: Default>(what: &str, value: AutomationResult<T>) -> T {
      value.unwrap_or_else(|e| {
        log::trace!("Dump could not read {what}: {e}");
        T::default()
      })
    }

    let control_type = self.peek(|p, n| Ok(p.control_type(n)?.to_string()));
    let mut record = NodeRecord {
      depth,
      control_type: or_default("control type", control_type),
      class_name: or_default("class name", self.peek(|p, n| p.class_name(n))),
      automation_id: or_default("automation id", self.peek(|p, n| p.automation_id(n))),
      rect: or_default("rect", self.peek(|p, n| p.bounding_rectangle(n))),
      name: truncate(
        or_default("name", self.peek(|p, n| p.name(n))),
        options.show_all_name,
      ),
      native_window_handle: or_default("window handle", self.peek(|p, n| p.native_window_handle(n))),
      process_id: None,
      capabilities: Vec::new(),
      details: Vec::new(),
    };
    if options.show_pid {
      record.process_id = self.peek(|p, n| p.process_id(n)).ok();
    }

    for id in CapabilityId::ALL {
      let capability = match self.peek(|p, n| p.capability(n, id)) {
        Ok(Some(capability)) => capability,
        Ok(None) => continue,
        Err(e) => {
          log::trace!("Dump could not query {id}: {e}");
          continue;
        }
      };
      record.capabilities.push(id.to_string());
      match self.provider().describe_capability(id, &capability) {
        Ok(Some(detail)) => record.details.push(detail),
        Ok(None) => {}
        Err(e) => log::trace!("Dump could not describe {id}: {e}"),
      }
    }
    record
  }

  /// Resolve this control, then log and return records for it and its
  /// subtree in walk order.
  pub fn dump(&self, options: &DumpOptions) -> AutomationResult<Vec<NodeRecord>> {
    self.ensure()?;
    let mut records = Vec::new();
    for (handle, depth) in self.walk(true, options.max_depth) {
      let record = handle.record(options.start_depth.saturating_add(depth), options);
      match serde_json::to_string(&record) {
        Ok(line) => log::info!("{line}"),
        Err(e) => log::debug!("Dump could not serialize node: {e}"),
      }
      records.push(record);
    }
    Ok(records)
  }
}
