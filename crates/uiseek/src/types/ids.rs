/*! Branded ID types for native identifiers read off tree nodes. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Process ID - branded type to distinguish from other u32 values.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct ProcessId(pub u32);

/// Native window handle of a node (`HWND` on Windows). Zero when the node has none.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  TS,
  Display,
  From,
  Into,
)]
#[display("0x{_0:X}({_0})")]
#[ts(export)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
  /// Whether the node is backed by a native window.
  pub const fn is_window(self) -> bool {
    self.0 != 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn window_handle_renders_hex_and_decimal() {
    assert_eq!(WindowHandle(0x1A2B).to_string(), "0x1A2B(6699)");
    assert_eq!(WindowHandle::default().to_string(), "0x0(0)");
  }

  #[test]
  fn zero_handle_is_not_a_window() {
    assert!(!WindowHandle(0).is_window());
    assert!(WindowHandle(42).is_window());
  }
}
