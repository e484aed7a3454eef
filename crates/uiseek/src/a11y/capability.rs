/*!
Capability (pattern) identifiers.

A capability is optional: a node may or may not support it, and it can only
be obtained through a query that can fail. This module only names them; the
capability objects themselves are opaque provider types.
*/

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI Automation pattern id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CapabilityId {
  Invoke = 10000,
  Selection = 10001,
  Value = 10002,
  RangeValue = 10003,
  Scroll = 10004,
  ExpandCollapse = 10005,
  Grid = 10006,
  GridItem = 10007,
  MultipleView = 10008,
  Window = 10009,
  SelectionItem = 10010,
  Dock = 10011,
  Table = 10012,
  TableItem = 10013,
  Text = 10014,
  Toggle = 10015,
  Transform = 10016,
  ScrollItem = 10017,
  LegacyIAccessible = 10018,
  ItemContainer = 10019,
  VirtualizedItem = 10020,
  SynchronizedInput = 10021,
  ObjectModel = 10022,
  Annotation = 10023,
  Text2 = 10024,
  Styles = 10025,
  Spreadsheet = 10026,
  SpreadsheetItem = 10027,
  Transform2 = 10028,
  TextChild = 10029,
  Drag = 10030,
  DropTarget = 10031,
  TextEdit = 10032,
  CustomNavigation = 10033,
  Selection2 = 10034,
}

impl CapabilityId {
  /// Every capability, in id order. The diagnostic dump checks them in this order.
  pub const ALL: [Self; 35] = [
    Self::Invoke,
    Self::Selection,
    Self::Value,
    Self::RangeValue,
    Self::Scroll,
    Self::ExpandCollapse,
    Self::Grid,
    Self::GridItem,
    Self::MultipleView,
    Self::Window,
    Self::SelectionItem,
    Self::Dock,
    Self::Table,
    Self::TableItem,
    Self::Text,
    Self::Toggle,
    Self::Transform,
    Self::ScrollItem,
    Self::LegacyIAccessible,
    Self::ItemContainer,
    Self::VirtualizedItem,
    Self::SynchronizedInput,
    Self::ObjectModel,
    Self::Annotation,
    Self::Text2,
    Self::Styles,
    Self::Spreadsheet,
    Self::SpreadsheetItem,
    Self::Transform2,
    Self::TextChild,
    Self::Drag,
    Self::DropTarget,
    Self::TextEdit,
    Self::CustomNavigation,
    Self::Selection2,
  ];

  /// Native pattern id.
  pub const fn id(self) -> u32 {
    self as u32
  }

  /// Look up a capability by native pattern id.
  pub fn from_id(id: u32) -> Option<Self> {
    Self::ALL.iter().copied().find(|cap| cap.id() == id)
  }
}

impl fmt::Display for CapabilityId {
  /// Renders as the conventional pattern name, e.g. `ValuePattern`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{self:?}Pattern")
  }
}
