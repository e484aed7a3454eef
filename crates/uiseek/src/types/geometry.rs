/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Bounding rectangle of a node in physical screen pixels.
///
/// Edges follow the native convention: `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rect {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl Rect {
  pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub const fn width(&self) -> i32 {
    self.right - self.left
  }

  pub const fn height(&self) -> i32 {
    self.bottom - self.top
  }

  /// Offscreen and collapsed nodes report an empty rectangle.
  pub const fn is_empty(&self) -> bool {
    self.width() <= 0 || self.height() <= 0
  }

  /// Center point, rounded toward the top-left.
  pub const fn center(&self) -> (i32, i32) {
    (
      self.left + self.width() / 2,
      self.top + self.height() / 2,
    )
  }
}

impl fmt::Display for Rect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({},{},{},{})[{}x{}]",
      self.left,
      self.top,
      self.right,
      self.bottom,
      self.width(),
      self.height()
    )
  }
}
