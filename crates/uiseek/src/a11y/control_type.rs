/*!
UI Automation control types.

Discriminants are the native control type ids, so conversion to and from
the provider's numeric representation is a lookup, not a mapping table.
*/

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Control type of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ControlType {
  Button = 50000,
  Calendar = 50001,
  CheckBox = 50002,
  ComboBox = 50003,
  Edit = 50004,
  Hyperlink = 50005,
  Image = 50006,
  ListItem = 50007,
  List = 50008,
  Menu = 50009,
  MenuBar = 50010,
  MenuItem = 50011,
  ProgressBar = 50012,
  RadioButton = 50013,
  ScrollBar = 50014,
  Slider = 50015,
  Spinner = 50016,
  StatusBar = 50017,
  Tab = 50018,
  TabItem = 50019,
  Text = 50020,
  ToolBar = 50021,
  ToolTip = 50022,
  Tree = 50023,
  TreeItem = 50024,
  Custom = 50025,
  Group = 50026,
  Thumb = 50027,
  DataGrid = 50028,
  DataItem = 50029,
  Document = 50030,
  SplitButton = 50031,
  Window = 50032,
  Pane = 50033,
  Header = 50034,
  HeaderItem = 50035,
  Table = 50036,
  TitleBar = 50037,
  Separator = 50038,
  SemanticZoom = 50039,
  AppBar = 50040,
}

impl ControlType {
  /// Every control type, in id order.
  pub const ALL: [Self; 41] = [
    Self::Button,
    Self::Calendar,
    Self::CheckBox,
    Self::ComboBox,
    Self::Edit,
    Self::Hyperlink,
    Self::Image,
    Self::ListItem,
    Self::List,
    Self::Menu,
    Self::MenuBar,
    Self::MenuItem,
    Self::ProgressBar,
    Self::RadioButton,
    Self::ScrollBar,
    Self::Slider,
    Self::Spinner,
    Self::StatusBar,
    Self::Tab,
    Self::TabItem,
    Self::Text,
    Self::ToolBar,
    Self::ToolTip,
    Self::Tree,
    Self::TreeItem,
    Self::Custom,
    Self::Group,
    Self::Thumb,
    Self::DataGrid,
    Self::DataItem,
    Self::Document,
    Self::SplitButton,
    Self::Window,
    Self::Pane,
    Self::Header,
    Self::HeaderItem,
    Self::Table,
    Self::TitleBar,
    Self::Separator,
    Self::SemanticZoom,
    Self::AppBar,
  ];

  /// Native control type id.
  pub const fn id(self) -> u32 {
    self as u32
  }

  /// Look up a control type by native id.
  pub fn from_id(id: u32) -> Option<Self> {
    Self::ALL.iter().copied().find(|ct| ct.id() == id)
  }

  /// Whether nodes of this type usually host other controls.
  pub const fn is_container(self) -> bool {
    matches!(
      self,
      Self::Window
        | Self::Pane
        | Self::Group
        | Self::Document
        | Self::List
        | Self::Tree
        | Self::Table
        | Self::DataGrid
        | Self::Tab
        | Self::Menu
        | Self::MenuBar
        | Self::ToolBar
        | Self::StatusBar
        | Self::Custom
    )
  }
}

impl fmt::Display for ControlType {
  /// Renders as the conventional type name, e.g. `ButtonControl`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{self:?}Control")
  }
}
