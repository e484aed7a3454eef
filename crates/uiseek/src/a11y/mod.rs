/*!
Accessibility vocabulary: what a node *is* and what it can *do*.

- [`ControlType`] - the node's control type, matched exactly by predicates
- [`CapabilityId`] - optional behaviors (patterns) a node may expose
*/

mod capability;
mod control_type;

pub use capability::CapabilityId;
pub use control_type::ControlType;
