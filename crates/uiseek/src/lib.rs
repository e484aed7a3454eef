/*!
uiseek - lazy control handles and structural search over live accessibility trees

A [`ControlHandle`] describes *how* to find a control: a [`SearchPredicate`],
a search root, a depth bound and a match index. Nothing is searched until the
handle is used; every use re-resolves it against the live tree, waiting up to
a timeout for the control to appear and recovering transparently when the
native reference goes stale.

```
use std::time::Duration;
use uiseek::a11y::{CapabilityId, ControlType};
use uiseek::memory::{MemoryTree, NodeSpec};
use uiseek::{AutomationBuilder, SearchPredicate};

let tree = MemoryTree::new();
let window = tree.add_child(tree.root_node(), NodeSpec::new(ControlType::Window).name("Save file"));
let save = tree.add_child(window, NodeSpec::new(ControlType::Button).name("Save"));
tree.add_capability(save, CapabilityId::Invoke, None);

let automation = AutomationBuilder::new()
  .timeout(Duration::from_secs(1))
  .build(tree);

// Describe, don't search.
let dialog = automation
  .locate(SearchPredicate::new().control_type(ControlType::Window).regex_name("Save.*")?)
  .depth(1)
  .handle();
let button = dialog
  .locate(SearchPredicate::new().control_type(ControlType::Button).name("Save"))
  .handle();

// First use searches.
assert!(button.exists(Duration::ZERO, Duration::ZERO, false)?);
button.capability(CapabilityId::Invoke)?;

// Walk a subtree.
for (control, depth) in dialog.walk(true, 2) {
  println!("{depth} {}", control.name()?);
}
# Ok::<(), uiseek::AutomationError>(())
```

Native access goes through the [`TreeProvider`](provider::TreeProvider)
trait; [`memory::MemoryTree`] is an in-process implementation.
*/

mod core;
mod types;

pub mod a11y;
pub mod config;
pub mod dump;
pub mod memory;
pub mod predicate;
pub mod provider;

pub use types::*;

pub use crate::config::SearchConfig;
pub use crate::core::{
  Automation, AutomationBuilder, ControlHandle, Found, Locator, TreeWalker, UNBOUNDED_DEPTH,
};
pub use crate::dump::{DumpOptions, NodeRecord};
pub use crate::predicate::{Criterion, SearchPredicate};
