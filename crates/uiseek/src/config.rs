/*!
Search configuration.

All values have sensible defaults. Override through
[`AutomationBuilder`](crate::AutomationBuilder):

```
use std::time::Duration;
use uiseek::memory::MemoryTree;
use uiseek::AutomationBuilder;

let automation = AutomationBuilder::new()
  .timeout(Duration::from_secs(3))
  .poll_interval(Duration::from_millis(200))
  .build(MemoryTree::new());

assert_eq!(automation.config().timeout, Duration::from_secs(3));
```
*/

use std::time::Duration;

/// Default wall-clock budget for resolving a handle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default sleep between search attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of stale-reference recoveries per operation.
pub const DEFAULT_STALE_RETRY_LIMIT: u32 = 6;

/// Search configuration shared by every handle of an [`Automation`](crate::Automation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
  /// Budget used by resolving operations that don't take an explicit one
  /// (property reads, capability queries, traversal).
  /// Default: 10s.
  pub timeout: Duration,

  /// Sleep between search attempts.
  /// Default: 500ms.
  pub poll_interval: Duration,

  /// Log a warning whenever an existence check ends without a match,
  /// even if the caller didn't ask for a report.
  /// Default: false.
  pub report_absence: bool,

  /// Log traversal count and elapsed time of every successful search.
  /// Default: false.
  pub log_search_time: bool,

  /// How many times an operation re-resolves its handle after the native
  /// layer rejects a cached reference.
  /// Default: 6.
  pub stale_retry_limit: u32,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self::new()
  }
}

impl SearchConfig {
  /// Create a new config with default values.
  pub const fn new() -> Self {
    Self {
      timeout: DEFAULT_TIMEOUT,
      poll_interval: DEFAULT_POLL_INTERVAL,
      report_absence: false,
      log_search_time: false,
      stale_retry_limit: DEFAULT_STALE_RETRY_LIMIT,
    }
  }
}
