//! Hook output types.
//!
//! When a hook is skipped the wrapper still answers the host in its hook
//! result format, so a disabled hook looks like one that passed.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// JSON written to stdout for a skipped hook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Whether the host should carry on. Always true for skips.
    #[serde(rename = "continue")]
    pub proceed: bool,

    /// Hide this output from the transcript.
    pub suppress_output: bool,

    /// Short note for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookOutput {
    /// Output for a hook skipped because its circuit is open.
    #[must_use]
    pub fn skipped(hook_id: &str, retry_after: Option<DateTime<Utc>>) -> Self {
        let when = retry_after.map_or_else(
            || "until re-enabled".to_string(),
            |t| format!("until {}", t.format("%Y-%m-%d %H:%M:%S UTC")),
        );
        Self {
            proceed: true,
            suppress_output: true,
            system_message: Some(format!("hookguard: skipped disabled hook `{hook_id}` {when}")),
        }
    }
}
