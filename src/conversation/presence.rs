use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Payload of the `userStatusChanged` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub user_id: String,
    pub is_online: bool,
}

/// Online flags keyed by user id, fed only by inbound status events.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    online: HashMap<String, bool>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest flag. Returns whether it differs from the previous one;
    /// a first event for a user that reports offline is no change.
    pub fn apply(&mut self, status: UserStatus) -> bool {
        debug!(
            user_id = status.user_id.as_str(),
            is_online = status.is_online,
            "presence changed"
        );
        let previous = self.online.insert(status.user_id, status.is_online);
        previous.unwrap_or(false) != status.is_online
    }

    /// Unknown users read as offline.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.get(user_id).copied().unwrap_or(false)
    }

    pub fn is_known(&self, user_id: &str) -> bool {
        self.online.contains_key(user_id)
    }

    pub fn reset(&mut self) {
        self.online.clear();
    }
}
