//! Live-reload signal and update queue
//!
//! The dev server announces a changed template file with a custom event:
//!
//! ```text
//! {"type":"custom","event":"template-update","data":{"path":"/src/components/card.html"}}
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const TEMPLATE_UPDATE_EVENT: &str = "template-update";

/// Dev-server message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HotReloadMessage {
    /// Connection established
    Connected,

    /// Named event with an arbitrary payload
    Custom {
        event: String,
        #[serde(default)]
        data: serde_json::Value,
    },

    /// Reload the whole page
    FullReload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl HotReloadMessage {
    pub fn template_update(path: impl Into<String>) -> Self {
        Self::Custom {
            event: TEMPLATE_UPDATE_EVENT.to_string(),
            data: serde_json::json!({ "path": path.into() }),
        }
    }

    /// Changed file named by a `template-update` event
    pub fn template_update_path(&self) -> Option<&str> {
        match self {
            Self::Custom { event, data } if event == TEMPLATE_UPDATE_EVENT => {
                data.get("path").and_then(|p| p.as_str())
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"full-reload"}"#.to_string())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Pending template updates, applied one at a time
#[derive(Debug, Default)]
pub struct UpdateQueue {
    paths: VecDeque<String>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a path; a path already waiting is coalesced. Returns whether it
    /// was added.
    pub fn push(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push_back(path);
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        self.paths.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}
