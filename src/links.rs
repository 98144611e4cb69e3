//! Link registry shared by the render surface and the CLI

use serde::{Deserialize, Serialize};

/// Project homepage linked from every generated meme
pub const GITHUB_URL: &str = "https://github.com/meme-svg/meme-svg";

/// Text of the attribution badge
pub const ATTRIBUTION_LABEL: &str = "Generated by 企開啲啦meme";

/// The attribution badge anchored to the bottom-right corner of a meme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribution {
    /// Link target, opened in a new tab
    pub url: String,
    /// Visible badge text
    pub label: String,
}

impl Default for Attribution {
    fn default() -> Self {
        Self {
            url: GITHUB_URL.to_string(),
            label: ATTRIBUTION_LABEL.to_string(),
        }
    }
}
