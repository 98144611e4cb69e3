//! meme-svg
//!
//! Overlay a top and bottom caption onto an image and export the composition
//! as inline SVG markup.
//!
//! # Features
//!
//! - **Bounded sizing**: the image is scaled down to 350px (compact devices)
//!   or 600px (standard devices) wide, preserving its aspect ratio
//! - **Last-request-wins loading**: resolutions for outdated sources never
//!   overwrite newer state
//! - **Pluggable sources**: `data:` URLs, files and `http(s)` out of the box,
//!   or any [`ImageResolver`]
//!
//! # Example
//!
//! ```no_run
//! use meme_svg::{DeviceClass, Meme, MemeConfig, MemeProps};
//! use std::sync::{mpsc, Mutex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let props = MemeProps::new("https://example.com/cat.jpg")
//!     .top_label("one does not simply")
//!     .bottom_label("write a meme generator")
//!     .device_class(DeviceClass::Compact);
//!
//! let (tx, rx) = mpsc::channel();
//! let tx = Mutex::new(tx);
//! let meme = Meme::builder(props)
//!     .config(MemeConfig::default())
//!     .on_ready(move || {
//!         let _ = tx.lock().map(|tx| tx.send(()));
//!     })
//!     .build()?;
//!
//! rx.recv()?;
//! println!("{}", meme.render());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod export;
pub mod links;
pub mod loader;
pub mod meme;
pub mod render;
pub mod scale;
pub mod source;

pub use export::{ExportHandle, Snapshot};
pub use links::Attribution;
pub use loader::ImageLoader;
pub use meme::{Meme, MemeBuilder, MemeProps};
pub use render::{render_svg, TextProfile};
pub use scale::scale_to_fit;
pub use source::{DefaultResolver, ImageResolver};

/// Configuration shared by the resolver and the render surface
///
/// Every field has a default, so a JSON config only needs the keys it
/// overrides.
///
/// # Examples
///
/// ```
/// let cfg = meme_svg::MemeConfig::default();
/// assert_eq!(cfg.timeout_ms, 30000);
/// assert!(cfg.allow_file_sources);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemeConfig {
    /// User agent sent when fetching remote images
    pub user_agent: String,
    /// Timeout for remote fetches in milliseconds
    pub timeout_ms: u64,
    /// Extra HTTP headers for remote fetches
    pub headers: HashMap<String, String>,
    /// Attribution badge rendered in the bottom-right corner
    pub attribution: Attribution,
    /// Whether bare paths and `file://` URLs may be read
    pub allow_file_sources: bool,
}

impl Default for MemeConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("meme-svg/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 30000,
            headers: HashMap::new(),
            attribution: Attribution::default(),
            allow_file_sources: true,
        }
    }
}

impl MemeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }
}

/// Coarse device category selecting the width cap and text density
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Phones and other narrow screens
    Compact,
    #[default]
    Standard,
}

impl DeviceClass {
    pub fn from_mobile(is_mobile: bool) -> Self {
        if is_mobile {
            DeviceClass::Compact
        } else {
            DeviceClass::Standard
        }
    }

    /// Maximum display width in device-independent pixels
    pub fn max_width(self) -> u32 {
        match self {
            DeviceClass::Compact => scale::COMPACT_MAX_WIDTH,
            DeviceClass::Standard => scale::STANDARD_MAX_WIDTH,
        }
    }

    pub fn text_profile(self) -> TextProfile {
        TextProfile::for_device(self)
    }
}

/// Intrinsic pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

/// Scaled size the meme is rendered at
///
/// Derived from a [`NaturalSize`] by [`scale_to_fit`]; fractional pixels are
/// kept as computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// Top and bottom caption text, either of which may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionPair {
    pub top: String,
    pub bottom: String,
}

impl CaptionPair {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            bottom: bottom.into(),
        }
    }
}

/// Loading progress of the current (source, device) request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LoadState {
    Pending,
    Ready(DisplaySize),
}

impl LoadState {
    pub fn size(&self) -> Option<DisplaySize> {
        match self {
            LoadState::Pending => None,
            LoadState::Ready(size) => Some(*size),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MemeConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.user_agent.starts_with("meme-svg/"));
        assert_eq!(config.attribution, Attribution::default());
    }

    #[test]
    fn test_partial_json_config() {
        let config = MemeConfig::from_json_str(r#"{"timeout_ms": 500, "headers": {"X-Test": "1"}}"#)
            .unwrap();
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.headers.get("X-Test").map(String::as_str), Some("1"));
        assert!(config.allow_file_sources);
    }

    #[test]
    fn test_invalid_json_config() {
        let err = MemeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_device_class() {
        assert_eq!(DeviceClass::default(), DeviceClass::Standard);
        assert_eq!(DeviceClass::from_mobile(true), DeviceClass::Compact);
        assert_eq!(DeviceClass::Compact.max_width(), 350);
        assert_eq!(DeviceClass::Standard.max_width(), 600);
        let parsed: DeviceClass = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, DeviceClass::Compact);
    }

    #[test]
    fn test_load_state() {
        assert_eq!(LoadState::Pending.size(), None);
        let s = DisplaySize { width: 1.0, height: 2.0 };
        assert!(LoadState::Ready(s).is_ready());
        assert_eq!(LoadState::Ready(s).size(), Some(s));
    }
}
