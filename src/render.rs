//! Render surface: composes the meme as a single SVG document.
//!
//! The output is a pure function of the display size, captions, device class
//! and attribution. Captions live in an XHTML `foreignObject` so the browser
//! handles wrapping, which keeps the markup identical to what a screenshot of
//! the live page would show.

use crate::{Attribution, CaptionPair, DeviceClass, DisplaySize};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

const CAPTION_STYLE: &str = "position: absolute; left: 0; width: 100%; box-sizing: border-box; \
    margin: 0; color: white; font-family: 'Impact', 'Oswald', sans-serif; font-weight: 700; \
    white-space: pre-wrap; text-align: left; text-transform: uppercase; \
    -webkit-text-stroke: 1px black; \
    text-shadow: 3px 3px 0 #000, -1px -1px 0 #000, 1px -1px 0 #000, -1px 1px 0 #000, 1px 1px 0 #000;";

const ATTRIBUTION_STYLE: &str = "position: absolute; bottom: 0; right: 0; color: #333; \
    font-family: 'Oswald', sans-serif; font-size: 9px; font-weight: 400; \
    background: rgba(255, 255, 255, 0.7); padding: 1px 2px; text-decoration: none;";

/// Text density for a device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextProfile {
    pub font_size_px: u32,
    pub padding_px: u32,
}

impl TextProfile {
    pub fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Compact => TextProfile {
                font_size_px: 16,
                padding_px: 8,
            },
            DeviceClass::Standard => TextProfile {
                font_size_px: 32,
                padding_px: 32,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Top,
    Bottom,
}

/// Compose the meme.
///
/// While `size` is `None` the root element carries no `width`/`height`, so
/// the embedder can still mount the surface before the image has loaded.
pub fn render_svg(
    size: Option<DisplaySize>,
    source: &str,
    captions: &CaptionPair,
    device: DeviceClass,
    attribution: &Attribution,
) -> String {
    let profile = device.text_profile();

    let dimensions = match size {
        Some(s) => format!(
            r#" width="{}" height="{}""#,
            format_px(s.width),
            format_px(s.height)
        ),
        None => String::new(),
    };

    let mut svg = String::with_capacity(1024 + captions.top.len() + captions.bottom.len());
    svg.push_str(&format!(
        r#"<svg xmlns="{}" xmlns:xlink="{}"{}>"#,
        SVG_NS, XLINK_NS, dimensions
    ));
    svg.push_str(&format!(
        r#"<image xlink:href="{}" width="100%" height="100%"/>"#,
        escape_xml(source)
    ));
    svg.push_str("<switch>");
    svg.push_str(r#"<foreignObject width="100%" height="100%" style="position: absolute;">"#);
    svg.push_str(&caption(&captions.top, Anchor::Top, profile));
    svg.push_str(&caption(&captions.bottom, Anchor::Bottom, profile));
    svg.push_str(&format!(
        r#"<a xmlns="{}" href="{}" target="_blank" style="{}">{}</a>"#,
        XHTML_NS,
        escape_xml(&attribution.url),
        ATTRIBUTION_STYLE,
        escape_xml(&attribution.label)
    ));
    svg.push_str("</foreignObject>");
    svg.push_str("</switch>");
    svg.push_str("</svg>");
    svg
}

fn caption(text: &str, anchor: Anchor, profile: TextProfile) -> String {
    let edge = match anchor {
        Anchor::Top => "top: 0;",
        Anchor::Bottom => "bottom: 0;",
    };
    format!(
        r#"<div xmlns="{}" style="{} {} font-size: {}px; padding: {}px;">{}</div>"#,
        XHTML_NS,
        CAPTION_STYLE,
        edge,
        profile.font_size_px,
        profile.padding_px,
        escape_xml(text)
    )
}

/// Format a pixel length with at most three decimals, trailing zeros trimmed.
pub fn format_px(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape markup characters and replace code points XML 1.0 forbids
/// (C0 controls other than tab, newline and carriage return, U+FFFE, U+FFFF)
/// with U+FFFD.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => out.push(char::REPLACEMENT_CHARACTER),
            _ => out.push(c),
        }
    }
    out
}
