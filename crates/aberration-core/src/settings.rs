#![forbid(unsafe_code)]

//! Startup configuration.
//!
//! The settings payload comes from an external admin surface and is read
//! exactly once. WordPress script localization stringifies scalars, so every
//! field is accepted loosely (booleans, numbers, or numeric strings) and then
//! validated into [`Settings`]. Invalid or missing fields fall back to the
//! documented defaults; only malformed JSON is an error.

use serde::Deserialize;
use tracing::debug;

/// Default selector list used when the payload omits `selectors` entirely.
pub const DEFAULT_SELECTORS: &str = ".site-logo img, .site-logo svg, h1.site-title";
pub const DEFAULT_MASK_RADIUS: u32 = 300;
pub const DEFAULT_SHADOW_SIZE: u32 = 4;
pub const DEFAULT_PAUSE_EVENT: &str = "cah-pause";
pub const DEFAULT_RESUME_EVENT: &str = "cah-resume";
pub const DEFAULT_LEFT_COLOR: &str = "#ff0000";
pub const DEFAULT_RIGHT_COLOR: &str = "#00ffff";
pub const DEFAULT_RED_COLOR: &str = "#ff0000";
pub const DEFAULT_GREEN_COLOR: &str = "#00ff00";
pub const DEFAULT_BLUE_COLOR: &str = "#0000ff";

/// Settings payload error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Malformed JSON.
    Json(String),
}

impl core::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "settings JSON parse error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Number of fringe colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Two,
    Three,
}

/// Fringe colors, one variant per [`ColorMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    Two { left: String, right: String },
    Three { red: String, green: String, blue: String },
}

impl Palette {
    #[must_use]
    pub const fn mode(&self) -> ColorMode {
        match self {
            Self::Two { .. } => ColorMode::Two,
            Self::Three { .. } => ColorMode::Three,
        }
    }
}

/// How pointer positions reach the masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Each wrapper listens to its own enter/move/leave events.
    PerElement,
    /// One window-level stream, distributed to every wrapper once per frame.
    Global,
}

/// Validated, immutable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    /// Parsed selector list; may be empty.
    pub selectors: Vec<String>,
    /// Mask radius in CSS pixels.
    pub mask_radius: u32,
    /// Drop-shadow offset and blur in CSS pixels.
    pub shadow_size: u32,
    pub palette: Palette,
    pub tracking: TrackingMode,
    pub pause_event: String,
    pub resume_event: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            selectors: parse_selectors(DEFAULT_SELECTORS),
            mask_radius: DEFAULT_MASK_RADIUS,
            shadow_size: DEFAULT_SHADOW_SIZE,
            palette: Palette::Two {
                left: DEFAULT_LEFT_COLOR.to_owned(),
                right: DEFAULT_RIGHT_COLOR.to_owned(),
            },
            tracking: TrackingMode::PerElement,
            pause_event: DEFAULT_PAUSE_EVENT.to_owned(),
            resume_event: DEFAULT_RESUME_EVENT.to_owned(),
        }
    }
}

impl Settings {
    /// Parse and validate a JSON settings payload.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings =
            serde_json::from_str(json).map_err(|e| SettingsError::Json(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// Whether the engine has any work to do.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.selectors.is_empty()
    }

    fn from_raw(raw: RawSettings) -> Self {
        let enabled = raw.enabled.as_ref().is_some_and(Loose::truthy);
        let selectors = match &raw.selectors {
            None => parse_selectors(DEFAULT_SELECTORS),
            Some(value) => value.text().map(parse_selectors).unwrap_or_default(),
        };
        let mask_radius = pixels(raw.mask_radius.as_ref(), "maskRadius", DEFAULT_MASK_RADIUS);
        let shadow_size = pixels(raw.shadow_size.as_ref(), "shadowSize", DEFAULT_SHADOW_SIZE);

        let three = raw.colors_mode.as_ref().and_then(Loose::text) == Some("three");
        let palette = if three {
            Palette::Three {
                red: color(raw.red_color.as_ref(), "redColor", DEFAULT_RED_COLOR),
                green: color(raw.green_color.as_ref(), "greenColor", DEFAULT_GREEN_COLOR),
                blue: color(raw.blue_color.as_ref(), "blueColor", DEFAULT_BLUE_COLOR),
            }
        } else {
            Palette::Two {
                left: color(raw.left_color.as_ref(), "leftColor", DEFAULT_LEFT_COLOR),
                right: color(raw.right_color.as_ref(), "rightColor", DEFAULT_RIGHT_COLOR),
            }
        };

        let tracking = match raw.tracking_mode.as_ref().and_then(Loose::text) {
            Some("global") => TrackingMode::Global,
            _ => TrackingMode::PerElement,
        };

        Self {
            enabled,
            selectors,
            mask_radius,
            shadow_size,
            palette,
            tracking,
            pause_event: event_name(raw.pause_event.as_ref(), DEFAULT_PAUSE_EVENT),
            resume_event: event_name(raw.resume_event.as_ref(), DEFAULT_RESUME_EVENT),
        }
    }
}

/// Split a raw selector list on newlines and commas, dropping blanks.
///
/// Commas inside functional pseudo-classes are not special-cased.
#[must_use]
pub fn parse_selectors(raw: &str) -> Vec<String> {
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|selector| !selector.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Accept `#rgb` or `#rrggbb`, case-insensitive.
#[must_use]
pub fn sanitize_hex_color(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#')?;
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| trimmed.to_owned())
}

fn pixels(value: Option<&Loose>, field: &'static str, default: u32) -> u32 {
    let Some(value) = value else {
        return default;
    };
    match value.number() {
        Some(n) => n.trunc().clamp(0.0, f64::from(u32::MAX)) as u32,
        None => {
            debug!(
                target: "aberration_core::settings",
                field,
                ?value,
                "non-numeric value, using default"
            );
            default
        }
    }
}

fn color(value: Option<&Loose>, field: &'static str, default: &str) -> String {
    match value.and_then(Loose::text).and_then(sanitize_hex_color) {
        Some(color) => color,
        None => {
            if value.is_some() {
                debug!(
                    target: "aberration_core::settings",
                    field,
                    ?value,
                    "invalid color, using default"
                );
            }
            default.to_owned()
        }
    }
}

fn event_name(value: Option<&Loose>, default: &str) -> String {
    value
        .and_then(Loose::text)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default)
        .to_owned()
}

/// Internal deserialization target matching the localized script payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    enabled: Option<Loose>,
    #[serde(default)]
    selectors: Option<Loose>,
    #[serde(default)]
    mask_radius: Option<Loose>,
    #[serde(default)]
    shadow_size: Option<Loose>,
    #[serde(default)]
    colors_mode: Option<Loose>,
    #[serde(default)]
    left_color: Option<Loose>,
    #[serde(default)]
    right_color: Option<Loose>,
    #[serde(default)]
    red_color: Option<Loose>,
    #[serde(default)]
    green_color: Option<Loose>,
    #[serde(default)]
    blue_color: Option<Loose>,
    #[serde(default)]
    tracking_mode: Option<Loose>,
    #[serde(default)]
    pause_event: Option<Loose>,
    #[serde(default)]
    resume_event: Option<Loose>,
}

/// A scalar as loosely typed as the admin surface emits it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Loose {
    fn truthy(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(text) => !matches!(text.trim(), "" | "0" | "false"),
            Self::Other(_) => false,
        }
    }

    fn number(&self) -> Option<f64> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
            Self::Bool(_) | Self::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}
