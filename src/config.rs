use crate::error::Error;
use derive_more::Display;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Default maximum nesting depth of an event's parameters.
pub const DEFAULT_MAX_PARAS_DEPTH: usize = 64;

/// Ceiling of [`Config::max_paras_depth`].
///
/// serde_json refuses to decode more than 127 nested containers. An event
/// report wraps `paras` in three of them (report, `services`, event) plus the
/// `paras` object itself, so deeper parameters could be encoded but not decoded.
pub const MAX_PARAS_DEPTH_LIMIT: usize = 123;

/// Default maximum length (bytes) of a single encoded event frame.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Convention enforced on the `event_time` field.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Default,
    Display,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EventTimeFormat {
    /// RFC 3339 / ISO-8601 timestamp with a UTC offset, e.g. `2024-01-01T00:00:00Z`.
    #[default]
    #[serde(alias = "iso8601")]
    #[display("RFC 3339 UTC")]
    Rfc3339Utc,
    /// Compact UTC timestamp, `yyyyMMdd'T'HHmmss'Z'`, e.g. `20240101T000000Z`.
    #[display("compact UTC")]
    Compact,
    /// Any non-empty string is accepted.
    #[display("unchecked")]
    Unchecked,
}

/// Validation and framing conventions applied to device events.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Convention the `event_time` field must follow.
    #[serde(default)]
    pub event_time_format: EventTimeFormat,
    /// Maximum nesting depth of the `paras` values.
    /// A scalar directly under `paras` has depth 1.
    /// Values above [`MAX_PARAS_DEPTH_LIMIT`] are rejected when parsed and
    /// clamped when set directly.
    #[serde(
        default = "default_max_paras_depth",
        deserialize_with = "bounded_max_paras_depth"
    )]
    pub max_paras_depth: usize,
    /// Reject events that carry no `event_id`.
    #[serde(default)]
    pub require_event_id: bool,
    /// Maximum length (bytes) of a single codec frame, excluding the delimiter.
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,
}

impl Config {
    /// Parse a YAML configuration document.
    pub fn from_yaml(s: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// The nesting depth actually enforced on `paras`.
    pub fn effective_max_paras_depth(&self) -> usize {
        self.max_paras_depth.min(MAX_PARAS_DEPTH_LIMIT)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_time_format: EventTimeFormat::default(),
            max_paras_depth: DEFAULT_MAX_PARAS_DEPTH,
            require_event_id: false,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

const fn default_max_paras_depth() -> usize {
    DEFAULT_MAX_PARAS_DEPTH
}

const fn default_max_frame_length() -> usize {
    DEFAULT_MAX_FRAME_LENGTH
}

fn bounded_max_paras_depth<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let depth = usize::deserialize(deserializer)?;
    if depth > MAX_PARAS_DEPTH_LIMIT {
        Err(de::Error::custom(format!(
            "max-paras-depth {depth} exceeds the limit of {MAX_PARAS_DEPTH_LIMIT}"
        )))
    } else {
        Ok(depth)
    }
}
