//! Runtime trace configuration.
//!
//! Two environment variables control diagnostics, read once per process:
//! - `AACONFINE_TRACE`:
//!   - `transitions` (default): one record per successful transition.
//!   - `verbose`: also record module initialization and refused transitions.
//!   - `off`: record nothing.
//! - `AACONFINE_TRACE_FORMAT`: `text` (default) or `json` for JSON lines.
//!
//! Configuration only shapes observability. Entropy source and library names
//! are fixed and cannot be redirected from the environment.

use std::sync::atomic::{AtomicU8, Ordering};

pub const TRACE_ENV: &str = "AACONFINE_TRACE";
pub const TRACE_FORMAT_ENV: &str = "AACONFINE_TRACE_FORMAT";

/// How much the gateway records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceLevel {
    /// Nothing is recorded.
    Off,
    /// Successful transitions only.
    #[default]
    Transitions,
    /// Successful transitions, refused transitions and initialization.
    Verbose,
}

impl TraceLevel {
    /// Parse from string (case-insensitive). Unknown values fall back to the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "quiet" | "none" | "0" => Self::Off,
            "verbose" | "debug" | "all" | "2" => Self::Verbose,
            _ => Self::Transitions,
        }
    }

    #[must_use]
    pub const fn records_success(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Refusals and module initialization.
    #[must_use]
    pub const fn records_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// Rendering of trace records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceFormat {
    /// `aaconfine: change_profile('x') succeeded via aa_change_profile`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl TraceFormat {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" | "structured" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Resolved trace configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceConfig {
    pub level: TraceLevel,
    pub format: TraceFormat,
}

impl TraceConfig {
    /// Build a configuration from raw variable values, as read from the environment.
    #[must_use]
    pub fn from_values(level: Option<&str>, format: Option<&str>) -> Self {
        Self {
            level: level.map(TraceLevel::from_str_loose).unwrap_or_default(),
            format: format.map(TraceFormat::from_str_loose).unwrap_or_default(),
        }
    }
}

// Packed cache: 0 = unresolved, otherwise (level_code << 4) | format_code.
static CACHED_CONFIG: AtomicU8 = AtomicU8::new(0);

const CONFIG_UNRESOLVED: u8 = 0;

fn encode(config: TraceConfig) -> u8 {
    let level = match config.level {
        TraceLevel::Off => 1,
        TraceLevel::Transitions => 2,
        TraceLevel::Verbose => 3,
    };
    let format = match config.format {
        TraceFormat::Text => 0,
        TraceFormat::Json => 1,
    };
    (level << 4) | format
}

fn decode(v: u8) -> TraceConfig {
    let level = match v >> 4 {
        1 => TraceLevel::Off,
        3 => TraceLevel::Verbose,
        _ => TraceLevel::Transitions,
    };
    let format = if v & 0x0f == 1 {
        TraceFormat::Json
    } else {
        TraceFormat::Text
    };
    TraceConfig { level, format }
}

/// Get the process trace configuration (reads the environment on first call,
/// caches thereafter).
///
/// Racing first callers may each read the environment; they resolve to the
/// same value, so the last store wins harmlessly.
#[must_use]
pub fn trace_config() -> TraceConfig {
    let cached = CACHED_CONFIG.load(Ordering::Acquire);
    if cached != CONFIG_UNRESOLVED {
        return decode(cached);
    }
    let level = std::env::var(TRACE_ENV).ok();
    let format = std::env::var(TRACE_FORMAT_ENV).ok();
    let config = TraceConfig::from_values(level.as_deref(), format.as_deref());
    CACHED_CONFIG.store(encode(config), Ordering::Release);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trace_levels() {
        assert_eq!(TraceLevel::from_str_loose("off"), TraceLevel::Off);
        assert_eq!(TraceLevel::from_str_loose("QUIET"), TraceLevel::Off);
        assert_eq!(TraceLevel::from_str_loose("none"), TraceLevel::Off);
        assert_eq!(
            TraceLevel::from_str_loose("transitions"),
            TraceLevel::Transitions
        );
        assert_eq!(TraceLevel::from_str_loose("verbose"), TraceLevel::Verbose);
        assert_eq!(TraceLevel::from_str_loose(" Debug "), TraceLevel::Verbose);
        assert_eq!(TraceLevel::from_str_loose("bogus"), TraceLevel::Transitions);
    }

    #[test]
    fn parse_trace_formats() {
        assert_eq!(TraceFormat::from_str_loose("json"), TraceFormat::Json);
        assert_eq!(TraceFormat::from_str_loose("JSONL"), TraceFormat::Json);
        assert_eq!(TraceFormat::from_str_loose("text"), TraceFormat::Text);
        assert_eq!(TraceFormat::from_str_loose("bogus"), TraceFormat::Text);
    }

    #[test]
    fn defaults_record_transitions_as_text() {
        let config = TraceConfig::from_values(None, None);
        assert_eq!(config.level, TraceLevel::Transitions);
        assert_eq!(config.format, TraceFormat::Text);
        assert!(config.level.records_success());
        assert!(!config.level.records_verbose());
    }

    #[test]
    fn level_gates() {
        assert!(!TraceLevel::Off.records_success());
        assert!(!TraceLevel::Off.records_verbose());
        assert!(TraceLevel::Verbose.records_success());
        assert!(TraceLevel::Verbose.records_verbose());
    }

    #[test]
    fn cached_config_is_process_sticky() {
        let first = trace_config();
        assert_eq!(trace_config(), first);
    }
}
