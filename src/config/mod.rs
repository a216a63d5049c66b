//! Declarative per-instance configuration.
//!
//! Hosts carry a JSON blob in `data-gallery-config`. Parsing is lenient:
//! unknown keys are ignored and malformed input resolves to
//! [`CarouselConfig::default`] - configuration never aborts registration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Recognized per-instance options and their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarouselConfig {
    /// Gap between auto-sized slides (wide-viewport axis only).
    pub spacing: f64,
    /// Wrap-around rendering (duplicated slides share logical indices).
    pub wrap_around: bool,
    /// Free-drag mode (no snap points).
    pub free_drag: bool,
    /// Resistance applied when dragging past the edges.
    pub edge_resistance: f64,
    /// Let the viewport track the active slide's height.
    pub auto_height: bool,
    /// Request lazy-asset loading for slides near the viewport on stable
    /// updates.
    pub lazy: bool,
    /// Attribute name selecting slides within the track; defaults to all
    /// element children.
    pub slide_selector: Option<String>,
    /// Transition duration for user-requested navigation.
    pub duration_ms: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        CarouselConfig {
            spacing: 8.0,
            wrap_around: false,
            free_drag: false,
            edge_resistance: 0.85,
            auto_height: false,
            lazy: false,
            slide_selector: None,
            duration_ms: 300,
        }
    }
}

/// Parse a configuration blob, falling back to defaults on any failure.
pub fn parse(blob: Option<&str>) -> CarouselConfig {
    match blob {
        None => CarouselConfig::default(),
        Some(raw) => match parse_strict(raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(%err, "malformed carousel configuration, using defaults");
                CarouselConfig::default()
            }
        },
    }
}

/// Parse a configuration blob, surfacing the JSON error.
pub fn parse_strict(raw: &str) -> Result<CarouselConfig, ConfigError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CarouselConfig::default();
        assert_eq!(config.spacing, 8.0);
        assert!(!config.wrap_around);
        assert_eq!(config.edge_resistance, 0.85);
        assert_eq!(config.duration_ms, 300);
        assert_eq!(config.slide_selector, None);
    }

    #[test]
    fn test_parse_partial_blob_keeps_defaults() {
        let config = parse(Some(r#"{"wrapAround": true, "durationMs": 500}"#));
        assert!(config.wrap_around);
        assert_eq!(config.duration_ms, 500);
        assert_eq!(config.spacing, 8.0);
    }

    #[test]
    fn test_parse_unknown_keys_ignored() {
        let config = parse(Some(r#"{"somethingElse": 42, "lazy": true}"#));
        assert!(config.lazy);
    }

    #[test]
    fn test_parse_malformed_falls_back() {
        assert_eq!(parse(Some("{not json")), CarouselConfig::default());
        assert_eq!(parse(Some("")), CarouselConfig::default());
        assert_eq!(parse(None), CarouselConfig::default());
    }

    #[test]
    fn test_parse_strict_reports_error() {
        assert!(parse_strict("{not json").is_err());
        assert!(parse_strict(r#"{"spacing": 4.5}"#).is_ok());
    }

    #[test]
    fn test_slide_selector() {
        let config = parse(Some(r#"{"slideSelector": "data-slide"}"#));
        assert_eq!(config.slide_selector.as_deref(), Some("data-slide"));
    }
}
