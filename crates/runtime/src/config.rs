use foundation::time::MIN_YEAR;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for the globe explorer.
///
/// Every field has a default, so a partial JSON object (or `{}`) is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    // ── Globe ────────────────────────────────────────────────
    /// Nominal globe radius in scene units.
    pub globe_radius: f64,
    /// Radius offset for boundary strokes above the surface.
    pub boundary_epsilon: f64,
    /// Auto-rotation speed about the vertical axis.
    pub auto_rotate_rate_rad_per_s: f64,

    // ── Camera ───────────────────────────────────────────────
    pub camera_min_distance: f64,
    pub camera_max_distance: f64,
    pub camera_start_distance: f64,
    /// Vertical field of view in degrees.
    pub camera_fov_y_deg: f64,

    // ── Date selector ────────────────────────────────────────
    /// Earliest selectable year. Never below the calendar floor of 1900.
    pub min_year: i32,
    /// How long a clamp warning stays visible.
    pub warning_duration_ms: f64,

    // ── Sidebar ──────────────────────────────────────────────
    pub summary_max_chars: usize,
    pub visible_tag_limit: usize,

    // ── Assets / endpoints ───────────────────────────────────
    pub countries_url: String,
    /// Must contain `{month}`; replaced by the lowercase month name.
    pub texture_url_template: String,
    /// Prefix for `/api/...` calls; empty means same origin.
    pub api_base_url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            globe_radius: 3.0,
            boundary_epsilon: 0.01,
            auto_rotate_rate_rad_per_s: 0.5,
            camera_min_distance: 4.0,
            camera_max_distance: 12.0,
            camera_start_distance: 10.0,
            camera_fov_y_deg: 75.0,
            min_year: MIN_YEAR,
            warning_duration_ms: 3000.0,
            summary_max_chars: 150,
            visible_tag_limit: 4,
            countries_url: "/Geodata/countries.geojson".to_string(),
            texture_url_template: "/Textures/earth-{month}.jpg".to_string(),
            api_base_url: String::new(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl ExplorerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.globe_radius.is_finite() && self.globe_radius > 0.0) {
            return Err(invalid("globe_radius", "must be finite and > 0"));
        }
        if !(self.boundary_epsilon.is_finite() && self.boundary_epsilon >= 0.0) {
            return Err(invalid("boundary_epsilon", "must be finite and >= 0"));
        }
        if !(self.auto_rotate_rate_rad_per_s.is_finite() && self.auto_rotate_rate_rad_per_s >= 0.0)
        {
            return Err(invalid("auto_rotate_rate_rad_per_s", "must be finite and >= 0"));
        }
        if !(self.camera_min_distance > self.globe_radius) {
            return Err(invalid(
                "camera_min_distance",
                format!("must exceed globe_radius ({})", self.globe_radius),
            ));
        }
        if !(self.camera_max_distance.is_finite()
            && self.camera_max_distance >= self.camera_min_distance)
        {
            return Err(invalid("camera_max_distance", "must be >= camera_min_distance"));
        }
        if !(self.camera_start_distance >= self.camera_min_distance
            && self.camera_start_distance <= self.camera_max_distance)
        {
            return Err(invalid(
                "camera_start_distance",
                "must lie within [camera_min_distance, camera_max_distance]",
            ));
        }
        if !(self.camera_fov_y_deg > 0.0 && self.camera_fov_y_deg < 180.0) {
            return Err(invalid("camera_fov_y_deg", "must be in (0, 180)"));
        }
        if self.min_year < MIN_YEAR {
            return Err(invalid("min_year", format!("must be >= {MIN_YEAR}")));
        }
        if !(self.warning_duration_ms.is_finite() && self.warning_duration_ms > 0.0) {
            return Err(invalid("warning_duration_ms", "must be > 0"));
        }
        if self.summary_max_chars == 0 {
            return Err(invalid("summary_max_chars", "must be > 0"));
        }
        if !self.texture_url_template.contains("{month}") {
            return Err(invalid("texture_url_template", "missing `{month}` placeholder"));
        }
        Ok(())
    }

    /// Radius of the boundary polylines.
    pub fn boundary_radius(&self) -> f64 {
        self.globe_radius + self.boundary_epsilon
    }

    pub fn events_by_date_url(&self) -> String {
        format!(
            "{}/api/events/by-date",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ExplorerConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let cfg = ExplorerConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.globe_radius, 3.0);
        assert!((cfg.boundary_radius() - 3.01).abs() < 1e-12);
        assert_eq!(cfg.min_year, 1900);
        assert_eq!(cfg.events_by_date_url(), "/api/events/by-date");
    }

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = ExplorerConfig::from_json_str("{}").expect("parse");
        assert_eq!(cfg, ExplorerConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let cfg = ExplorerConfig::from_json_str(
            r#"{ "api_base_url": "https://events.example/", "summary_max_chars": 80 }"#,
        )
        .expect("parse");
        assert_eq!(cfg.summary_max_chars, 80);
        assert_eq!(cfg.visible_tag_limit, 4);
        assert_eq!(
            cfg.events_by_date_url(),
            "https://events.example/api/events/by-date"
        );
    }

    #[test]
    fn rejects_inconsistent_camera_bounds() {
        let err = ExplorerConfig::from_json_str(r#"{ "camera_min_distance": 2.0 }"#)
            .expect_err("inside the globe");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "camera_min_distance",
                ..
            }
        ));

        let err = ExplorerConfig::from_json_str(r#"{ "camera_start_distance": 20.0 }"#)
            .expect_err("outside bounds");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "camera_start_distance",
                ..
            }
        ));
    }

    #[test]
    fn rejects_years_before_calendar_floor_and_bad_templates() {
        assert!(ExplorerConfig::from_json_str(r#"{ "min_year": 1800 }"#).is_err());
        assert!(ExplorerConfig::from_json_str(r#"{ "min_year": 1950 }"#).is_ok());
        assert!(ExplorerConfig::from_json_str(r#"{ "texture_url_template": "/t.jpg" }"#).is_err());
        assert!(matches!(
            ExplorerConfig::from_json_str("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
