//! Game settings and preferences
//!
//! Read once at startup from an optional JSON block embedded in the page.
//! Nothing is written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::controller::Action;
use crate::sim::session::LevelTunings;
use crate::sim::spawner::SpawnRule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Input ===
    /// `KeyboardEvent.key` name to action
    pub bindings: BTreeMap<String, Action>,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === HUD ===
    pub show_fps: bool,

    // === Accessibility ===
    /// Reduced motion (no camera shake)
    pub reduced_motion: bool,

    /// Fixed RNG seed; a fresh one per page load when absent
    pub seed: Option<u64>,

    /// Balance tables, for tuning without a rebuild
    pub levels: LevelTunings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bindings: default_bindings(),

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,

            show_fps: false,

            reduced_motion: false,

            seed: None,
            levels: LevelTunings::default(),
        }
    }
}

fn default_bindings() -> BTreeMap<String, Action> {
    [
        ("ArrowRight", Action::Forward),
        ("ArrowLeft", Action::Backward),
        ("ArrowUp", Action::Jump),
        (" ", Action::Guard),
        ("Enter", Action::Attack),
        ("Shift", Action::Fire),
        ("Escape", Action::Pause),
    ]
    .into_iter()
    .map(|(key, action)| (key.to_string(), action))
    .collect()
}

impl Settings {
    /// Parse and validate a settings document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bindings.keys().any(|key| key.is_empty()) {
            return Err(ConfigError::invalid("bindings", "empty key name"));
        }
        for (field, volume) in [("master_volume", self.master_volume), ("sfx_volume", self.sfx_volume)] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::invalid(field, format!("{volume} is outside 0..1")));
            }
        }

        let ow = &self.levels.overworld;
        let sky = &self.levels.skyway;
        let rules: [(&str, &SpawnRule); 4] = [
            ("overworld.pipes", &ow.pipes),
            ("overworld.goombas", &ow.goombas),
            ("overworld.turtles", &ow.turtles),
            ("overworld.clouds", &ow.clouds),
        ];
        let spacings = [
            ("overworld.brick_row_spacing", ow.brick_row_spacing),
            ("overworld.coin_spacing", ow.coin_spacing),
            ("overworld.patrol_spacing", ow.patrol_spacing),
            ("overworld.special_spacing", ow.special_spacing),
            ("skyway.platform_spacing", sky.platform_spacing),
            ("skyway.diamond_spacing", sky.diamond_spacing),
        ]
        .into_iter()
        .chain(rules.iter().map(|(name, rule)| (*name, rule.spacing)));
        for (field, spacing) in spacings {
            // NaN fails this too
            if !(spacing > 0.0) {
                return Err(ConfigError::invalid(field, format!("spacing must be positive, got {spacing}")));
            }
        }
        Ok(())
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        self.bindings.get(key).copied()
    }

    /// Effective gain for sound effects (respects mute)
    pub fn effect_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Whether camera shake is applied to the view
    pub fn camera_shake(&self) -> bool {
        !self.reduced_motion
    }

    /// Id of the `<script type="application/json">` block holding overrides
    #[cfg(target_arch = "wasm32")]
    const ELEMENT_ID: &'static str = "game-settings";

    /// Load settings from the page (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let text = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(Self::ELEMENT_ID))
            .and_then(|el| el.text_content());

        match text {
            Some(json) if !json.trim().is_empty() => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from #{}", Self::ELEMENT_ID);
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring #{}: {e}", Self::ELEMENT_ID);
                    Self::default()
                }
            },
            _ => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Native runs read `BRICK_QUEST_SETTINGS` as a path to a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var("BRICK_QUEST_SETTINGS") else {
            return Self::default();
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| Self::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => {
                log::info!("Loaded settings from {path}");
                settings
            }
            Err(e) => {
                log::warn!("Ignoring {path}: {e}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let settings = Settings::default();
        assert_eq!(settings.action_for("ArrowRight"), Some(Action::Forward));
        assert_eq!(settings.action_for("ArrowLeft"), Some(Action::Backward));
        assert_eq!(settings.action_for("ArrowUp"), Some(Action::Jump));
        assert_eq!(settings.action_for(" "), Some(Action::Guard));
        assert_eq!(settings.action_for("Enter"), Some(Action::Attack));
        assert_eq!(settings.action_for("Shift"), Some(Action::Fire));
        assert_eq!(settings.action_for("Escape"), Some(Action::Pause));
        assert_eq!(settings.action_for("q"), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "muted": true, "seed": 7 }"#).unwrap();
        assert!(settings.muted);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.bindings, default_bindings());
        assert_eq!(settings.effect_gain(), 0.0);
    }

    #[test]
    fn test_remap_bindings() {
        let json = r#"{ "bindings": { "d": "Forward", "a": "Backward", "w": "Jump" } }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.action_for("d"), Some(Action::Forward));
        assert_eq!(settings.action_for("ArrowRight"), None);
    }

    #[test]
    fn test_level_tuning_override() {
        let json = r#"{ "levels": { "overworld": { "start_lives": 5 } } }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.levels.overworld.start_lives, 5);
        assert_eq!(settings.levels.skyway, LevelTunings::default().skyway);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(Settings::from_json("{ muted: yes"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Settings::from_json(r#"{ "bindings": { "x": "Teleport" } }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_empty_key() {
        let err = Settings::from_json(r#"{ "bindings": { "": "Jump" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "bindings"));
    }

    #[test]
    fn test_rejects_volume_out_of_range() {
        let err = Settings::from_json(r#"{ "sfx_volume": 1.5 }"#).unwrap_err();
        assert!(err.to_string().contains("sfx_volume"));
    }

    #[test]
    fn test_rejects_non_positive_spacing() {
        let mut settings = Settings::default();
        settings.levels.skyway.platform_spacing = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.levels.overworld.goombas.spacing = -1.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("overworld.goombas"));
    }

    #[test]
    fn test_reduced_motion_disables_shake() {
        let mut settings = Settings::default();
        assert!(settings.camera_shake());
        settings.reduced_motion = true;
        assert!(!settings.camera_shake());
    }
}
