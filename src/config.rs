use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::theme::ThemeName;

const DEFAULT_SCALE: f32 = 2.0;

/// Spacing preset used by both layout modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingLevel {
    Node,
    #[default]
    Container,
    Network,
}

/// Horizontal and vertical pixel increments for a [`SpacingLevel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub horizontal: f32,
    pub vertical: f32,
}

impl SpacingLevel {
    pub fn spacing(self) -> Spacing {
        match self {
            SpacingLevel::Node => Spacing {
                horizontal: 90.0,
                vertical: 140.0,
            },
            SpacingLevel::Container => Spacing {
                horizontal: 200.0,
                vertical: 240.0,
            },
            SpacingLevel::Network => Spacing {
                horizontal: 260.0,
                vertical: 320.0,
            },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "node" => Some(SpacingLevel::Node),
            "container" => Some(SpacingLevel::Container),
            "network" => Some(SpacingLevel::Network),
            _ => None,
        }
    }
}

/// Direction organize advances levels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Levels left to right, machines stacked downwards.
    #[default]
    Horizontal,
    /// Levels top to bottom, machines side by side.
    Vertical,
}

impl Orientation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Some(Orientation::Horizontal),
            "vertical" => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

/// Caller configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub organize: bool,
    #[serde(default)]
    pub spacing_level: SpacingLevel,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Overrides the theme named in the recipe.
    #[serde(default)]
    pub theme: Option<ThemeName>,
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            organize: false,
            spacing_level: SpacingLevel::default(),
            orientation: Orientation::default(),
            scale: DEFAULT_SCALE,
            theme: None,
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: RenderConfig = toml::from_str(content)?;
        if !config.scale.is_finite() || config.scale <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "scale",
                value: config.scale.to_string(),
            });
        }
        Ok(config)
    }
}
