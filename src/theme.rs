use serde::{Deserialize, Serialize};

const BUILTIN_THEMES: &[&str] = &["dark", "light"];

/// Named theme selectable from a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn from_builtin(name: &str) -> Result<Self, String> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "dark" | "catppuccin_mocha" => Ok(ThemeName::Dark),
            "light" | "catppuccin_latte" => Ok(ThemeName::Light),
            _ => Err(format!(
                "Unknown built-in theme '{}'. Available: {}",
                name,
                Self::list_builtins().join(", ")
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
        }
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.to_vec()
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeName::Dark => Palette::dark(),
            ThemeName::Light => Palette::light(),
        }
    }
}

/// Colors shared by every element that has no explicit style.
#[derive(Debug, Clone)]
pub struct Palette {
    pub background: String,
    pub title: String,
    pub body_text: String,

    pub machine_fill: String,
    pub machine_fill_alpha: u8,
    pub machine_border: String,
    pub machine_label: String,

    pub factory_border: String,
    pub factory_label: String,

    pub node_fill: String,
    pub node_label: String,
}

impl Palette {
    /// Catppuccin Mocha.
    pub fn dark() -> Self {
        Palette {
            background: "#11111b".to_string(),
            title: "#cdd6f4".to_string(),
            body_text: "#a6adc8".to_string(),
            machine_fill: "#181825".to_string(),
            machine_fill_alpha: 120,
            machine_border: "#313244".to_string(),
            machine_label: "#6c7086".to_string(),
            factory_border: "#45475a".to_string(),
            factory_label: "#a6adc8".to_string(),
            node_fill: "#1e1e2e".to_string(),
            node_label: "#cdd6f4".to_string(),
        }
    }

    /// Catppuccin Latte.
    pub fn light() -> Self {
        Palette {
            background: "#ffffff".to_string(),
            title: "#1e1e2e".to_string(),
            body_text: "#4c4f69".to_string(),
            machine_fill: "#e6e9ef".to_string(),
            machine_fill_alpha: 180,
            machine_border: "#bcc0cc".to_string(),
            machine_label: "#5c5f77".to_string(),
            factory_border: "#9ca0b0".to_string(),
            factory_label: "#4c4f69".to_string(),
            node_fill: "#eff1f5".to_string(),
            node_label: "#1e1e2e".to_string(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::dark()
    }
}

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };

        let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
        let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
        let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
        Some(Rgb { r, g, b })
    }

    /// Scales every channel by `factor` (0 = black, 1 = unchanged).
    pub fn darken(self, factor: f32) -> Self {
        let scale = |v: u8| (f32::from(v) * factor.clamp(0.0, 1.0)).round() as u8;
        Rgb {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
