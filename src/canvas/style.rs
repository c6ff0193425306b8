use serde::{Deserialize, Serialize};

use super::types::NodeType;
use crate::theme::Palette;

const NODE_CORNER_RADIUS: f32 = 12.0;
const NODE_BORDER_WIDTH: f32 = 3.0;
const MACHINE_CORNER_RADIUS: f32 = 8.0;
const FACTORY_CORNER_RADIUS: f32 = 12.0;
const CONTAINER_BORDER_WIDTH: f32 = 1.0;
const FACTORY_FILL_ALPHA: u8 = 80;

/// Per-node overrides as written in a recipe. Absent fields fall back
/// independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
}

/// Per-container overrides for machines and factories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNodeStyle {
    pub border_color: String,
    pub fill_color: String,
    pub text_color: String,
    pub label_color: String,
    pub corner_radius: f32,
    pub border_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLevel {
    Machine,
    Factory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContainerStyle {
    pub border_color: String,
    pub fill_color: String,
    /// 0 means the fill is not drawn.
    pub fill_alpha: u8,
    pub label_color: String,
    pub corner_radius: f32,
    pub border_width: f32,
}

impl ResolvedNodeStyle {
    pub fn defaults(node_type: NodeType, palette: &Palette) -> Self {
        Self {
            border_color: node_type.accent_color().to_string(),
            fill_color: palette.node_fill.clone(),
            text_color: palette.body_text.clone(),
            label_color: palette.node_label.clone(),
            corner_radius: NODE_CORNER_RADIUS,
            border_width: NODE_BORDER_WIDTH,
        }
    }
}

impl ResolvedContainerStyle {
    pub fn defaults(level: ContainerLevel, palette: &Palette) -> Self {
        match level {
            ContainerLevel::Machine => Self {
                border_color: palette.machine_border.clone(),
                fill_color: palette.machine_fill.clone(),
                fill_alpha: palette.machine_fill_alpha,
                label_color: palette.machine_label.clone(),
                corner_radius: MACHINE_CORNER_RADIUS,
                border_width: CONTAINER_BORDER_WIDTH,
            },
            ContainerLevel::Factory => Self {
                border_color: palette.factory_border.clone(),
                fill_color: palette.background.clone(),
                fill_alpha: 0,
                label_color: palette.factory_label.clone(),
                corner_radius: FACTORY_CORNER_RADIUS,
                border_width: CONTAINER_BORDER_WIDTH,
            },
        }
    }
}

pub fn resolve_node_style(
    style: Option<&NodeStyle>,
    node_type: NodeType,
    palette: &Palette,
) -> ResolvedNodeStyle {
    let mut resolved = ResolvedNodeStyle::defaults(node_type, palette);
    let Some(style) = style else {
        return resolved;
    };

    if let Some(color) = &style.border_color {
        resolved.border_color = color.clone();
    }
    if let Some(color) = &style.fill_color {
        resolved.fill_color = color.clone();
    }
    if let Some(color) = &style.text_color {
        resolved.text_color = color.clone();
    }
    if let Some(color) = &style.label_color {
        resolved.label_color = color.clone();
    }
    if let Some(radius) = style.corner_radius {
        resolved.corner_radius = radius;
    }
    if let Some(width) = style.border_width {
        resolved.border_width = width;
    }
    resolved
}

/// A factory only gets a fill once a fill color is given; it then defaults
/// to a faint alpha instead of the machine's.
pub fn resolve_container_style(
    style: Option<&ContainerStyle>,
    level: ContainerLevel,
    palette: &Palette,
) -> ResolvedContainerStyle {
    let mut resolved = ResolvedContainerStyle::defaults(level, palette);
    let Some(style) = style else {
        return resolved;
    };

    if let Some(color) = &style.border_color {
        resolved.border_color = color.clone();
    }
    if let Some(color) = &style.fill_color {
        resolved.fill_color = color.clone();
        if level == ContainerLevel::Factory {
            resolved.fill_alpha = FACTORY_FILL_ALPHA;
        }
    }
    if let Some(color) = &style.label_color {
        resolved.label_color = color.clone();
    }
    if let Some(alpha) = style.alpha {
        match level {
            ContainerLevel::Machine => resolved.fill_alpha = alpha,
            ContainerLevel::Factory if style.fill_color.is_some() => resolved.fill_alpha = alpha,
            ContainerLevel::Factory => {}
        }
    }
    if let Some(radius) = style.corner_radius {
        resolved.corner_radius = radius;
    }
    if let Some(width) = style.border_width {
        resolved.border_width = width;
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_style_fields_fall_back_independently() {
        let palette = Palette::dark();
        let partial = NodeStyle {
            fill_color: Some("#000000".into()),
            border_width: Some(5.0),
            ..NodeStyle::default()
        };

        let resolved = resolve_node_style(Some(&partial), NodeType::Ai, &palette);
        assert_eq!(resolved.fill_color, "#000000");
        assert_eq!(resolved.border_width, 5.0);
        assert_eq!(resolved.border_color, NodeType::Ai.accent_color());
        assert_eq!(resolved.text_color, palette.body_text);
        assert_eq!(resolved.corner_radius, 12.0);
    }

    #[test]
    fn no_style_yields_type_defaults() {
        let palette = Palette::light();
        let resolved = resolve_node_style(None, NodeType::Decision, &palette);
        assert_eq!(
            resolved,
            ResolvedNodeStyle::defaults(NodeType::Decision, &palette)
        );
        assert_eq!(resolved.border_color, "#f44336");
        assert_eq!(resolved.fill_color, palette.node_fill);
    }

    #[test]
    fn machine_defaults_use_palette_alpha() {
        let palette = Palette::dark();
        let resolved = resolve_container_style(None, ContainerLevel::Machine, &palette);
        assert_eq!(resolved.fill_alpha, 120);
        assert_eq!(resolved.corner_radius, 8.0);
        assert_eq!(resolved.border_width, 1.0);
    }

    #[test]
    fn factory_fill_only_appears_with_a_fill_color() {
        let palette = Palette::dark();
        let plain = resolve_container_style(None, ContainerLevel::Factory, &palette);
        assert_eq!(plain.fill_alpha, 0);
        assert_eq!(plain.corner_radius, 12.0);

        let alpha_only = ContainerStyle {
            alpha: Some(200),
            ..ContainerStyle::default()
        };
        let resolved = resolve_container_style(Some(&alpha_only), ContainerLevel::Factory, &palette);
        assert_eq!(resolved.fill_alpha, 0);

        let filled = ContainerStyle {
            fill_color: Some("#336699".into()),
            ..ContainerStyle::default()
        };
        let resolved = resolve_container_style(Some(&filled), ContainerLevel::Factory, &palette);
        assert_eq!(resolved.fill_alpha, 80);
        assert_eq!(resolved.fill_color, "#336699");
        assert_eq!(resolved.border_color, palette.factory_border);
    }
}
