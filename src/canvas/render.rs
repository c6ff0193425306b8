use log::{debug, info};

use super::layout::{BBox, CONTAINER_HEADER, FACTORY_PADDING, MACHINE_PADDING};
use super::ports::{Port, select_ports};
use super::style::{
    ContainerLevel, ResolvedContainerStyle, ResolvedNodeStyle, resolve_container_style,
    resolve_node_style,
};
use super::types::{Canvas, Factory, Machine, Node};
use crate::error::Error;
use crate::fonts::{TextMeasure, wrap_text};
use crate::raster::{RenderedImage, svg_to_pixmap};
use crate::theme::{Palette, Rgb};

const FONT_FAMILY: &str = "sans-serif";

const NODE_TOP_BAR: f32 = 6.0;
const NODE_PADDING: f32 = 24.0;
const NODE_LABEL_GAP: f32 = 12.0;
const NODE_CONTENT_GAP: f32 = 10.0;
const NODE_BOTTOM_PAD: f32 = 36.0;
const LINE_HEIGHT: f32 = 24.0;

const BODY_FONT: f32 = 18.0;
const LABEL_FONT: f32 = 20.0;
const TITLE_FONT: f32 = 28.0;
const CONTAINER_FONT: f32 = 16.0;
const SMALL_FONT: f32 = 14.0;

const TITLE_BAND: f32 = 60.0;
const MARGIN: f32 = 20.0;

const CONNECTION_WIDTH: f32 = 4.0;
const CONNECTION_DARKEN: f32 = 0.7;
const ARROW_SIZE: f32 = 18.0;
const CONTROL_RATIO: f32 = 0.4;
const MIN_CONTROL_OFFSET: f32 = 40.0;

const BADGE_DARKEN: f32 = 0.3;
const BADGE_INSET: f32 = 10.0;

/// An SVG document for a positioned canvas, in canvas coordinates.
#[derive(Debug, Clone)]
pub struct Scene {
    pub svg: String,
    pub bounds: BBox,
}

/// Wrapped text for one node, each line paired with its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeText {
    pub label: Vec<(String, f32)>,
    pub content: Vec<(String, f32)>,
}

/// XML 1.0 allows tab, newline, carriage return and everything from U+0020
/// except surrogates and U+FFFE/U+FFFF.
fn is_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn baseline(top: f32, font_size: f32) -> f32 {
    top + font_size * 0.9
}

/// Parses and normalizes a color, attributing failures to `owner`.
fn checked_color(owner: &str, field: &'static str, value: &str) -> Result<Rgb, Error> {
    Rgb::parse_hex(value).ok_or_else(|| Error::InvalidStyle {
        owner: owner.to_string(),
        field,
        value: value.to_string(),
    })
}

fn checked_length(owner: &str, field: &'static str, value: f32) -> Result<f32, Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidStyle {
            owner: owner.to_string(),
            field,
            value: value.to_string(),
        })
    }
}

struct NodePaint {
    border: Rgb,
    fill: Rgb,
    text: Rgb,
    label: Rgb,
    radius: f32,
    border_width: f32,
}

impl NodePaint {
    fn new(owner: &str, style: &ResolvedNodeStyle) -> Result<Self, Error> {
        Ok(Self {
            border: checked_color(owner, "border_color", &style.border_color)?,
            fill: checked_color(owner, "fill_color", &style.fill_color)?,
            text: checked_color(owner, "text_color", &style.text_color)?,
            label: checked_color(owner, "label_color", &style.label_color)?,
            radius: checked_length(owner, "corner_radius", style.corner_radius)?,
            border_width: checked_length(owner, "border_width", style.border_width)?,
        })
    }
}

struct ContainerPaint {
    border: Rgb,
    fill: Rgb,
    alpha: u8,
    label: Rgb,
    radius: f32,
    border_width: f32,
}

impl ContainerPaint {
    fn new(owner: &str, style: &ResolvedContainerStyle) -> Result<Self, Error> {
        Ok(Self {
            border: checked_color(owner, "border_color", &style.border_color)?,
            fill: checked_color(owner, "fill_color", &style.fill_color)?,
            alpha: style.fill_alpha,
            label: checked_color(owner, "label_color", &style.label_color)?,
            radius: checked_length(owner, "corner_radius", style.corner_radius)?,
            border_width: checked_length(owner, "border_width", style.border_width)?,
        })
    }
}

pub fn machine_bounds(machine: &Machine) -> Option<BBox> {
    BBox::enclosing(machine.nodes.iter().map(BBox::of_node))
        .map(|b| b.with_padding(MACHINE_PADDING).with_header(CONTAINER_HEADER))
}

pub fn factory_bounds(factory: &Factory) -> Option<BBox> {
    BBox::enclosing(factory.machines.iter().filter_map(machine_bounds))
        .map(|b| b.with_padding(FACTORY_PADDING).with_header(CONTAINER_HEADER))
}

/// Union of every node and container, plus the title band and margin.
pub fn scene_bounds(canvas: &Canvas) -> Option<BBox> {
    let factories = canvas
        .networks
        .iter()
        .flat_map(|n| n.factories.iter())
        .filter_map(factory_bounds);
    let nodes = canvas.nodes().map(BBox::of_node);
    BBox::enclosing(factories.chain(nodes))
        .map(|b| b.with_header(TITLE_BAND).with_padding(MARGIN))
}

/// Wraps label and content into the node, dropping lines that would run
/// past the bottom padding.
pub fn layout_node_text<T: TextMeasure>(node: &Node, measure: &mut T) -> NodeText {
    let max_width = (node.width - 2.0 * NODE_PADDING).max(1.0);
    let label_line_height = LABEL_FONT * 1.2;
    let bottom = node.y + node.height;

    let mut top = node.y + NODE_TOP_BAR + NODE_LABEL_GAP;
    let mut label = Vec::new();
    for line in wrap_text(measure, node.label(), LABEL_FONT, true, max_width) {
        if top + label_line_height > bottom {
            break;
        }
        label.push((line, baseline(top, LABEL_FONT)));
        top += label_line_height;
    }

    let mut content = Vec::new();
    if !node.content.trim().is_empty() {
        top += NODE_CONTENT_GAP;
        let limit = bottom - NODE_BOTTOM_PAD;
        for line in wrap_text(measure, &node.content, BODY_FONT, false, max_width) {
            if top + LINE_HEIGHT > limit {
                break;
            }
            content.push((line, baseline(top, BODY_FONT)));
            top += LINE_HEIGHT;
        }
    }

    NodeText { label, content }
}

/// Builds the SVG scene for a positioned canvas.
pub fn render_scene<T: TextMeasure>(
    canvas: &Canvas,
    palette: &Palette,
    measure: &mut T,
) -> Result<Scene, Error> {
    let bounds = scene_bounds(canvas).ok_or(Error::EmptyCanvas)?;
    let background = checked_color("canvas", "background", &palette.background)?;
    let title_color = checked_color("canvas", "title", &palette.title)?;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.2}" height="{:.2}" viewBox="{:.2} {:.2} {:.2} {:.2}">"#,
        bounds.width, bounds.height, bounds.x, bounds.y, bounds.width, bounds.height
    ));
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        bounds.x,
        bounds.y,
        bounds.width,
        bounds.height,
        background.to_hex()
    ));

    let factories: Vec<&Factory> = canvas
        .networks
        .iter()
        .flat_map(|n| n.factories.iter())
        .collect();
    for factory in &factories {
        let Some(bbox) = factory_bounds(factory) else {
            continue;
        };
        let style = resolve_container_style(factory.style.as_ref(), ContainerLevel::Factory, palette);
        let paint = ContainerPaint::new(&factory.id, &style)?;
        svg.push_str(&render_container(&bbox, factory.label(), &paint));
    }
    for machine in factories.iter().flat_map(|f| f.machines.iter()) {
        let Some(bbox) = machine_bounds(machine) else {
            continue;
        };
        let style = resolve_container_style(machine.style.as_ref(), ContainerLevel::Machine, palette);
        let paint = ContainerPaint::new(&machine.id, &style)?;
        svg.push_str(&render_container(&bbox, machine.label(), &paint));
    }

    for edge in canvas.edges() {
        let (Some(source), Some(target)) = (canvas.node(&edge.source), canvas.node(&edge.target))
        else {
            continue;
        };
        let style = resolve_node_style(source.style.as_ref(), source.node_type, palette);
        let color = checked_color(&source.id, "border_color", &style.border_color)?
            .darken(CONNECTION_DARKEN);
        svg.push_str(&render_connection(
            &BBox::of_node(source),
            &BBox::of_node(target),
            color,
        ));
    }

    for (index, node) in canvas.nodes().enumerate() {
        let style = resolve_node_style(node.style.as_ref(), node.node_type, palette);
        let paint = NodePaint::new(&node.id, &style)?;
        let text = layout_node_text(node, measure);
        svg.push_str(&render_node(index, node, &paint, &text, measure));
    }

    svg.push_str(&format!(
        r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="bold" fill="{}" text-anchor="middle">{}</text>"#,
        bounds.center_x(),
        baseline(bounds.y + MARGIN + (TITLE_BAND - TITLE_FONT * 1.2) / 2.0, TITLE_FONT),
        FONT_FAMILY,
        TITLE_FONT,
        title_color.to_hex(),
        escape_xml(&canvas.title)
    ));
    svg.push_str("</svg>");

    debug!(
        width = bounds.width,
        height = bounds.height,
        connections = canvas.edges().len();
        "Built scene"
    );
    Ok(Scene { svg, bounds })
}

fn render_container(bbox: &BBox, label: &str, paint: &ContainerPaint) -> String {
    let mut svg = String::new();
    let fill = if paint.alpha == 0 {
        r#"fill="none""#.to_string()
    } else {
        format!(
            r#"fill="{}" fill-opacity="{:.3}""#,
            paint.fill.to_hex(),
            f32::from(paint.alpha) / 255.0
        )
    };
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" {} stroke="{}" stroke-width="{:.2}"/>"#,
        bbox.x,
        bbox.y,
        bbox.width,
        bbox.height,
        paint.radius,
        fill,
        paint.border.to_hex(),
        paint.border_width
    ));
    svg.push_str(&format!(
        r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="bold" fill="{}">{}</text>"#,
        bbox.x + 16.0,
        baseline(bbox.y + (CONTAINER_HEADER - CONTAINER_FONT * 1.2) / 2.0, CONTAINER_FONT),
        FONT_FAMILY,
        CONTAINER_FONT,
        paint.label.to_hex(),
        escape_xml(label)
    ));
    svg
}

/// Control points for the cubic curve between two ports. The offset runs
/// along each port's outward direction.
pub fn control_points(
    start: (f32, f32),
    end: (f32, f32),
    from: Port,
    to: Port,
) -> ((f32, f32), (f32, f32)) {
    let span = if from.is_vertical() {
        (end.1 - start.1).abs()
    } else {
        (end.0 - start.0).abs()
    };
    let offset = (span * CONTROL_RATIO).max(MIN_CONTROL_OFFSET);
    let (fx, fy) = from.outward();
    let (tx, ty) = to.outward();
    (
        (start.0 + fx * offset, start.1 + fy * offset),
        (end.0 + tx * offset, end.1 + ty * offset),
    )
}

fn render_connection(source: &BBox, target: &BBox, color: Rgb) -> String {
    let (from, to) = select_ports(source, target);
    let start = from.anchor(source);
    let end = to.anchor(target);
    let (c1, c2) = control_points(start, end, from, to);

    // Final tangent of a cubic is (end - c2); fall back to the port axis.
    let (mut dx, mut dy) = (end.0 - c2.0, end.1 - c2.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len > f32::EPSILON {
        dx /= len;
        dy /= len;
    } else {
        let (ox, oy) = to.outward();
        dx = -ox;
        dy = -oy;
    }

    let base = (end.0 - dx * ARROW_SIZE, end.1 - dy * ARROW_SIZE);
    let half = ARROW_SIZE * 0.4;
    let left = (base.0 - dy * half, base.1 + dx * half);
    let right = (base.0 + dy * half, base.1 - dx * half);
    let hex = color.to_hex();

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<path d="M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}" fill="none" stroke="{}" stroke-width="{:.1}" stroke-linecap="round"/>"#,
        start.0, start.1, c1.0, c1.1, c2.0, c2.1, base.0, base.1, hex, CONNECTION_WIDTH
    ));
    svg.push_str(&format!(
        r#"<polygon points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{}"/>"#,
        end.0, end.1, left.0, left.1, right.0, right.1, hex
    ));
    svg
}

fn render_node<T: TextMeasure>(
    index: usize,
    node: &Node,
    paint: &NodePaint,
    text: &NodeText,
    measure: &mut T,
) -> String {
    let mut svg = String::new();
    let (x, y, w, h) = (node.x, node.y, node.width, node.height);
    let clip_id = format!("node-clip-{index}");

    svg.push_str(&format!(
        r#"<clipPath id="{}"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}"/></clipPath>"#,
        clip_id, x, y, w, h, paint.radius
    ));
    svg.push_str(&format!(r#"<g clip-path="url(#{clip_id})">"#));

    // Body
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        x,
        y,
        w,
        h,
        paint.fill.to_hex()
    ));
    // Type stripe
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        x,
        y,
        w,
        NODE_TOP_BAR + paint.border_width,
        paint.border.to_hex()
    ));

    for (line, line_y) in &text.label {
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="bold" fill="{}">{}</text>"#,
            x + NODE_PADDING,
            line_y,
            FONT_FAMILY,
            LABEL_FONT,
            paint.label.to_hex(),
            escape_xml(line)
        ));
    }
    for (line, line_y) in &text.content {
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}">{}</text>"#,
            x + NODE_PADDING,
            line_y,
            FONT_FAMILY,
            BODY_FONT,
            paint.text.to_hex(),
            escape_xml(line)
        ));
    }

    // Type badge, bottom right
    let badge_text = node.node_type.as_str();
    let (text_w, text_h) = measure.measure_text(badge_text, SMALL_FONT, false);
    let badge_w = text_w + 12.0;
    let badge_h = text_h + 6.0;
    let badge_x = x + w - badge_w - BADGE_INSET;
    let badge_y = y + h - badge_h - BADGE_INSET;
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="4" fill="{}"/>"#,
        badge_x,
        badge_y,
        badge_w,
        badge_h,
        paint.border.darken(BADGE_DARKEN).to_hex()
    ));
    svg.push_str(&format!(
        r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}">{}</text>"#,
        badge_x + 6.0,
        baseline(badge_y + 3.0, SMALL_FONT),
        FONT_FAMILY,
        SMALL_FONT,
        paint.border.to_hex(),
        badge_text
    ));
    svg.push_str("</g>");

    // Outline on top so the clip does not halve it.
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="none" stroke="{}" stroke-width="{:.2}"/>"#,
        x,
        y,
        w,
        h,
        paint.radius,
        paint.border.to_hex(),
        paint.border_width
    ));
    svg
}

/// Draws a positioned canvas into a pixel buffer at `scale`.
pub fn render_canvas<T: TextMeasure>(
    canvas: &Canvas,
    palette: &Palette,
    scale: f32,
    measure: &mut T,
) -> Result<RenderedImage, Error> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidScale(scale));
    }
    let scene = render_scene(canvas, palette, measure)?;
    let image = svg_to_pixmap(&scene.svg, scale)?;
    info!(width = image.width, height = image.height; "Rendered canvas");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::layout::layout_canvas;
    use crate::canvas::parser::parse_recipe;
    use crate::config::RenderConfig;
    use crate::fonts::ApproximateMeasure;

    const CHAIN: &str = r#"
title: Chain & <Co>
nodes:
  - id: ingest
    type: input
    outputs: [clean]
  - id: clean
    type: process
    content: Remove duplicate rows before analysis
    outputs: [analyze]
  - id: analyze
    type: ai
"#;

    fn laid_out(recipe: &str) -> Canvas {
        let mut canvas = parse_recipe(recipe).expect("parse");
        layout_canvas(&mut canvas, &RenderConfig::default()).expect("layout");
        canvas
    }

    #[test]
    fn escape_special_xml_chars() {
        assert_eq!(
            escape_xml(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&apos;&lt;/a&gt;"
        );
        assert_eq!(escape_xml("a\u{0007}b\tc"), "ab\tc");
    }

    #[test]
    fn drops_noncharacters_and_keeps_whitespace_controls() {
        assert_eq!(escape_xml("bad\u{FFFE}\u{FFFF}"), "bad");
        assert_eq!(escape_xml("a\tb\nc\rd"), "a\tb\nc\rd");
        assert_eq!(escape_xml("\u{1F600}"), "\u{1F600}");
    }

    #[test]
    fn noncharacter_in_label_still_renders() {
        let canvas = laid_out("nodes:\n  - id: a\n    label: \"bad\\uFFFE\"\n");
        assert_eq!(canvas.node("a").map(|n| n.label()), Some("bad\u{FFFE}"));

        let image = render_canvas(&canvas, &Palette::dark(), 1.0, &mut ApproximateMeasure::default())
            .expect("scene stays valid XML");
        assert!(image.width > 0);
    }

    #[test]
    fn scene_has_one_path_per_connection_and_escaped_title() {
        let canvas = laid_out(CHAIN);
        let scene =
            render_scene(&canvas, &Palette::dark(), &mut ApproximateMeasure::default()).expect("scene");

        assert_eq!(scene.svg.matches("<path ").count(), 2);
        assert_eq!(scene.svg.matches("<clipPath ").count(), 3);
        assert!(scene.svg.contains("Chain &amp; &lt;Co&gt;"));
        // input accent #2196f3 darkened by 0.7
        assert!(scene.svg.contains(r##"stroke="#1769aa""##));
    }

    #[test]
    fn bounds_cover_containers_title_and_margin() {
        let canvas = laid_out(CHAIN);
        let bounds = scene_bounds(&canvas).expect("bounds");
        let left = 120.0 - MACHINE_PADDING - FACTORY_PADDING - MARGIN;
        assert_eq!(bounds.x, left);

        let top = 170.0
            - MACHINE_PADDING
            - CONTAINER_HEADER
            - FACTORY_PADDING
            - CONTAINER_HEADER
            - TITLE_BAND
            - MARGIN;
        assert_eq!(bounds.y, top);
    }

    #[test]
    fn control_points_follow_port_axes() {
        let (c1, c2) = control_points((0.0, 0.0), (300.0, 50.0), Port::Right, Port::Left);
        assert_eq!(c1, (120.0, 0.0));
        assert_eq!(c2, (180.0, 50.0));

        let (c1, c2) = control_points((0.0, 0.0), (10.0, 50.0), Port::Bottom, Port::Top);
        assert_eq!(c1, (0.0, 40.0));
        assert_eq!(c2, (10.0, 10.0));
    }

    #[test]
    fn overflowing_content_lines_are_dropped() {
        let mut node = Node::new("n");
        node.content = "word ".repeat(200);
        let text = layout_node_text(&node, &mut ApproximateMeasure::default());
        assert_eq!(text.label.len(), 1);
        // 120 tall: 6 + 12 + 24 label + 10 gap leaves 32px above the 36px pad.
        assert_eq!(text.content.len(), 1);

        node.height = 400.0;
        let taller = layout_node_text(&node, &mut ApproximateMeasure::default());
        assert!(taller.content.len() > 1);
        for (_, y) in &taller.content {
            assert!(*y < node.y + node.height);
        }
    }

    #[test]
    fn invalid_colors_and_lengths_name_the_owner() {
        let recipe = r##"
nodes:
  - id: bad
    style:
      fill_color: "#zzzzzz"
"##;
        let canvas = laid_out(recipe);
        let err = render_scene(&canvas, &Palette::dark(), &mut ApproximateMeasure::default())
            .expect_err("invalid color");
        assert_eq!(err.kind(), crate::error::ErrorKind::Render);
        assert!(matches!(
            &err,
            Error::InvalidStyle { owner, field: "fill_color", .. } if owner == "bad"
        ));

        let recipe = "nodes:\n  - id: neg\n    style:\n      corner_radius: -3\n";
        let canvas = laid_out(recipe);
        let err = render_scene(&canvas, &Palette::dark(), &mut ApproximateMeasure::default())
            .expect_err("negative radius");
        assert_eq!(err.offending_id(), Some("neg"));
    }

    #[test]
    fn image_size_follows_scale() {
        let canvas = laid_out(CHAIN);
        let bounds = scene_bounds(&canvas).expect("bounds");
        let mut measure = ApproximateMeasure::default();

        let one = render_canvas(&canvas, &Palette::dark(), 1.0, &mut measure).expect("1x");
        let two = render_canvas(&canvas, &Palette::dark(), 2.0, &mut measure).expect("2x");
        assert_eq!(one.width, bounds.width.ceil() as u32);
        assert_eq!(two.width, (bounds.width * 2.0).ceil() as u32);
        assert_eq!(two.height, (bounds.height * 2.0).ceil() as u32);

        assert!(matches!(
            render_canvas(&canvas, &Palette::dark(), -1.0, &mut measure),
            Err(Error::InvalidScale(_))
        ));
    }
}
