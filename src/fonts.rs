use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Weight};

/// Line height as a multiple of the font size.
const LINE_SPACING: f32 = 1.2;

/// Measures single-line text extents in unscaled canvas pixels.
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32);
}

/// Shapes text against the system fonts. One buffer is reused for every
/// call and results are cached per text, size and weight.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    buffer: Buffer,
    cache: HashMap<(String, u32, bool), (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        let mut font_system = FontSystem::new();
        let buffer = Buffer::new(&mut font_system, Metrics::new(16.0, 16.0 * LINE_SPACING));
        Self {
            font_system,
            buffer,
            cache: HashMap::new(),
        }
    }

    fn shape(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let line_height = font_size * LINE_SPACING;
        self.buffer
            .set_metrics(&mut self.font_system, Metrics::new(font_size, line_height));
        self.buffer.set_size(&mut self.font_system, None, None);

        let weight = if is_bold { Weight::BOLD } else { Weight::NORMAL };
        let attrs = Attrs::new().family(Family::SansSerif).weight(weight);
        self.buffer
            .set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let (width, lines) = self
            .buffer
            .layout_runs()
            .fold((0.0f32, 0usize), |(width, lines), run| {
                (width.max(run.line_w), lines + 1)
            });
        (width, line_height * lines.max(1) as f32)
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let key = (text.to_string(), font_size.to_bits(), is_bold);
        if let Some(&size) = self.cache.get(&key) {
            return size;
        }
        let size = self.shape(text, font_size, is_bold);
        self.cache.insert(key, size);
        size
    }
}

/// Fixed advance per character; used where no font database is wanted.
#[derive(Debug, Clone, Copy)]
pub struct ApproximateMeasure {
    pub advance: f32,
}

impl Default for ApproximateMeasure {
    fn default() -> Self {
        Self { advance: 0.55 }
    }
}

impl TextMeasure for ApproximateMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let weight = if is_bold { 1.08 } else { 1.0 };
        let width = text.chars().count() as f32 * font_size * self.advance * weight;
        (width, font_size * LINE_SPACING)
    }
}

/// Greedy word wrap to `max_width`; words wider than a line are split by
/// character. Always returns at least one line.
pub fn wrap_text<T: TextMeasure>(
    measure: &mut T,
    text: &str,
    font_size: f32,
    is_bold: bool,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if measure.measure_text(&candidate, font_size, is_bold).0 <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if measure.measure_text(word, font_size, is_bold).0 <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = split_long_word(measure, word, font_size, is_bold, max_width);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn split_long_word<T: TextMeasure>(
    measure: &mut T,
    word: &str,
    font_size: f32,
    is_bold: bool,
    max_width: f32,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in word.chars() {
        current.push(c);
        if current.chars().count() > 1
            && measure.measure_text(&current, font_size, is_bold).0 > max_width
        {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
