use std::path::Path;

use log::debug;
use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::error::Error;

/// Rasterized canvas.
pub struct RenderedImage {
    pub pixmap: Pixmap,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn to_png(&self) -> Result<Vec<u8>, Error> {
        self.pixmap
            .encode_png()
            .map_err(|e| Error::Raster(format!("failed to encode PNG: {e}")))
    }
}

impl std::fmt::Debug for RenderedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Pixel size of an SVG of `width` x `height` user units at `scale`.
pub fn scaled_size(width: f32, height: f32, scale: f32) -> Result<(u32, u32), Error> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidScale(scale));
    }
    let w = (width * scale).ceil();
    let h = (height * scale).ceil();
    let fits = |v: f32| v.is_finite() && (1.0..=u32::MAX as f32).contains(&v);
    if !fits(w) || !fits(h) {
        return Err(Error::Raster(format!("cannot allocate a {w}x{h} image")));
    }
    Ok((w as u32, h as u32))
}

pub fn svg_to_pixmap(svg: &str, scale: f32) -> Result<RenderedImage, Error> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidScale(scale));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();

        let local_fonts = Path::new("fonts");
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        configure_font_fallbacks(fontdb);
    }

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Raster(format!("failed to parse scene: {e}")))?;

    let (width, height) = scaled_size(tree.size().width(), tree.size().height(), scale)?;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Raster(format!("failed to create a {width}x{height} pixmap")))?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    debug!(width = width, height = height, scale = scale; "Rasterized scene");

    Ok(RenderedImage {
        pixmap,
        width,
        height,
    })
}

/// Points the generic families at whatever the system actually has, so
/// `sans-serif` text never silently disappears.
fn configure_font_fallbacks(fontdb: &mut usvg::fontdb::Database) {
    let mut sans_family: Option<String> = None;
    let mut first_family: Option<String> = None;

    for face in fontdb.faces() {
        for (family, _) in &face.families {
            if first_family.is_none() {
                first_family = Some(family.clone());
            }
            if sans_family.is_none() && family.to_ascii_lowercase().contains("sans") {
                sans_family = Some(family.clone());
            }
        }
    }

    if let Some(family) = sans_family.as_deref().or(first_family.as_deref()) {
        fontdb.set_sans_serif_family(family);
    }
}
