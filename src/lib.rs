//! Canvas recipes: a YAML description of networks, factories, machines and
//! nodes, laid out and drawn to a raster image.
//!
//! The pipeline runs in four stages, each usable on its own:
//! [`parse_recipe`] builds the model, [`layout_canvas`] positions it,
//! [`select_ports`] decides where connections attach and [`render_canvas`]
//! draws it. [`render_recipe`] chains all of them.

pub mod canvas;
pub mod config;
pub mod error;
pub mod fonts;
pub mod raster;
pub mod theme;

use log::info;

pub use canvas::{
    Canvas, canvas_to_yaml, layout_canvas, parse_recipe, render_canvas, select_ports,
};
pub use config::{Orientation, RenderConfig, SpacingLevel};
pub use error::{Error, ErrorKind};
pub use fonts::{ApproximateMeasure, CosmicTextMeasure, TextMeasure};
pub use raster::RenderedImage;
pub use theme::{Palette, ThemeName};

/// Output of a full pipeline run.
#[derive(Debug)]
pub struct Rendered {
    pub image: RenderedImage,
    /// The positioned model, e.g. for [`canvas_to_yaml`].
    pub canvas: Canvas,
}

/// Parses, lays out and renders `recipe` in one go.
pub fn render_recipe<T: TextMeasure>(
    recipe: &str,
    config: &RenderConfig,
    measure: &mut T,
) -> Result<Rendered, Error> {
    let mut canvas = parse_recipe(recipe)?;
    if let Some(theme) = config.theme {
        canvas.theme = theme;
    }

    layout_canvas(&mut canvas, config)?;
    let image = render_canvas(&canvas, &canvas.theme.palette(), config.scale, measure)?;

    info!(
        title = canvas.title.as_str(),
        theme = canvas.theme.as_str(),
        width = image.width,
        height = image.height;
        "Rendered recipe"
    );
    Ok(Rendered { image, canvas })
}
