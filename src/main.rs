use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use canvas_recipe::{
    CosmicTextMeasure, Error, Orientation, RenderConfig, SpacingLevel, ThemeName, canvas_to_yaml,
    render_recipe,
};

/// Render a canvas recipe (YAML) to a PNG diagram
#[derive(Parser, Debug)]
#[command(name = "canvas-recipe")]
#[command(about = "Lay out and render canvas recipes to PNG", long_about = None)]
struct Args {
    /// Input recipe file (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output PNG path
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// TOML render config (organize, spacing_level, orientation, scale, theme)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Run the organize layout regardless of the config
    #[arg(long)]
    organize: bool,

    /// Spacing preset: node, container or network
    #[arg(long, value_name = "LEVEL")]
    spacing: Option<String>,

    /// Organize direction: horizontal or vertical
    #[arg(long, value_name = "DIRECTION")]
    orientation: Option<String>,

    /// Built-in theme overriding the recipe's (dark, light)
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Raster scale multiplier
    #[arg(long)]
    scale: Option<f32>,

    /// Also write the laid-out recipe as YAML
    #[arg(long, value_name = "YAML")]
    save_layout: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Failures of the command line wrapper itself.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Pipeline(#[from] Error),
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer).map_err(|source| {
            CliError::Read {
                path: "stdin".to_string(),
                source,
            }
        })?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })
    }
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, data).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn load_config(args: &Args) -> Result<RenderConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::from_toml_str(&read_input(path)?)?,
        None => RenderConfig::default(),
    };

    if args.organize {
        config.organize = true;
    }
    if let Some(level) = &args.spacing {
        config.spacing_level = SpacingLevel::from_name(level)
            .ok_or_else(|| CliError::Usage(format!("unknown spacing level '{level}'")))?;
    }
    if let Some(direction) = &args.orientation {
        config.orientation = Orientation::from_name(direction)
            .ok_or_else(|| CliError::Usage(format!("unknown orientation '{direction}'")))?;
    }
    if let Some(theme) = &args.theme {
        config.theme = Some(ThemeName::from_builtin(theme).map_err(CliError::Usage)?);
    }
    if let Some(scale) = args.scale {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidScale(scale).into());
        }
        config.scale = scale;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = load_config(args)?;
    debug!(config:?; "Resolved render config");

    let recipe = read_input(&args.input)?;
    let mut measure = CosmicTextMeasure::new();
    let rendered = render_recipe(&recipe, &config, &mut measure)?;

    write_output(&args.output, &rendered.image.to_png()?)?;
    info!(path:? = args.output; "PNG saved");

    if let Some(path) = &args.save_layout {
        let yaml = canvas_to_yaml(&rendered.canvas)?;
        write_output(path, yaml.as_bytes())?;
        info!(path:?; "Layout saved");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    debug!(args:?; "Parsed arguments");

    if let Err(err) = run(&args) {
        match &err {
            CliError::Pipeline(inner) => error!(
                kind:? = inner.kind(),
                id = inner.offending_id().unwrap_or("-");
                "{err}"
            ),
            _ => error!("{err}"),
        }
        process::exit(1);
    }
}
