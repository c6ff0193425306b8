//! Error types for the recipe pipeline.
//!
//! Every failure is raised by the stage that discovers it and carries the
//! offending identifier so a caller can report it without re-parsing.

use thiserror::Error;

/// Broad classification of an [`Error`], one per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The recipe is malformed or breaks the id rules.
    Structure,
    /// A connection names an id that does not exist.
    Reference,
    /// The model cannot be laid out.
    Layout,
    /// The positioned model cannot be drawn.
    Render,
    /// The render configuration, not the recipe, is at fault.
    Config,
}

/// The main error type for parsing, layout and rendering.
#[derive(Debug, Error)]
pub enum Error {
    #[error("recipe is not valid YAML: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("invalid render config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid `{field}` in render config: {value}")]
    InvalidConfig { field: &'static str, value: String },

    #[error("recipe is empty")]
    EmptyRecipe,

    #[error("{level} #{position} has no id")]
    MissingId { level: &'static str, position: usize },

    #[error("duplicate id `{id}`: already used by a {first}, declared again on a {second}")]
    DuplicateId {
        id: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("node `{node}` lists unknown node `{target}` in `{field}`")]
    UnknownReference {
        node: String,
        field: &'static str,
        target: String,
    },

    #[error("canvas has no nodes to lay out")]
    EmptyCanvas,

    #[error("node `{id}` has unusable geometry: {reason}")]
    InvalidGeometry { id: String, reason: String },

    #[error("invalid `{field}` value `{value}` on `{owner}`")]
    InvalidStyle {
        owner: String,
        field: &'static str,
        value: String,
    },

    #[error("invalid render scale: {0}")]
    InvalidScale(f32),

    #[error("rasterization failed: {0}")]
    Raster(String),
}

impl Error {
    /// The stage this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_)
            | Error::EmptyRecipe
            | Error::MissingId { .. }
            | Error::DuplicateId { .. } => ErrorKind::Structure,
            Error::UnknownReference { .. } => ErrorKind::Reference,
            Error::EmptyCanvas | Error::InvalidGeometry { .. } => ErrorKind::Layout,
            Error::InvalidStyle { .. } | Error::InvalidScale(_) | Error::Raster(_) => {
                ErrorKind::Render
            }
            Error::Config(_) | Error::InvalidConfig { .. } => ErrorKind::Config,
        }
    }

    /// The id at fault, when the error is tied to one.
    ///
    /// For a dangling reference this is the missing id, not the node that
    /// declared it.
    pub fn offending_id(&self) -> Option<&str> {
        match self {
            Error::DuplicateId { id, .. } | Error::InvalidGeometry { id, .. } => Some(id),
            Error::UnknownReference { target, .. } => Some(target),
            Error::InvalidStyle { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn kinds_follow_the_stage() {
        let dup = Error::DuplicateId {
            id: "x".into(),
            first: "node",
            second: "node",
        };
        assert_eq!(dup.kind(), ErrorKind::Structure);
        assert_eq!(dup.offending_id(), Some("x"));

        let missing = Error::UnknownReference {
            node: "a".into(),
            field: "inputs",
            target: "ghost".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::Reference);
        assert_eq!(missing.offending_id(), Some("ghost"));

        assert_eq!(Error::EmptyCanvas.kind(), ErrorKind::Layout);
        assert_eq!(Error::InvalidScale(0.0).kind(), ErrorKind::Render);
    }

    #[test]
    fn config_failures_are_not_recipe_failures() {
        let err = Error::InvalidConfig {
            field: "scale",
            value: "0".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.offending_id(), None);
    }

    #[test]
    fn messages_name_the_offender() {
        let err = Error::UnknownReference {
            node: "clean".into(),
            field: "inputs",
            target: "ingest".into(),
        };
        assert_eq!(
            err.to_string(),
            "node `clean` lists unknown node `ingest` in `inputs`"
        );
    }
}
