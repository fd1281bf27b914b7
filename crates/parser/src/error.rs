//! Parser-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read Actfile '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed section header: '{0}'")]
    MalformedHeader(String),

    #[error("unterminated multiline block for key '{key}' in section '{section}'")]
    UnterminatedBlock { section: String, key: String },

    #[error("invalid JSON for key '{key}' in section '{section}': {message}")]
    InvalidJson {
        section: String,
        key: String,
        message: String,
    },

    #[error("workflow has no 'start_node' defined in [workflow]")]
    MissingStartNode,

    #[error("start_node '{0}' is not defined in any [node:...] section")]
    UnknownStartNode(String),

    #[error("edge references undefined node '{node_id}' ({side} side)")]
    DanglingEdge { node_id: String, side: &'static str },

    #[error("node '{0}' is missing a required 'type' key")]
    MissingNodeType(String),

    #[error("failed to load external code file '{path}' referenced by node '{node_id}': {source}")]
    FileLoad {
        node_id: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
