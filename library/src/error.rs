use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Parameter not found: {node}.{parameter}")]
    ParameterNotFound { node: String, parameter: String },
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Listener error: {0}")]
    Listener(String),
    #[error("Document error: {0}")]
    Document(String),
    #[error("Graph error: {0}")]
    Graph(String),
}

impl LibraryError {
    pub fn invalid_path(message: impl Into<String>) -> Self {
        LibraryError::InvalidPath(message.into())
    }

    pub fn node_not_found(node: impl std::fmt::Display) -> Self {
        LibraryError::NodeNotFound(node.to_string())
    }

    pub fn parameter_not_found(node: &str, parameter: &str) -> Self {
        LibraryError::ParameterNotFound {
            node: node.to_string(),
            parameter: parameter.to_string(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        LibraryError::Document(message.into())
    }

    pub fn graph(message: impl Into<String>) -> Self {
        LibraryError::Graph(message.into())
    }

    pub fn listener(message: impl Into<String>) -> Self {
        LibraryError::Listener(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
