//! Connection model for parameter value routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::error::LibraryError;

/// Direction of a shader-style port parameter.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// Infers a port direction from a document attribute name namespace.
    pub fn from_attribute_name(name: &str) -> Option<Self> {
        if name.starts_with("inputs:") {
            Some(PortDirection::Input)
        } else if name.starts_with("outputs:") {
            Some(PortDirection::Output)
        } else {
            None
        }
    }
}

/// Reference to another node's parameter, written `"<node>.<parameter>"`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionTarget {
    pub node: String,
    pub parameter: String,
}

impl ConnectionTarget {
    pub fn new(node: &str, parameter: &str) -> Self {
        Self {
            node: node.to_string(),
            parameter: parameter.to_string(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.parameter)
    }
}

impl FromStr for ConnectionTarget {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Node names never contain '.', parameter names may.
        match s.split_once('.') {
            Some((node, parameter)) if !node.is_empty() && !parameter.is_empty() => {
                Ok(ConnectionTarget::new(node, parameter))
            }
            _ => Err(LibraryError::InvalidConnection(format!(
                "expected '<node>.<parameter>', got '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ConnectionTarget {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConnectionTarget> for String {
    fn from(target: ConnectionTarget) -> Self {
        target.to_string()
    }
}

/// Identifies a specific parameter on a specific node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId {
    pub node_id: NodeId,
    pub pin_name: String,
}

impl PinId {
    pub fn new(node_id: NodeId, pin_name: &str) -> Self {
        Self {
            node_id,
            pin_name: pin_name.to_string(),
        }
    }
}

/// A value-routing edge between two parameters, independent of the execution tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortLink {
    /// Source parameter (the one being read)
    pub from: PinId,
    /// Destination parameter (the connected one)
    pub to: PinId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_target() {
        let target: ConnectionTarget = "Texture.outputs:rgb".parse().unwrap();
        assert_eq!(target, ConnectionTarget::new("Texture", "outputs:rgb"));
        assert_eq!(target.to_string(), "Texture.outputs:rgb");
    }

    #[test]
    fn test_parse_rejects_missing_parameter() {
        assert!("Texture".parse::<ConnectionTarget>().is_err());
        assert!("Texture.".parse::<ConnectionTarget>().is_err());
        assert!(".rgb".parse::<ConnectionTarget>().is_err());
    }

    #[test]
    fn test_port_direction_from_namespace() {
        assert_eq!(
            PortDirection::from_attribute_name("inputs:diffuseColor"),
            Some(PortDirection::Input)
        );
        assert_eq!(
            PortDirection::from_attribute_name("outputs:surface"),
            Some(PortDirection::Output)
        );
        assert_eq!(PortDirection::from_attribute_name("radius"), None);
    }
}
