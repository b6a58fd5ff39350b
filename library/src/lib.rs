//! Node-graph composition engine for layered scene documents.
//!
//! A [`SceneGraph`] holds typed nodes in a tree rooted at a single Root
//! node. Executing the graph replays every node onto a fresh [`Stage`],
//! producing the composed document; importing a document builds the graph
//! that reproduces it.

pub mod error;
pub mod events;
pub mod expression;
pub mod graph;
pub mod model;
pub mod nodes;
pub mod registry;
pub mod stage;

pub use error::{LibraryError, Result};
pub use events::{EventBus, GraphEvent, ListenerId};
pub use graph::SceneGraph;
pub use model::{
    ConnectionTarget, ExecState, Node, NodeId, Parameter, ParameterSource, PortDirection,
    PortLink, TimeSamples, Value, ValueType, Vec2, Vec3, Vec4,
};
pub use registry::{
    ApplyContext, Capability, NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition,
};
pub use stage::{ScenePath, Stage};
