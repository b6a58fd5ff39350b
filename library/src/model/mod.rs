pub mod connection;
pub mod node;
pub mod parameter;
pub mod time_samples;
pub mod value;

pub use connection::{ConnectionTarget, PinId, PortDirection, PortLink};
pub use node::{ExecState, Node, NodeId};
pub use parameter::{Parameter, ParameterSource};
pub use time_samples::{TimeSample, TimeSamples};
pub use value::{Value, ValueType, Vec2, Vec3, Vec4};
