//! Named event dispatch.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::error;

use crate::error::Result;

pub const PARAMETER_VALUE_CHANGED: &str = "parameterValueChanged";
pub const LAYER_CHANGES_APPLIED: &str = "layerChangesApplied";
pub const STAGE_TIME_CHANGED: &str = "stageTimeChanged";
pub const NODE_CREATED: &str = "nodeCreated";
pub const NODE_DELETED: &str = "nodeDeleted";
pub const GRAPH_EXECUTED: &str = "graphExecuted";

#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    ParameterValueChanged { node: String, parameter: String },
    LayerChangesApplied,
    StageTimeChanged { time: f64 },
    NodeCreated { node: String },
    NodeDeleted { node: String },
    GraphExecuted { nodes: usize },
}

impl GraphEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GraphEvent::ParameterValueChanged { .. } => PARAMETER_VALUE_CHANGED,
            GraphEvent::LayerChangesApplied => LAYER_CHANGES_APPLIED,
            GraphEvent::StageTimeChanged { .. } => STAGE_TIME_CHANGED,
            GraphEvent::NodeCreated { .. } => NODE_CREATED,
            GraphEvent::NodeDeleted { .. } => NODE_DELETED,
            GraphEvent::GraphExecuted { .. } => GRAPH_EXECUTED,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&GraphEvent) -> Result<()>>;

/// Listeners keyed by event name, called in subscription order.
///
/// A listener that fails or panics is logged and the remaining listeners
/// still run.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        event_name: &str,
        listener: impl FnMut(&GraphEvent) -> Result<()> + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for listeners in self.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            removed |= listeners.len() != before;
        }
        removed
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners.get(event_name).map_or(0, Vec::len)
    }

    /// Dispatches `event` and returns how many listeners completed.
    pub fn emit(&mut self, event: &GraphEvent) -> usize {
        let Some(listeners) = self.listeners.get_mut(event.name()) else {
            return 0;
        };
        let mut completed = 0;
        for (id, listener) in listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => error!("Listener {:?} failed on {}: {}", id, event.name(), e),
                Err(_) => error!("Listener {:?} panicked on {}", id, event.name()),
            }
        }
        completed
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
