use crate::blackboard::{Blackboard, TickContext};
use crate::bt::node::{BtNode, Status};

/// Owns the tree shape for a run; stateless between ticks beyond what the blackboard carries
/// (spec §6: the tree itself has no node-local mutable state).
pub struct Executor {
    root: BtNode,
}

impl Executor {
    pub fn new(root: BtNode) -> Self {
        Self { root }
    }

    /// Tick the whole tree once against a freshly built blackboard, returning the resulting
    /// status and the populated `TickContext` for telemetry (spec §4.5, §6).
    pub fn tick(&self, blackboard: Blackboard) -> (Status, TickContext) {
        let mut ctx = TickContext::new(blackboard);
        let status = self.root.tick(&mut ctx);
        (status, ctx)
    }
}
