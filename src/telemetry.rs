//! Schema-validated newline-delimited JSON telemetry, schema `racecar_demo.v1` (spec §6.2,
//! §7). Grounded on the original's `JsonlSink` (open-on-construct, one `json.dumps` per
//! line, closed in a `finally` block); `Drop` replaces the `finally` for guaranteed release.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{error, info, warn};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::action::Action;
use crate::bt::Status;
use crate::error::SchemaError;
use crate::geometry::Point2;
use crate::modes::Mode;
use crate::planner::PlannerResult;
use crate::state::CarState;

pub const SCHEMA_VERSION: &str = "racecar_demo.v1";
pub const PLANNER_SCHEMA_VERSION: &str = "planner.v1";

/// BT-portion of a record: the root's resulting status, the in-order active path, and the
/// per-node resulting status (spec §6.2 `bt`). `node_status` is a JSON object keyed by node
/// name, so it carries no ordering guarantee — `active_path` is what preserves tick order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtPayload {
    pub status: Status,
    pub active_path: Vec<String>,
    pub node_status: BTreeMap<String, Status>,
}

impl BtPayload {
    pub fn from_context(status: Status, ctx: &crate::blackboard::TickContext) -> Self {
        Self {
            status,
            active_path: ctx.visited_nodes.clone(),
            node_status: ctx.node_status.iter().cloned().collect(),
        }
    }
}

/// Wraps the full `PlannerResult` for a tick where a `PlanAction` node ran (spec §6.2
/// `planner`, schema `planner.v1`). `PlannerResult`/`PlannerStats` are the Rust-side shape
/// (nested, grouping edge stats under `stats`); the wire shape is flat and carries its own
/// `schema_version`, so `Serialize` is hand-written below rather than derived, grounded on
/// the original's literal `planner_payload` dict in `run_demo.py`.
#[derive(Debug, Clone)]
pub struct PlannerPayload {
    pub plan: PlannerResult,
}

impl Serialize for PlannerPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let plan = &self.plan;
        let mut s = serializer.serialize_struct("PlannerPayload", 14)?;
        s.serialize_field("schema_version", PLANNER_SCHEMA_VERSION)?;
        s.serialize_field("budget_ms", &plan.stats.budget_ms)?;
        s.serialize_field("time_used_ms", &plan.stats.time_used_ms)?;
        s.serialize_field("iters", &plan.stats.iters)?;
        s.serialize_field("root_visits", &plan.stats.root_visits)?;
        s.serialize_field("root_children", &plan.stats.root_children)?;
        s.serialize_field("widen_added", &plan.stats.widen_added)?;
        s.serialize_field("depth_max", &plan.stats.depth_max)?;
        s.serialize_field("depth_mean", &plan.stats.depth_mean)?;
        s.serialize_field("status", &plan.status)?;
        s.serialize_field("confidence", &plan.confidence)?;
        s.serialize_field("value_est", &plan.stats.value_est)?;
        s.serialize_field("action", &plan.best_action)?;
        s.serialize_field("top_k", &plan.top_choices)?;
        s.end()
    }
}

/// One telemetry line (spec §6.2). Required top-level fields are plain struct fields so a
/// missing one is a compile error upstream rather than a runtime schema gap; `validate`
/// still checks schema-version match and float finiteness, the two conditions a producer
/// can get wrong at runtime. `bt`/`planner` are omitted entirely (not emitted as `null`) when
/// absent, matching the original's conditional dict-key insertion and spec §6.2's "optional".
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub schema_version: String,
    pub run_id: String,
    pub tick_index: u32,
    pub sim_time_s: f64,
    pub wall_time_s: f64,
    pub mode: Mode,
    pub state: CarState,
    pub goal: Point2,
    pub distance_to_goal: f64,
    pub collision_imminent: bool,
    pub action: Action,
    pub collisions_total: u32,
    pub goal_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bt: Option<BtPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planner: Option<PlannerPayload>,
}

#[allow(clippy::too_many_arguments)]
impl Record {
    pub fn new(
        run_id: String,
        tick_index: u32,
        sim_time_s: f64,
        wall_time_s: f64,
        mode: Mode,
        state: CarState,
        goal: Point2,
        collision_imminent: bool,
        action: Action,
        collisions_total: u32,
        goal_reached: bool,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            tick_index,
            sim_time_s,
            wall_time_s,
            mode,
            distance_to_goal: crate::model::Model::distance_to_goal(&state, goal),
            state,
            goal,
            collision_imminent,
            action,
            collisions_total,
            goal_reached,
            bt: None,
            planner: None,
        }
    }

    pub fn with_bt(mut self, payload: BtPayload) -> Self {
        self.bt = Some(payload);
        self
    }

    pub fn with_planner(mut self, payload: PlannerPayload) -> Self {
        self.planner = Some(payload);
        self
    }

    /// Schema checks spec §7 requires before a record is written: version match and every
    /// float finite (§6.2: "floats are finite (no NaN/Inf)").
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(SchemaError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: self.schema_version.clone(),
            });
        }
        if !self.state.x.is_finite() || !self.state.y.is_finite() || !self.state.yaw.is_finite() || !self.state.speed.is_finite() {
            return Err(SchemaError::NonFiniteField("state".to_string()));
        }
        if !self.sim_time_s.is_finite() || !self.wall_time_s.is_finite() || !self.distance_to_goal.is_finite() {
            return Err(SchemaError::NonFiniteField("sim_time_s/wall_time_s/distance_to_goal".to_string()));
        }
        if !self.action.steering.is_finite() || !self.action.throttle.is_finite() {
            return Err(SchemaError::NonFiniteField("action".to_string()));
        }
        if let Some(planner) = &self.planner {
            if !planner.plan.best_action.steering.is_finite() || !planner.plan.best_action.throttle.is_finite() {
                return Err(SchemaError::NonFiniteField("planner.plan.best_action".to_string()));
            }
        }
        Ok(())
    }
}

/// Where validated records go. A trait so tests can swap in an in-memory collector.
pub trait RecordSink {
    fn write(&mut self, record: &Record) -> Result<(), SchemaError>;
}

/// File-backed sink. Opens the file on construction; `Drop` flushes and closes it, the Rust
/// analogue of the original's `try/finally`-guarded `close()`.
pub struct JsonlSink {
    writer: Option<BufWriter<File>>,
    path: String,
}

impl JsonlSink {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let file = File::create(&path)?;
        info!("telemetry: opened sink at {}", path_str);
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path: path_str,
        })
    }
}

impl RecordSink for JsonlSink {
    fn write(&mut self, record: &Record) -> Result<(), SchemaError> {
        if let Err(e) = record.validate() {
            warn!("telemetry: rejecting record at tick {}: {}", record.tick_index, e);
            return Err(e);
        }
        if let Some(writer) = self.writer.as_mut() {
            let line = serde_json::to_string(record).expect("Record serialization cannot fail");
            let _ = writeln!(writer, "{}", line);
        }
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                error!("telemetry: failed to flush sink at {}: {}", self.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{PlannerStats, PlannerStatus};

    fn sample_state() -> CarState {
        CarState::new(1.0, 2.0, 0.0, 0.5)
    }

    fn sample_record() -> Record {
        Record::new(
            "basic-seed1-0".to_string(),
            0,
            0.05,
            0.001,
            Mode::Basic,
            sample_state(),
            Point2::new(5.0, 0.0),
            false,
            Action::new(0.1, 0.5),
            0,
            false,
        )
    }

    #[test]
    fn rejects_wrong_schema_version() {
        let mut record = sample_record();
        record.schema_version = "other.v1".to_string();
        assert!(matches!(record.validate(), Err(SchemaError::SchemaVersionMismatch { .. })));
    }

    #[test]
    fn rejects_non_finite_state() {
        let mut record = sample_record();
        record.state = CarState::new(f64::NAN, 0.0, 0.0, 0.0);
        assert!(matches!(record.validate(), Err(SchemaError::NonFiniteField(_))));
    }

    #[test]
    fn distance_to_goal_is_derived_from_state_and_goal() {
        let record = Record::new(
            "r".to_string(),
            0,
            0.0,
            0.0,
            Mode::Basic,
            CarState::new(0.0, 0.0, 0.0, 0.0),
            Point2::new(3.0, 4.0),
            false,
            Action::zero(),
            0,
            false,
        );
        assert!((record.distance_to_goal - 5.0).abs() < 1e-12);
    }

    #[test]
    fn accepts_well_formed_record_with_bt_and_planner_payload() {
        let mut node_status = BTreeMap::new();
        node_status.insert("plan_to_goal".to_string(), Status::Success);
        let record = sample_record()
            .with_bt(BtPayload {
                status: Status::Success,
                active_path: vec!["plan_to_goal".to_string()],
                node_status,
            })
            .with_planner(PlannerPayload {
                plan: PlannerResult {
                    status: PlannerStatus::Ok,
                    best_action: Action::new(0.1, 0.5),
                    confidence: 0.8,
                    top_choices: Vec::new(),
                    stats: PlannerStats {
                        iters: 10,
                        root_visits: 10,
                        root_children: 3,
                        widen_added: 3,
                        depth_max: 4,
                        depth_mean: 2.5,
                        budget_ms: 20.0,
                        time_used_ms: 5.0,
                        value_est: 0.4,
                        top_k: 5,
                    },
                },
            });
        assert!(record.validate().is_ok());
    }
}
