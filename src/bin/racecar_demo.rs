//! CLI entry point, grounded on `original_source/.../run_demo.py`'s `parse_args`/`main` —
//! the in-scope flags only; PyBullet rendering and manual keyboard control are out of scope
//! (spec Non-goals).

use clap::Parser;
use log::info;

use racecar_bt_planner::{
    Action, BodyHandle, Executor, KinematicAdapter, Mode, Obstacle, PlannerConfig, RunSummary,
    Runtime, RuntimeConfig,
};
use racecar_bt_planner::geometry::Point2;
use racecar_bt_planner::modes;
use racecar_bt_planner::state::CarState;
use racecar_bt_planner::telemetry::JsonlSink;

#[derive(Parser, Debug)]
#[clap(name = "racecar_demo", about = "BT + MCTS racecar controller demo")]
struct Cli {
    #[clap(long, value_enum, default_value = "basic")]
    mode: CliMode,

    #[clap(long, default_value_t = 42)]
    seed: u64,

    #[clap(long, default_value_t = 0.0)]
    start_x: f64,
    #[clap(long, default_value_t = 0.0)]
    start_y: f64,
    #[clap(long, default_value_t = 0.0)]
    start_yaw: f64,

    #[clap(long, default_value_t = 5.0)]
    goal_x: f64,
    #[clap(long, default_value_t = 0.0)]
    goal_y: f64,

    /// Repeatable `cx,cy,hx,hy` box obstacle.
    #[clap(long = "obstacle")]
    obstacles: Vec<String>,

    #[clap(long, default_value_t = 20.0)]
    tick_hz: f64,
    #[clap(long, default_value_t = 400)]
    max_ticks: u32,

    #[clap(long, default_value_t = 20.0)]
    budget_ms: f64,
    #[clap(long, default_value_t = 1200)]
    iters_max: u32,

    #[clap(long, default_value = "telemetry.jsonl")]
    output: String,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliMode {
    Basic,
    Obstacles,
    Planner,
}

impl From<CliMode> for Mode {
    fn from(m: CliMode) -> Self {
        match m {
            CliMode::Basic => Mode::Basic,
            CliMode::Obstacles => Mode::Obstacles,
            CliMode::Planner => Mode::Planner,
        }
    }
}

fn parse_obstacle(spec: &str) -> Option<Obstacle> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    let cx: f64 = parts[0].trim().parse().ok()?;
    let cy: f64 = parts[1].trim().parse().ok()?;
    let hx: f64 = parts[2].trim().parse().ok()?;
    let hy: f64 = parts[3].trim().parse().ok()?;
    Some(Obstacle::new(cx, cy, hx, hy, BodyHandle(0)))
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut planner_config = PlannerConfig::default();
    planner_config.budget_ms = cli.budget_ms;
    planner_config.iters_max = cli.iters_max;

    if let Err(e) = planner_config.validate() {
        eprintln!("invalid planner configuration: {}", e);
        std::process::exit(1);
    }

    let runtime_config = RuntimeConfig {
        tick_hz: cli.tick_hz,
        max_ticks: cli.max_ticks,
        steps_per_tick: 1,
        safe_action: Action::zero(),
    };
    if let Err(e) = runtime_config.validate() {
        eprintln!("invalid runtime configuration: {}", e);
        std::process::exit(1);
    }

    let obstacles: Vec<Obstacle> = cli.obstacles.iter().filter_map(|s| parse_obstacle(s)).collect();
    let mode: Mode = cli.mode.into();

    let adapter = KinematicAdapter::new(
        CarState::new(cli.start_x, cli.start_y, cli.start_yaw, 0.0),
        Point2::new(cli.goal_x, cli.goal_y),
        obstacles,
        planner_config,
    );
    let executor = Executor::new(modes::build(mode, planner_config, cli.seed));
    let mut runtime = Runtime::new(adapter, executor, runtime_config, mode, cli.seed, 0);

    let mut sink = match JsonlSink::create(&cli.output) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("failed to open telemetry sink {}: {}", cli.output, e);
            std::process::exit(1);
        }
    };

    match runtime.run(&mut sink) {
        Ok(summary) => {
            info!("run finished: {:?}", summary);
            print_summary(&summary);
        }
        Err(e) => {
            eprintln!("run aborted: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("failed to serialize run summary: {}", e),
    }
}
