//! SwarmSim - simulated swarm rescue
//!
//! Every robot runs the full rescue stack against simulated hardware in one
//! shared 2D arena. Partway through the run one robot (the victim) is flipped
//! over; the others hear its alert, scan for its distress call and drive to
//! it. A robot that gets close enough rights the victim, which then reports
//! itself safe.
//!
//! Usage:
//!   cargo run -p swarmsim -- --robots 6 --seconds 30
//!   cargo run -p swarmsim -- --fast --json
//!   RUST_LOG=debug cargo run -p swarmsim -- --config rescue.toml

mod telemetry;
mod world;

use clap::Parser;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ::rescue::library::algorithms::Pose2D;
use ::rescue::prelude::*;
use std::f64::consts::{PI, TAU};
use std::path::PathBuf;
use telemetry::{Summary, TelemetryNode};
use tracing::info;
use tracing_subscriber::EnvFilter;
use world::{World, WorldParams};

/// CLI arguments
#[derive(Parser)]
#[command(name = "swarmsim")]
#[command(about = "Simulated swarm of rescue robots")]
struct Args {
    /// Number of robots, victim included
    #[arg(long, default_value = "4")]
    robots: usize,

    /// Simulated run time (wall clock)
    #[arg(long, default_value = "20")]
    seconds: f64,

    /// Index of the robot that gets flipped
    #[arg(long, default_value = "0")]
    victim: usize,

    /// When the victim is flipped (ms after start)
    #[arg(long, default_value = "1000")]
    flip_at_ms: u64,

    /// Rescue configuration file (TOML or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for placement and sensor noise
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Run every rescue timer five times faster
    #[arg(long)]
    fast: bool,

    /// Print rescue events and the summary as JSON lines
    #[arg(long)]
    json: bool,
}

/// Advances the arena and plays the scripted victim flip
struct WorldNode {
    world: World,
    victim: usize,
    flip_at_ms: u64,
    start_ms: Option<u64>,
    summary: Arc<Mutex<Summary>>,
}

impl Node for WorldNode {
    fn name(&self) -> &str {
        "world"
    }

    fn tick(&mut self, _ctx: Option<&mut NodeInfo>) {
        self.world.step();
        let now = self.world.now_ms();
        let start = *self.start_ms.get_or_insert(now);

        let mut summary = self.summary.lock();
        if summary.victim_flipped_at_ms.is_none() && now - start >= self.flip_at_ms {
            if let Some(pose) = self.world.pose(self.victim) {
                info!(
                    "flipping robot #{} over at ({:.2}, {:.2})",
                    self.victim + 1,
                    pose.x,
                    pose.y
                );
            }
            self.world.set_upright(self.victim, false);
            summary.victim_flipped_at_ms = Some(now - start);
            return;
        }

        if summary.victim_flipped_at_ms.is_some() && !self.world.is_upright(self.victim) {
            if let Some((helper, distance)) = self.world.nearest_helper(self.victim) {
                if distance <= self.world.rescue_radius() {
                    info!("{} reached the victim and rights it", helper);
                    self.world.set_upright(self.victim, true);
                    summary.victim_righted_at_ms.get_or_insert(now - start);
                    summary.victim_righted_by.get_or_insert(helper);
                }
            }
        }
    }
}

fn load_config(args: &Args) -> AnyResult<RescueConfig> {
    let config = match &args.config {
        Some(path) => RescueConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RescueConfig::find_and_load()?.unwrap_or_default(),
    };
    Ok(if args.fast { config.scaled(0.2) } else { config })
}

fn run_time(seconds: f64) -> AnyResult<Duration> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--seconds must be a positive number, got {}", seconds);
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Victim at the origin, everyone else on a ring around it facing anywhere
fn placement(index: usize, victim: usize, rng: &mut ChaCha8Rng) -> Pose2D {
    if index == victim {
        return Pose2D::new(0.0, 0.0, 0.0);
    }
    let radius = rng.gen_range(0.4..1.4);
    let angle = rng.gen_range(0.0..TAU);
    Pose2D::new(
        radius * angle.cos(),
        radius * angle.sin(),
        rng.gen_range(-PI..PI),
    )
}

fn main() -> AnyResult<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if args.robots < 2 {
        bail!("need at least two robots, got {}", args.robots);
    }
    if args.victim >= args.robots {
        bail!("victim index {} out of range", args.victim);
    }
    let duration = run_time(args.seconds)?;

    let config = load_config(&args)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let world = World::new(WorldParams::default(), clock, args.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut robots = Vec::with_capacity(args.robots);
    for index in 0..args.robots {
        let id = DeviceId(index as u32 + 1);
        let body = world.spawn(id, placement(index, args.victim, &mut rng));
        let robot = Robot::with_seed(id, body.into_hardware(), &config, rng.gen())?;
        robots.push(robot);
    }

    let summary = Arc::new(Mutex::new(Summary::default()));
    let mut scheduler = Scheduler::new().name("SwarmSimScheduler");
    scheduler.add(
        Box::new(WorldNode {
            world: world.clone(),
            victim: args.victim,
            flip_at_ms: args.flip_at_ms,
            start_ms: None,
            summary: summary.clone(),
        }),
        0,
        None,
    );
    for robot in &robots {
        robot.add_nodes(&mut scheduler)?;
    }
    scheduler.add(
        Box::new(TelemetryNode::new(&robots, args.json, summary.clone())?),
        10,
        None,
    );

    info!(
        "{} robots, victim {}, running for {} s{}",
        args.robots,
        robots[args.victim].id(),
        args.seconds,
        if args.fast { " (fast timing)" } else { "" }
    );
    scheduler.run_for(duration)?;

    let summary = summary.lock().clone();
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("\n=== SwarmSim summary ===");
        println!("robots:          {}", summary.robots);
        println!("rescues started: {}", summary.rescues_started);
        for (outcome, count) in &summary.outcomes {
            println!("  {:<22} {}", outcome, count);
        }
        match (summary.victim_righted_at_ms, summary.victim_righted_by) {
            (Some(at), Some(by)) => println!("victim righted by {} at {} ms", by, at),
            _ => println!("victim still waiting for help"),
        }
        println!(
            "victim status:   {:?} ({:?})",
            robots[args.victim].state().status(),
            world.mode(args.victim)
        );
    }

    Ok(())
}
