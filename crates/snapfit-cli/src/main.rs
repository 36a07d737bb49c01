//! snapfit CLI - replay snap-fit scenes
//!
//! Loads a scene file, registers its pieces, runs its grab/move/release
//! script through the goal engine and reports what snapped where.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use snapfit::{world_shape, EventSink, ObjectId, Scene, Slot, SnapEngine, SnapEvent, SnapState};
use snapfit_math::{Point3, Vec3};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod scene_file;

use scene_file::{Loaded, SceneFile, Step};

#[derive(Parser)]
#[command(name = "snapfit")]
#[command(about = "Replay and inspect snap-fit scenes", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene's script and print events and final piece states
    Replay {
        /// Scene file (.toml or .json)
        scene: PathBuf,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print shape samples and facing frames of every object
    Inspect {
        /// Scene file (.toml or .json)
        scene: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay { scene, json } => replay(&scene, json)?,
        Commands::Inspect { scene } => inspect(&scene)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

/// Collects events tagged with the script step that produced them.
#[derive(Default)]
struct Recorder {
    step: usize,
    events: Vec<(usize, SnapEvent)>,
}

impl EventSink for Recorder {
    fn emit(&mut self, event: SnapEvent) {
        self.events.push((self.step, event));
    }
}

#[derive(Serialize)]
struct Report {
    events: Vec<EventReport>,
    pieces: Vec<PieceReport>,
}

#[derive(Serialize)]
struct EventReport {
    /// 0 for registration, otherwise the 1-based script step.
    step: usize,
    event: &'static str,
    piece: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot: Option<String>,
}

#[derive(Serialize)]
struct PieceReport {
    name: String,
    snapped_onto: Option<String>,
    position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    orientation: [f64; 4],
}

fn replay(path: &Path, json: bool) -> Result<()> {
    let file = SceneFile::load(path)?;
    let mut loaded = file.build_scene()?;
    let mut engine = SnapEngine::new();
    let mut recorder = Recorder::default();
    file.register(&mut loaded, &mut engine, &mut recorder)?;

    for (i, step) in file.script.iter().enumerate() {
        recorder.step = i + 1;
        run_step(step, &mut loaded, &mut engine, &mut recorder)
            .with_context(|| format!("script step {}", i + 1))?;
    }

    let report = build_report(&loaded, &engine, &recorder);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("snapfit replay: {}", path.display());
    println!("  Objects: {}", loaded.scene.len());
    println!("  Pieces: {}", engine.registry().len());
    println!("  Steps: {}", file.script.len());

    if !report.events.is_empty() {
        println!("\nEvents:");
        for event in &report.events {
            let (step, name, piece) = (event.step, event.event, &event.piece);
            match &event.slot {
                Some(slot) => println!("  [{}] {} {} -> {}", step, name, piece, slot),
                None => println!("  [{}] {} {}", step, name, piece),
            }
        }
    }

    println!("\nPieces:");
    for piece in &report.pieces {
        let [x, y, z] = piece.position;
        let state = piece
            .snapped_onto
            .as_deref()
            .map_or_else(|| "free".to_string(), |slot| format!("snapped onto {}", slot));
        println!("  {}: {} at ({:.3}, {:.3}, {:.3})", piece.name, state, x, y, z);
    }

    Ok(())
}

fn run_step(
    step: &Step,
    loaded: &mut Loaded,
    engine: &mut SnapEngine,
    recorder: &mut Recorder,
) -> Result<()> {
    match step {
        Step::Grab { piece, manipulator } => {
            let (piece, manipulator) = (loaded.id(piece)?, loaded.id(manipulator)?);
            let goals = engine.grab_start(&mut loaded.scene, piece, manipulator)?;
            tracing::info!("{} grabbed with {} candidate goals", loaded.name(piece), goals);
        }
        Step::Move {
            object,
            position,
            rotation,
        } => {
            loaded.move_object(object, *position, *rotation)?;
        }
        Step::Release { piece, manipulator } => {
            let (piece, manipulator) = (loaded.id(piece)?, loaded.id(manipulator)?);
            if !engine.grab_end(piece, manipulator) {
                let (piece, manipulator) = (loaded.name(piece), loaded.name(manipulator));
                tracing::warn!("{} is not held by {}", piece, manipulator);
            }
        }
        Step::Tick { count } => {
            for _ in 0..*count {
                engine.tick(&mut loaded.scene, recorder);
            }
        }
        Step::AttachMesh { object, mesh } => {
            let id = loaded.id(object)?;
            let mesh = mesh.to_mesh();
            mesh.validate()?;
            loaded.scene.set_mesh(id, mesh);
        }
    }
    Ok(())
}

fn build_report(loaded: &Loaded, engine: &SnapEngine, recorder: &Recorder) -> Report {
    let name = |id: ObjectId| loaded.name(id).to_string();

    let events = recorder
        .events
        .iter()
        .map(|&(step, event)| EventReport {
            step,
            event: event.name(),
            piece: name(event.piece()),
            slot: match event {
                SnapEvent::Snapped { slot, .. } => Some(slot_name(loaded, slot)),
                SnapEvent::Freed { .. } => None,
            },
        })
        .collect();

    let pieces = engine
        .registry()
        .iter()
        .filter_map(|(id, _)| {
            let pose = loaded.scene.local_pose(id)?;
            let q = pose.orientation.coords;
            Some(PieceReport {
                name: name(id),
                snapped_onto: match engine.state(id) {
                    Some(SnapState::Snapped(slot)) => Some(slot_name(loaded, slot)),
                    _ => None,
                },
                position: [pose.position.x, pose.position.y, pose.position.z],
                orientation: [q.x, q.y, q.z, q.w],
            })
        })
        .collect();

    Report { events, pieces }
}

/// Owner name, with `#<goal>` appended for secondary goals.
fn slot_name(loaded: &Loaded, slot: Slot) -> String {
    let owner = loaded.name(slot.owner);
    if slot.is_primary() {
        owner.to_string()
    } else {
        format!("{}#{}", owner, slot.goal)
    }
}

fn inspect(path: &Path) -> Result<()> {
    let file = SceneFile::load(path)?;
    let mut loaded = file.build_scene()?;

    println!("snapfit scene: {}", path.display());
    println!("  Objects: {}", loaded.scene.len());

    let ids: Vec<ObjectId> = loaded.scene.iter().map(|(id, _)| id).collect();
    println!("\nShapes:");
    for id in ids {
        let name = loaded.name(id).to_string();
        match world_shape(&mut loaded.scene, id) {
            Ok(shape) => {
                let triangles = loaded
                    .scene
                    .node(id)
                    .and_then(|node| node.mesh.as_ref())
                    .map_or(0, |mesh| mesh.num_triangles());
                println!(
                    "  {}: {} vertices, {} triangles",
                    name, shape.sample.vertex_count, triangles
                );
                println!("    center:   {}", fmt_point(&shape.sample.center));
                println!("    centroid: {}", fmt_point(&shape.sample.centroid));
                println!("    forward:  {}", fmt_vec(&-shape.frame.column(2)));
                println!("    up:       {}", fmt_vec(&shape.frame.column(1)));
            }
            Err(e) => println!("  {}: {}", name, e),
        }
    }

    Ok(())
}

fn fmt_point(p: &Point3) -> String {
    format!("({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)
}

fn fmt_vec(v: &Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}
