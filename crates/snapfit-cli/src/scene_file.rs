//! Scene description files: objects, pieces and a replay script.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use snapfit::{EventSink, MemoryScene, ObjectId, PieceConfig, SnapEngine};
use snapfit_geom::Mesh;
use snapfit_math::{quat_from_euler_yxz_degrees, Point3, Pose, Vec3};

/// A whole scene file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub objects: Vec<ObjectDef>,
    pub manipulators: Vec<ObjectDef>,
    pub pieces: Vec<PieceDef>,
    pub script: Vec<Step>,
}

/// One scene object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    #[serde(default)]
    pub position: [f64; 3],
    /// Euler degrees, applied Y, X, Z.
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    /// Name of an object declared earlier in the file.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub mesh: Option<MeshDef>,
}

fn unit_scale() -> [f64; 3] {
    [1.0; 3]
}

impl ObjectDef {
    fn pose(&self) -> Pose {
        pose_from(self.position, self.rotation).with_scale(Vec3::from(self.scale))
    }
}

/// Geometry of an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshDef {
    Cuboid { size: [f64; 3] },
    Wedge { size: [f64; 3] },
    Vertices { points: Vec<[f64; 3]> },
}

impl MeshDef {
    pub fn to_mesh(&self) -> Mesh {
        match self {
            MeshDef::Cuboid { size: [w, h, d] } => Mesh::cuboid(*w, *h, *d),
            MeshDef::Wedge { size: [w, h, d] } => Mesh::wedge(*w, *h, *d),
            MeshDef::Vertices { points } => {
                let points: Vec<Point3> =
                    points.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect();
                Mesh::from_points(&points)
            }
        }
    }
}

/// Snap settings attached to an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceDef {
    pub object: String,
    #[serde(flatten)]
    pub config: PieceConfig,
}

/// One replay script step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Grab {
        piece: String,
        manipulator: String,
    },
    Move {
        object: String,
        position: [f64; 3],
        #[serde(default)]
        rotation: [f64; 3],
    },
    Release {
        piece: String,
        manipulator: String,
    },
    Tick {
        #[serde(default = "one")]
        count: usize,
    },
    AttachMesh {
        object: String,
        mesh: MeshDef,
    },
}

fn one() -> usize {
    1
}

fn pose_from(position: [f64; 3], rotation: [f64; 3]) -> Pose {
    let [x, y, z] = position;
    let [rx, ry, rz] = rotation;
    Pose::new(Point3::new(x, y, z), quat_from_euler_yxz_degrees(rx, ry, rz))
}

impl SceneFile {
    /// Read a `.json` or `.toml` scene file.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_lowercase().as_str() {
            "json" => {
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
            }
            "toml" => toml::from_str(&text).with_context(|| format!("parsing {}", path.display())),
            _ => bail!("Unknown scene format: {}", ext),
        }
    }

    /// Build the scene graph. Parents must be declared before their children.
    pub fn build_scene(&self) -> Result<Loaded> {
        let mut loaded = Loaded::default();
        for def in self.objects.iter().chain(&self.manipulators) {
            if loaded.names.contains_key(&def.name) {
                bail!("duplicate object name '{}'", def.name);
            }
            let mesh = def.mesh.as_ref().map(MeshDef::to_mesh);
            if let Some(mesh) = &mesh {
                mesh.validate().with_context(|| format!("mesh of '{}'", def.name))?;
            }
            let id = match &def.parent {
                Some(parent) => {
                    let parent = loaded.id(parent)?;
                    loaded
                        .scene
                        .insert_child(parent, def.name.clone(), def.pose(), mesh)
                        .context("parent vanished")?
                }
                None => match mesh {
                    Some(mesh) => loaded.scene.insert_mesh(def.name.clone(), def.pose(), mesh),
                    None => loaded.scene.insert(def.name.clone(), def.pose()),
                },
            };
            loaded.names.insert(def.name.clone(), id);
        }
        Ok(loaded)
    }

    /// Register every piece, then every alternatives list.
    ///
    /// Ghosts are spawned at the primary goal of pieces that ask for one.
    /// Unknown alternate names are skipped with a warning.
    pub fn register<E: EventSink + ?Sized>(
        &self,
        loaded: &mut Loaded,
        engine: &mut SnapEngine,
        sink: &mut E,
    ) -> Result<()> {
        for def in &self.pieces {
            let id = loaded.id(&def.object)?;
            def.config
                .validate()
                .with_context(|| format!("piece '{}'", def.object))?;
            let ghost = match def.config.primary_goal() {
                Some(goal) if def.config.ghost => {
                    let ghost = loaded.scene.spawn_ghost(id, &goal);
                    if let Some(ghost) = ghost {
                        loaded.names.insert(format!("goal-{}", def.object), ghost);
                    }
                    ghost
                }
                _ => None,
            };
            let spec = def.config.to_spec(ghost)?;
            engine
                .register_piece(&mut loaded.scene, id, &spec, sink)
                .with_context(|| format!("registering '{}'", def.object))?;
        }

        for def in &self.pieces {
            let id = loaded.id(&def.object)?;
            let mut alternates = Vec::with_capacity(def.config.alternatives.len());
            for name in &def.config.alternatives {
                match loaded.names.get(name) {
                    Some(&alt) => alternates.push(alt),
                    None => tracing::warn!(
                        "alternate '{}' of '{}' not found, skipping",
                        name,
                        def.object
                    ),
                }
            }
            engine.register_alternates(id, &alternates)?;
        }
        Ok(())
    }
}

/// A built scene and its name table.
#[derive(Debug, Default)]
pub struct Loaded {
    pub scene: MemoryScene,
    pub names: HashMap<String, ObjectId>,
}

impl Loaded {
    /// Look up an object by name.
    pub fn id(&self, name: &str) -> Result<ObjectId> {
        self.names
            .get(name)
            .copied()
            .with_context(|| format!("no object named '{}'", name))
    }

    /// Name of an object, for printing.
    pub fn name(&self, id: ObjectId) -> &str {
        self.scene.node(id).map_or("?", |node| node.name.as_str())
    }

    /// Apply a move step's pose while keeping the object's scale.
    pub fn move_object(
        &mut self,
        name: &str,
        position: [f64; 3],
        rotation: [f64; 3],
    ) -> Result<()> {
        use snapfit::Scene;

        let id = self.id(name)?;
        let scale = self
            .scene
            .local_pose(id)
            .map_or(Vec3::new(1.0, 1.0, 1.0), |p| p.scale);
        self.scene.set_local_pose(id, pose_from(position, rotation).with_scale(scale));
        Ok(())
    }
}
