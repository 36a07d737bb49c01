//! Access to the host scene graph.
//!
//! The engine never owns objects. It reads and writes poses, walks vertex
//! streams and toggles ghost visibility through [`Scene`]. [`MemoryScene`]
//! is a self-contained implementation used by the CLI and the tests.

use slotmap::SlotMap;
use snapfit_geom::Mesh;
use snapfit_math::{Point3, Pose, Transform};

slotmap::new_key_type! {
    /// Handle of an object (piece, ghost or manipulator) in the host scene.
    pub struct ObjectId;
}

/// Scene-graph services the engine relies on.
pub trait Scene {
    /// Pose of `id` relative to its parent.
    fn local_pose(&self, id: ObjectId) -> Option<Pose>;

    /// Replace the pose of `id` relative to its parent.
    ///
    /// Returns `false` when the object is unknown.
    fn set_local_pose(&mut self, id: ObjectId, pose: Pose) -> bool;

    /// Accumulated transform from `id`'s local space to world space.
    fn world_transform(&self, id: ObjectId) -> Option<Transform>;

    /// Visit the world-space vertex positions of `id` and all its descendants.
    ///
    /// Objects whose geometry has not streamed in yet contribute nothing.
    fn visit_world_vertices(&self, id: ObjectId, visit: &mut dyn FnMut(&Point3));

    /// Show or hide `id`.
    fn set_visible(&mut self, id: ObjectId, visible: bool);
}

/// One object in a [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Display name.
    pub name: String,
    /// Parent object, `None` for scene roots.
    pub parent: Option<ObjectId>,
    /// Pose relative to the parent.
    pub pose: Pose,
    /// Geometry in local space, `None` until loaded.
    pub mesh: Option<Mesh>,
    /// Visibility flag.
    pub visible: bool,
}

/// In-memory scene graph keyed by [`ObjectId`].
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: SlotMap<ObjectId, SceneNode>,
}

impl MemoryScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root object without geometry.
    pub fn insert(&mut self, name: impl Into<String>, pose: Pose) -> ObjectId {
        self.insert_node(name.into(), None, pose, None)
    }

    /// Add a root object with geometry.
    pub fn insert_mesh(&mut self, name: impl Into<String>, pose: Pose, mesh: Mesh) -> ObjectId {
        self.insert_node(name.into(), None, pose, Some(mesh))
    }

    /// Add an object under `parent`.
    pub fn insert_child(
        &mut self,
        parent: ObjectId,
        name: impl Into<String>,
        pose: Pose,
        mesh: Option<Mesh>,
    ) -> Option<ObjectId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        Some(self.insert_node(name.into(), Some(parent), pose, mesh))
    }

    fn insert_node(
        &mut self,
        name: String,
        parent: Option<ObjectId>,
        pose: Pose,
        mesh: Option<Mesh>,
    ) -> ObjectId {
        self.nodes.insert(SceneNode {
            name,
            parent,
            pose,
            mesh,
            visible: true,
        })
    }

    /// Attach or replace geometry, e.g. once an asset finished loading.
    pub fn set_mesh(&mut self, id: ObjectId, mesh: Mesh) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.mesh = Some(mesh);
                true
            }
            None => false,
        }
    }

    /// Add a ghost of `piece` placed at `goal`.
    ///
    /// The ghost copies the piece's geometry and scale and is named
    /// `goal-<piece name>`.
    pub fn spawn_ghost(&mut self, piece: ObjectId, goal: &Pose) -> Option<ObjectId> {
        let node = self.nodes.get(piece)?;
        let name = format!("goal-{}", node.name);
        let pose = Pose {
            position: goal.position,
            orientation: goal.orientation,
            scale: node.pose.scale,
        };
        let mesh = node.mesh.clone();
        Some(self.insert_node(name, None, pose, mesh))
    }

    /// Remove an object. Children are re-parented to the scene root.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneNode> {
        let node = self.nodes.remove(id)?;
        for (_, child) in self.nodes.iter_mut() {
            if child.parent == Some(id) {
                child.parent = None;
            }
        }
        Some(node)
    }

    /// Look up an object.
    pub fn node(&self, id: ObjectId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Find the first object with the given name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Visibility of an object.
    pub fn is_visible(&self, id: ObjectId) -> Option<bool> {
        self.nodes.get(id).map(|node| node.visible)
    }

    /// Direct children of `id`.
    pub fn children(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.parent == Some(id))
            .map(|(child, _)| child)
    }

    /// All objects.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Scene for MemoryScene {
    fn local_pose(&self, id: ObjectId) -> Option<Pose> {
        self.nodes.get(id).map(|node| node.pose)
    }

    fn set_local_pose(&mut self, id: ObjectId, pose: Pose) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.pose = pose;
                true
            }
            None => false,
        }
    }

    fn world_transform(&self, id: ObjectId) -> Option<Transform> {
        let mut node = self.nodes.get(id)?;
        let mut world = node.pose.to_transform();
        // bounded walk so a parent cycle cannot hang the caller
        for _ in 0..self.nodes.len() {
            let Some(parent) = node.parent.and_then(|p| self.nodes.get(p)) else {
                return Some(world);
            };
            world = parent.pose.to_transform().then(&world);
            node = parent;
        }
        Some(world)
    }

    fn visit_world_vertices(&self, id: ObjectId, visit: &mut dyn FnMut(&Point3)) {
        let mut stack = vec![id];
        let mut visited = 0;
        while let Some(current) = stack.pop() {
            visited += 1;
            if visited > self.nodes.len() {
                break;
            }
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if let (Some(mesh), Some(world)) = (&node.mesh, self.world_transform(current)) {
                for p in mesh.points() {
                    visit(&world.apply_point(&p));
                }
            }
            stack.extend(self.children(current));
        }
    }

    fn set_visible(&mut self, id: ObjectId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.visible = visible;
        }
    }
}
