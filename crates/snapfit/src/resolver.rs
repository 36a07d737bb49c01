//! Goal of a piece on an interchangeable piece's slot, derived from geometry.
//!
//! Both shapes are reduced to a facing frame (bounding-box center looking at
//! the vertex centroid). The piece is placed so that its frame coincides with
//! the alternate's frame once the alternate sits at its own authored goal.

use snapfit_geom::{ShapeAccumulator, ShapeSample};
use snapfit_math::{Point3, Pose, Transform};

use crate::error::{Result, SnapError};
use crate::scene::{ObjectId, Scene};

/// Sample the shape of `object` in its own local frame.
///
/// The object's local pose is reset to identity while vertices are visited
/// and restored afterwards, so the sample is independent of where the object
/// currently sits. Descendants keep their poses relative to the object.
pub fn sample_shape<S: Scene + ?Sized>(scene: &mut S, object: ObjectId) -> Result<ShapeSample> {
    let saved = scene.local_pose(object).ok_or(SnapError::UnknownObject(object))?;
    scene.set_local_pose(object, Pose::identity());

    let mut acc = ShapeAccumulator::new();
    scene.visit_world_vertices(object, &mut |p: &Point3| acc.add(p));

    scene.set_local_pose(object, saved);
    Ok(acc.finish())
}

/// Shape of an object in world space together with its facing frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldShape {
    /// Center and centroid in world space.
    pub sample: ShapeSample,
    /// World-space facing frame.
    pub frame: Transform,
    /// World transform of the object.
    pub world: Transform,
}

/// Sample `object`, map the sample into world space and build its facing frame.
///
/// The frame's reference up is the object's world Y axis.
pub fn world_shape<S: Scene + ?Sized>(scene: &mut S, object: ObjectId) -> Result<WorldShape> {
    let local = sample_shape(scene, object)?;
    if !local.is_available() {
        return Err(SnapError::GeometryUnavailable { object });
    }
    let world = scene
        .world_transform(object)
        .ok_or(SnapError::UnknownObject(object))?;
    let sample = local.transformed(&world);
    let frame = sample
        .facing_frame(&world.column(1))
        .map_err(|source| SnapError::DegenerateFrame { object, source })?;
    Ok(WorldShape {
        sample,
        frame,
        world,
    })
}

/// Goal of `piece` on the slot of `alternate`, given the alternate's authored goal.
///
/// Returns [`SnapError::GeometryUnavailable`] while either mesh has not
/// streamed in, [`SnapError::DegenerateFrame`] for shapes without a facing
/// direction and [`SnapError::SingularTransform`] for zero-scale objects.
/// No similarity check is made between the two shapes.
pub fn resolve_alternate_goal<S: Scene + ?Sized>(
    scene: &mut S,
    piece: ObjectId,
    alternate: ObjectId,
    alternate_goal: &Pose,
) -> Result<Pose> {
    // alternate first, then the piece
    let alt = world_shape(scene, alternate)?;
    let own = world_shape(scene, piece)?;

    let frame_inv = own
        .frame
        .inverse()
        .ok_or(SnapError::SingularTransform { object: piece })?;
    let shape_offset = frame_inv.then(&own.world);

    let alt_world_inv = alt
        .world
        .inverse()
        .ok_or(SnapError::SingularTransform { object: alternate })?;
    let offset = alt_world_inv.then(&alt.frame).then(&shape_offset);

    let alt_scale = scene
        .local_pose(alternate)
        .ok_or(SnapError::UnknownObject(alternate))?
        .scale;
    let goal =
        Transform::compose(&alternate_goal.position, &alternate_goal.orientation, &alt_scale);
    Ok(Pose::from_transform(&goal.then(&offset)))
}
