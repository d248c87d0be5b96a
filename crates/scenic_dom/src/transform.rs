//! World-transform math for the entity tree.
//!
//! Nodes author their transform as three components: `position` (meters),
//! `rotation` (Euler degrees, applied in XYZ order) and `scale`. The solver
//! composes TRS matrices up the parent chain and can invert the composition
//! to recover the local pose that reproduces a given world pose under a new
//! parent, which is what keeps reparented entities visually fixed.

use crate::id::NodeId;
use crate::implicit;
use crate::scene::Scene;
use crate::value::Value;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Rotation attributes are Euler degrees in XYZ application order.
pub fn euler_degrees_to_quat(degrees: [f32; 3]) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        degrees[0].to_radians(),
        degrees[1].to_radians(),
        degrees[2].to_radians(),
    )
}

pub fn quat_to_euler_degrees(rotation: Quat) -> [f32; 3] {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    [x.to_degrees(), y.to_degrees(), z.to_degrees()]
}

fn component_vec3(scene: &Scene, id: &NodeId, component: &str) -> Vec3 {
    let fallback = if component == "scale" { Vec3::ONE } else { Vec3::ZERO };
    implicit::resolved_value(scene, id, component, None)
        .and_then(|v| v.as_vec3())
        .map(Vec3::from_array)
        .unwrap_or(fallback)
}

/// The node's TRS matrix relative to its parent.
pub fn local_matrix(scene: &Scene, id: &NodeId) -> Mat4 {
    let translation = component_vec3(scene, id, "position");
    let rotation = euler_degrees_to_quat(component_vec3(scene, id, "rotation").to_array());
    let scale = component_vec3(scene, id, "scale");
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// The node's world matrix, composed root-down along the parent chain.
pub fn world_matrix(scene: &Scene, id: &NodeId) -> Mat4 {
    let mut chain = Vec::new();
    let mut cursor = Some(id.clone());
    while let Some(current) = cursor {
        chain.push(current.clone());
        cursor = scene.get(&current).and_then(|n| n.parent().cloned());
    }
    let mut world = Mat4::IDENTITY;
    for node in chain.iter().rev() {
        world *= local_matrix(scene, node);
    }
    world
}

/// The node's world-space position and orientation.
pub fn world_pose(scene: &Scene, id: &NodeId) -> (Vec3, Quat) {
    let (_, rotation, translation) = world_matrix(scene, id).to_scale_rotation_translation();
    (translation, rotation)
}

/// Solve the local pose that reproduces `world_position`/`world_rotation`
/// under a parent with the given world matrix:
/// local = parent_world⁻¹ · world.
pub fn solve_local(
    parent_world: Mat4,
    world_position: Vec3,
    world_rotation: Quat,
) -> (Vec3, Quat) {
    let world = Mat4::from_rotation_translation(world_rotation, world_position);
    let local = parent_world.inverse() * world;
    let (_, rotation, translation) = local.to_scale_rotation_translation();
    (translation, rotation)
}

/// Write a solved local pose back as typed components and declarative
/// attributes on the node.
pub fn apply_local_pose(scene: &mut Scene, id: &NodeId, position: Vec3, rotation: Quat) {
    scene.set_component(id, "position", Value::Vec3(position.to_array()));
    scene.set_component(id, "rotation", Value::Vec3(quat_to_euler_degrees(rotation)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDefinition;

    const EPS: f32 = 1e-4;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < EPS, "{:?} != {:?}", a, b);
    }

    fn child_of(scene: &mut Scene, parent: &NodeId) -> NodeId {
        scene
            .create_from_definition(&NodeDefinition::element("box"), parent, None)
            .unwrap()
    }

    #[test]
    fn test_world_position_composes_down_the_chain() {
        let mut scene = Scene::new();
        let root = scene.root().clone();
        let parent = child_of(&mut scene, &root);
        let child = child_of(&mut scene, &parent);
        scene.set_attribute(&parent, "position", "10 0 0");
        scene.set_attribute(&child, "position", "5 0 0");

        let (position, _) = world_pose(&scene, &child);
        assert_vec3_near(position, Vec3::new(15.0, 0.0, 0.0));
    }

    #[test]
    fn test_parent_rotation_moves_child() {
        let mut scene = Scene::new();
        let root = scene.root().clone();
        let parent = child_of(&mut scene, &root);
        let child = child_of(&mut scene, &parent);
        scene.set_attribute(&parent, "rotation", "0 90 0");
        scene.set_attribute(&child, "position", "1 0 0");

        // 90 degrees around Y sends +X to -Z.
        let (position, _) = world_pose(&scene, &child);
        assert_vec3_near(position, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_solve_local_round_trips_world_pose() {
        let mut scene = Scene::new();
        let root = scene.root().clone();
        let a = child_of(&mut scene, &root);
        let b = child_of(&mut scene, &root);
        let child = child_of(&mut scene, &a);
        scene.set_attribute(&a, "position", "3 0 0");
        scene.set_attribute(&b, "position", "0 2 0");
        scene.set_attribute(&b, "rotation", "0 0 45");
        scene.set_attribute(&child, "position", "1 1 1");

        let (world_position, world_rotation) = world_pose(&scene, &child);

        // Move the child under b, solving for the pose that keeps it still.
        let (local_position, local_rotation) =
            solve_local(world_matrix(&scene, &b), world_position, world_rotation);
        assert!(scene.remove_subtree(&child));
        let snapshot = crate::node::NodeDefinition::element("box").with_id(child.as_str());
        let child = scene.create_from_definition(&snapshot, &b, None).unwrap();
        apply_local_pose(&mut scene, &child, local_position, local_rotation);

        let (after, _) = world_pose(&scene, &child);
        assert_vec3_near(after, world_position);
    }

    #[test]
    fn test_euler_round_trip() {
        let q = euler_degrees_to_quat([30.0, 45.0, 60.0]);
        let back = euler_degrees_to_quat(quat_to_euler_degrees(q));
        assert!(q.angle_between(back) < EPS);
    }
}
