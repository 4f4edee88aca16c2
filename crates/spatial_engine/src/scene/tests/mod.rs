//! Scene graph behavior across spatial variants

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;

use crate::animation::{KeyFrame, KeyFrameAnimation};
use crate::core::config::ProjectionConfig;
use crate::foundation::math::{Vec3, Vec4};
use crate::intersection::ray::Ray;
use crate::render::backend::HeadlessBackend;
use crate::render::camera::{Camera, Projection};
use crate::render::material::Material;
use crate::scene::{AABBox, Mesh, Spatial};

fn unit_box(name: &str) -> Arc<Spatial> {
    Spatial::new_pick_volume(name, AABBox::from_extremes(-0.5, -0.5, -0.5, 0.5, 0.5, 0.5))
}

fn triangle(name: &str) -> Arc<Spatial> {
    Spatial::new_mesh(
        name,
        Mesh::with_arrays(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]),
    )
}

fn down_z(x: f32, y: f32) -> Ray {
    Ray::new(Vec3::new(x, y, 10.0), Vec3::new(0.0, 0.0, -1.0))
}

#[test]
fn test_model_bound_contains_every_vertex() {
    let vertices = [
        3.0, -1.0, 0.5, -2.0, 4.0, 1.5, 0.0, 0.0, -7.0, 1.25, 2.5, 3.75, -0.5, -3.0, 2.0,
    ];
    let mesh = Mesh::with_arrays(&vertices, &[0, 1, 2, 2, 3, 4]);
    mesh.update_model_bound();
    let bound = mesh.model_bound().unwrap();

    for vertex in vertices.chunks_exact(3) {
        assert!(bound.contains_point(Vec3::new(vertex[0], vertex[1], vertex[2])));
    }
    assert_eq!(bound.min, Vec3::new(-2.0, -3.0, -7.0));
    assert_eq!(bound.max, Vec3::new(3.0, 4.0, 3.75));
}

#[test]
fn test_node_bound_is_minimal_union_of_children() {
    let root = Spatial::new_node("root");
    let left = unit_box("left");
    let right = unit_box("right");
    left.set_local_translation(Vec3::new(-3.0, 0.0, 0.0));
    right.set_local_translation(Vec3::new(2.0, 1.0, -1.0));
    root.attach_child(&left);
    root.attach_child(&right);

    root.update_transform();
    root.update_world_bound(false);

    let expected = left.world_bound().unwrap().union(&right.world_bound().unwrap());
    assert_eq!(root.world_bound(), Some(expected));
    assert_eq!(expected.min, Vec3::new(-3.5, -0.5, -1.5));
    assert_eq!(expected.max, Vec3::new(2.5, 1.5, 0.5));
}

#[test]
fn test_ancestor_bounds_shrink_when_child_moves_inward() {
    let root = Spatial::new_node("root");
    let group = Spatial::new_node("group");
    let anchor = unit_box("anchor");
    let runner = unit_box("runner");
    root.attach_child(&group);
    group.attach_child(&anchor);
    group.attach_child(&runner);
    runner.set_local_translation(Vec3::new(10.0, 0.0, 0.0));
    root.update_geometric_state();
    assert_relative_eq!(root.world_bound().unwrap().max.x, 10.5);

    runner.set_local_translation(Vec3::new(1.0, 0.0, 0.0));
    runner.update_geometric_state();
    assert_relative_eq!(group.world_bound().unwrap().max.x, 1.5);
    assert_relative_eq!(root.world_bound().unwrap().max.x, 1.5);
}

#[test]
fn test_transform_chain_composes_translations() {
    let root = Spatial::new_node("root");
    let a = Spatial::new_node("a");
    let b = unit_box("b");
    root.attach_child(&a);
    a.attach_child(&b);
    a.set_local_translation(Vec3::new(1.0, 0.0, 0.0));
    b.set_local_translation(Vec3::new(0.0, 1.0, 0.0));

    root.update_transform();
    let origin = b.world_transform() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert_relative_eq!(origin.xyz(), Vec3::new(1.0, 1.0, 0.0));
    assert_relative_eq!(b.world_translation(), Vec3::new(1.0, 1.0, 0.0));
}

#[test]
fn test_rotation_and_scale_apply_after_translation() {
    let root = Spatial::new_node("root");
    let leaf = unit_box("leaf");
    root.attach_child(&leaf);
    leaf.set_local_translation(Vec3::new(5.0, 0.0, 0.0));
    leaf.set_local_rotation_degrees(90.0, Vec3::z());
    leaf.set_local_scale(Vec3::new(2.0, 1.0, 1.0));
    root.update_geometric_state();

    // Scaled along local x, then turned onto world y, then moved
    let bound = leaf.world_bound().unwrap();
    assert_relative_eq!(bound.min, Vec3::new(4.5, -1.0, -0.5), epsilon = 1e-5);
    assert_relative_eq!(bound.max, Vec3::new(5.5, 1.0, 0.5), epsilon = 1e-5);
}

#[test]
fn test_missed_subtree_is_never_visited() {
    let root = Spatial::new_node("root");
    let far = Spatial::new_node("far");
    let near = Spatial::new_node("near");
    root.attach_child(&far);
    root.attach_child(&near);
    far.set_local_translation(Vec3::new(100.0, 0.0, 0.0));
    for i in 0..3 {
        let piece = unit_box(&format!("far-{i}"));
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f32 * 2.0;
        piece.set_local_translation(Vec3::new(offset, 0.0, 0.0));
        far.attach_child(&piece);
    }
    let target = unit_box("target");
    near.attach_child(&target);
    root.update_geometric_state();

    let result = root.pick(&down_z(0.0, 0.0));
    // root, far (rejected), near, target
    assert_eq!(result.visited(), 4);
    assert_eq!(result.len(), 1);
    assert_eq!(result.closest_spatial().unwrap().name(), "target");
    assert_relative_eq!(result.closest().unwrap().distance, 9.5);
}

#[test]
fn test_closest_of_stacked_hits() {
    let root = Spatial::new_node("root");
    let low = unit_box("low");
    let high = unit_box("high");
    high.set_local_translation(Vec3::new(0.0, 0.0, 3.0));
    root.attach_child(&low);
    root.attach_child(&high);
    root.update_geometric_state();

    let result = root.pick(&down_z(0.0, 0.0));
    assert_eq!(result.len(), 2);
    assert_eq!(result.closest_spatial().unwrap().name(), "high");
    let names: Vec<_> = result.sorted().iter().map(|hit| hit.spatial.name().to_string()).collect();
    assert_eq!(names, ["high", "low"]);
}

#[test]
fn test_unpickable_spatials_are_skipped_but_drawn() {
    let root = Spatial::new_node("root");
    let floor = triangle("floor");
    let decor = Spatial::new_node("decor");
    let ornament = triangle("ornament");
    root.attach_child(&floor);
    root.attach_child(&decor);
    decor.attach_child(&ornament);
    floor.set_pickable(false);
    decor.set_pickable(false);
    root.update_geometric_state();

    let result = root.pick(&down_z(0.25, 0.25));
    assert!(!result.has_hits());
    // The unpickable node stops the walk before its child
    assert_eq!(result.visited(), 3);

    let mut backend = HeadlessBackend::new();
    root.draw(&mut backend);
    assert_eq!(backend.drawn_names(), ["floor", "ornament"]);
}

#[test]
fn test_attach_moves_child_between_parents() {
    let node_a = Spatial::new_node("a");
    let node_b = Spatial::new_node("b");
    let child = unit_box("child");

    assert!(node_a.attach_child(&child));
    assert!(node_b.attach_child(&child));

    assert!(!node_a.as_node().unwrap().contains(&child));
    assert_eq!(node_a.child_count(), 0);
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &node_b));
    assert_eq!(node_b.child_count(), 1);

    assert!(child.detach_from_parent());
    assert!(child.parent().is_none());
    assert!(!child.detach_from_parent());
}

#[test]
fn test_attach_refuses_cycles_and_leaves() {
    let root = Spatial::new_node("root");
    let middle = Spatial::new_node("middle");
    let leaf = unit_box("leaf");
    root.attach_child(&middle);
    middle.attach_child(&leaf);

    assert!(!middle.attach_child(&root));
    assert!(!root.attach_child(&root));
    assert!(!leaf.attach_child(&unit_box("orphan")));
    assert!(Arc::ptr_eq(&middle.parent().unwrap(), &root));
    assert!(leaf.has_ancestor(&root));
    assert!(Arc::ptr_eq(&leaf.root(), &root));
}

#[test]
fn test_detach_by_index_and_all() {
    let root = Spatial::new_node("root");
    let children: Vec<_> = (0..3).map(|i| unit_box(&format!("c{i}"))).collect();
    for child in &children {
        root.attach_child(child);
    }

    let removed = root.detach_child_at(1).unwrap();
    assert_eq!(removed.name(), "c1");
    assert!(removed.parent().is_none());
    assert!(root.detach_child_at(5).is_none());

    let rest = root.detach_all_children();
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().all(|child| child.parent().is_none()));
    assert_eq!(root.child_count(), 0);
}

#[test]
fn test_clone_mesh_shares_geometry_but_not_instance_state() {
    let original = triangle("pawn");
    original.set_local_translation(Vec3::new(1.0, 2.0, 3.0));
    original.set_material(Some(Material::new().with_shininess(8.0)));

    let clone = original.clone_mesh("pawn 2").unwrap();
    let (a, b) = (original.as_mesh().unwrap(), clone.as_mesh().unwrap());
    assert!(b.is_clone());
    assert!(a.shares_geometry_with(b));
    assert_eq!(clone.local_translation(), Some(Vec3::new(1.0, 2.0, 3.0)));
    assert_eq!(b.material(), a.material());

    clone.set_material(Some(Material::new().with_shininess(64.0)));
    assert_relative_eq!(a.material().unwrap().shininess, 8.0);

    // Geometry of a clone is read-only
    b.set_vertices(&[0.0; 9]);
    assert_eq!(a.geometry().vertices()[3], 1.0);

    assert!(Spatial::new_node("group").clone_mesh("nope").is_none());
    assert!(Spatial::new_mesh("empty", Mesh::new()).clone_mesh("nope").is_none());
}

#[test]
fn test_camera_anchor_moves_camera() {
    let camera = Arc::new(Camera::new(Projection::from_config(&ProjectionConfig::default()).shared()));
    let root = Spatial::new_node("root");
    let anchor = Spatial::new_camera_anchor("eye", Arc::clone(&camera));
    root.attach_child(&anchor);

    anchor.set_local_translation(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(anchor.local_translation(), Some(Vec3::new(1.0, 2.0, 3.0)));

    root.update_geometric_state();
    assert!(!anchor.is_pickable());
    assert!(anchor.world_bound().is_none());
    assert!(root.world_bound().is_none());
}

#[test]
fn test_pick_volume_makes_region_pickable() {
    let root = Spatial::new_node("root");
    let volume = Spatial::new_pick_volume("square", AABBox::from_extremes(-0.5, -0.5, 0.0, 0.5, 0.5, 0.1));
    volume.set_local_translation(Vec3::new(2.0, 2.0, 0.0));
    root.attach_child(&volume);
    root.update_geometric_state();

    assert!(root.pick(&down_z(2.2, 1.8)).has_hits());
    assert!(!root.pick(&down_z(0.0, 0.0)).has_hits());

    volume.as_pick_volume().unwrap().set_model_bound(AABBox::from_extremes(-3.0, -3.0, 0.0, 3.0, 3.0, 0.1));
    root.update_geometric_state();
    assert!(root.pick(&down_z(0.0, 0.0)).has_hits());
}

#[test]
fn test_equality_uses_name_and_payload() {
    let payload: crate::scene::SpatialData = Arc::new(7_u32);
    let a = unit_box("piece");
    let b = triangle("piece");
    assert_eq!(*a, *b);

    a.set_shared_data(Arc::clone(&payload));
    assert_ne!(*a, *b);
    b.set_shared_data(payload);
    assert_eq!(*a, *b);

    b.set_data(7_u32);
    assert_ne!(*a, *b);
    assert_eq!(b.data_as::<u32>().as_deref(), Some(&7));
    assert!(b.data_as::<String>().is_none());
    b.clear_data();
    assert!(!b.has_data());
}

#[test]
fn test_material_fans_out_to_meshes() {
    let root = Spatial::new_node("root");
    let group = Spatial::new_node("group");
    let first = triangle("first");
    let second = triangle("second");
    root.attach_child(&first);
    root.attach_child(&group);
    group.attach_child(&second);
    group.attach_child(&unit_box("volume"));

    let material = Material::new().with_diffuse([1.0, 0.0, 0.0, 1.0]);
    root.set_material(Some(material));
    assert_eq!(first.as_mesh().unwrap().material(), Some(material));
    assert_eq!(second.as_mesh().unwrap().material(), Some(material));
}

#[test]
fn test_listener_can_chain_a_new_animation() {
    let chained = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&chained);
    let piece = unit_box("piece");
    let first = KeyFrameAnimation::new()
        .with_frame(KeyFrame::new(Duration::from_millis(100)).with_translation(Vec3::new(1.0, 0.0, 0.0)))
        .with_listener(move |_: &KeyFrameAnimation, spatial: &Arc<Spatial>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let back = KeyFrameAnimation::new()
                .with_frame(KeyFrame::new(Duration::from_millis(100)).with_translation(Vec3::zeros()));
            spatial.add_controller(back);
        });
    piece.add_controller(first).unwrap();

    piece.update(Duration::from_millis(100));
    assert_eq!(chained.load(Ordering::SeqCst), 1);
    assert_eq!(piece.controller_count(), 1);
    assert_eq!(piece.local_translation(), Some(Vec3::new(1.0, 0.0, 0.0)));

    piece.update(Duration::from_millis(100));
    assert_eq!(piece.controller_count(), 0);
    assert_eq!(piece.local_translation(), Some(Vec3::zeros()));
}

#[test]
fn test_remove_controller_stops_animation_silently() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let piece = unit_box("piece");
    let id = piece
        .add_controller(
            KeyFrameAnimation::new()
                .with_frame(KeyFrame::new(Duration::from_millis(100)).with_translation(Vec3::x()))
                .with_listener(move |_: &KeyFrameAnimation, _: &Arc<Spatial>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();

    piece.update(Duration::from_millis(50));
    assert!(piece.remove_controller(id).is_some());
    piece.update(Duration::from_millis(100));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_relative_eq!(piece.local_translation().unwrap().x, 0.5);
}
