//! Traversal Integration Tests
//!
//! Tests for:
//! - Visit order and post-traverse hooks
//! - Matrix and material stack balance
//! - World matrices pushed to the engine
//! - Material override and revert, nested materials
//! - Shared (DAG) drawables collected once

use glam::{DMat4, DVec3, Mat4, Vec3};
use lantern::engine::{Entity, HeadlessEngine, MaterialHandle, MemoryAssetReader, RenderEngine};
use lantern::scene::{
    BoundingBox, Drawable, Geometry, MaterialNode, Node, NodeArena, NodeKey, NodeVisitor,
    RenderVisitor, SceneGraph, Transform, traverse,
};

const TOLERANCE: f32 = 1e-5;

fn new_graph() -> SceneGraph<HeadlessEngine> {
    let _ = env_logger::builder().is_test(true).try_init();
    SceneGraph::new(HeadlessEngine::new(), MemoryAssetReader::new())
}

/// Geometry node over a fresh single-primitive renderable.
fn add_geometry(
    graph: &mut SceneGraph<HeadlessEngine>,
    name: &str,
    material: Option<MaterialHandle>,
) -> (NodeKey, Entity) {
    let engine = graph.engine_mut();
    let entity = engine.create_entity();
    engine
        .create_renderable(entity, &BoundingBox::default(), 1)
        .unwrap();
    let key = graph
        .make_geometry(name, entity, BoundingBox::default(), material)
        .unwrap();
    (key, entity)
}

fn translation(x: f64, y: f64, z: f64) -> Transform {
    Transform::custom(DMat4::from_translation(DVec3::new(x, y, z)))
}

fn material(graph: &mut SceneGraph<HeadlessEngine>) -> MaterialHandle {
    graph.engine_mut().create_material(b"package").unwrap()
}

fn effective_material(graph: &SceneGraph<HeadlessEngine>, key: NodeKey) -> Option<MaterialHandle> {
    graph
        .node(key)
        .unwrap()
        .as_materializable()
        .unwrap()
        .effective_material()
}

// ============================================================================
// Protocol
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    graph_names: Vec<(NodeKey, String)>,
}

impl Recorder {
    fn name(&self, key: NodeKey) -> String {
        self.graph_names
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, n)| n.clone())
            .unwrap_or_default()
    }
}

impl NodeVisitor for Recorder {
    fn visit_group(&mut self, key: NodeKey, _node: &Node) {
        self.events.push(format!("group {}", self.name(key)));
    }

    fn visit_transform(&mut self, key: NodeKey, _transform: &Transform) {
        self.events.push(format!("transform {}", self.name(key)));
    }

    fn visit_material(&mut self, key: NodeKey, _material: &MaterialNode) {
        self.events.push(format!("material {}", self.name(key)));
    }

    fn visit_drawable(&mut self, key: NodeKey, _drawable: &mut dyn Drawable) {
        self.events.push(format!("drawable {}", self.name(key)));
    }

    fn on_post_traverse(&mut self, key: NodeKey, _node: &Node) {
        self.events.push(format!("post {}", self.name(key)));
    }
}

#[test]
fn visit_order_is_depth_first_with_post_hooks() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let move_node = graph.make_transform("Move", translation(1.0, 0.0, 0.0));
    let paint = graph.make_material("Paint", None);
    let (cube, _) = add_geometry(&mut graph, "Cube", None);
    let (ball, _) = add_geometry(&mut graph, "Ball", None);
    graph.add_child(root, move_node).unwrap();
    graph.add_child(move_node, paint).unwrap();
    graph.add_child(paint, cube).unwrap();
    graph.add_child(root, ball).unwrap();

    let mut recorder = Recorder::default();
    for (key, node) in graph.arena().iter() {
        recorder.graph_names.push((key, node.name().to_string()));
    }
    graph.traverse(&mut recorder);

    assert_eq!(
        recorder.events,
        vec![
            "group Root",
            "transform Move",
            "material Paint",
            "drawable Cube",
            "post Paint",
            "post Move",
            "drawable Ball",
            "post Root",
        ]
    );
}

#[derive(Default)]
struct GroupWatcher {
    groups: Vec<(NodeKey, String, usize)>,
}

impl NodeVisitor for GroupWatcher {
    fn visit_group(&mut self, key: NodeKey, node: &Node) {
        self.groups.push((key, node.name().to_string(), node.children().len()));
    }
}

#[test]
fn group_visit_receives_the_group_node() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let inner = graph.make_group("Inner");
    let spin = graph.make_transform("Spin", translation(0.0, 1.0, 0.0));
    let (cube, _) = add_geometry(&mut graph, "Cube", None);
    graph.add_child(root, inner).unwrap();
    graph.add_child(root, spin).unwrap();
    graph.add_child(inner, cube).unwrap();

    let mut watcher = GroupWatcher::default();
    graph.traverse(&mut watcher);

    assert_eq!(
        watcher.groups,
        vec![(root, "Root".to_string(), 2), (inner, "Inner".to_string(), 1)]
    );
}

#[test]
fn stacks_are_balanced_after_traversal() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let outer = graph.make_transform("Outer", translation(0.0, 1.0, 0.0));
    let inner = graph.make_transform("Inner", translation(0.0, 0.0, 2.0));
    let paint = graph.make_material("Paint", None);
    let (cube, _) = add_geometry(&mut graph, "Cube", None);
    graph.add_child(root, outer).unwrap();
    graph.add_child(outer, inner).unwrap();
    graph.add_child(inner, paint).unwrap();
    graph.add_child(paint, cube).unwrap();

    let mut engine = HeadlessEngine::new();
    let mut visitor = RenderVisitor::new(&mut engine);
    graph.traverse(&mut visitor);

    assert_eq!(visitor.matrix_depth(), 0);
    assert_eq!(visitor.material_depth(), 0);
    assert_eq!(visitor.current_matrix(), DMat4::IDENTITY);
    assert_eq!(visitor.renderables().len(), 1);
}

// ============================================================================
// World matrices
// ============================================================================

#[test]
fn world_matrix_is_product_of_ancestors_and_internal() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let outer = graph.make_transform("Outer", translation(1.0, 0.0, 0.0));
    let inner = graph.make_transform(
        "Inner",
        Transform::custom(DMat4::from_scale(DVec3::splat(2.0))),
    );
    let (cube, entity) = add_geometry(&mut graph, "Cube", None);
    graph
        .set_internal_transform(cube, Some(translation(0.0, 3.0, 0.0)))
        .unwrap();
    graph.add_child(root, outer).unwrap();
    graph.add_child(outer, inner).unwrap();
    graph.add_child(inner, cube).unwrap();

    assert!(graph.render());

    let expected = Mat4::from_translation(Vec3::X)
        * Mat4::from_scale(Vec3::splat(2.0))
        * Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
    let pushed = graph.engine().transform_of(entity).unwrap();
    assert!(pushed.abs_diff_eq(expected, TOLERANCE));
    assert!(
        graph
            .node(cube)
            .unwrap()
            .as_drawable()
            .unwrap()
            .final_matrix()
            .abs_diff_eq(expected, TOLERANCE)
    );
    assert!(pushed.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(1.0, 6.0, 0.0), TOLERANCE));
}

#[test]
fn sibling_subtrees_do_not_leak_transforms() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let moved = graph.make_transform("Moved", translation(5.0, 0.0, 0.0));
    let (inside, inside_entity) = add_geometry(&mut graph, "Inside", None);
    let (outside, outside_entity) = add_geometry(&mut graph, "Outside", None);
    graph.add_child(root, moved).unwrap();
    graph.add_child(moved, inside).unwrap();
    graph.add_child(root, outside).unwrap();

    graph.render();

    let engine = graph.engine();
    assert!(
        engine
            .transform_of(inside_entity)
            .unwrap()
            .abs_diff_eq(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)), TOLERANCE)
    );
    assert_eq!(engine.transform_of(outside_entity), Some(Mat4::IDENTITY));
}

#[test]
fn positional_light_follows_its_transform() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let lift = graph.make_transform("Lift", translation(0.0, 10.0, 0.0));
    let bulb = graph
        .make_point_light("Bulb", Vec3::new(1.0, 0.0, 0.0), Vec3::ONE)
        .unwrap();
    graph.add_child(root, lift).unwrap();
    graph.add_child(lift, bulb).unwrap();

    graph.render();

    let entity = graph.node(bulb).unwrap().as_drawable().unwrap().entity();
    let light = graph.engine().lights[&entity];
    assert!(light.position.abs_diff_eq(Vec3::new(1.0, 10.0, 0.0), TOLERANCE));
    assert!(graph.engine().scene_entities(graph.scene()).contains(&entity));
}

// ============================================================================
// Materials
// ============================================================================

#[test]
fn material_override_applies_and_reverts() {
    let mut graph = new_graph();
    let own = material(&mut graph);
    let imposed = material(&mut graph);
    let root = graph.make_root(None, false);
    let paint = graph.make_material("Paint", Some(imposed));
    let (cube, entity) = add_geometry(&mut graph, "Cube", Some(own));
    graph.add_child(root, paint).unwrap();
    graph.add_child(paint, cube).unwrap();

    graph.render();
    assert_eq!(effective_material(&graph, cube), Some(imposed));
    assert_eq!(graph.engine().primitive_material(entity, 0), Some(imposed));

    graph.remove_child(paint, cube);
    graph.add_child(root, cube).unwrap();
    graph.render();
    assert_eq!(effective_material(&graph, cube), Some(own));
    assert_eq!(graph.engine().primitive_material(entity, 0), Some(own));
}

#[test]
fn inner_material_shadows_outer_only_in_its_subtree() {
    let mut graph = new_graph();
    let outer_handle = material(&mut graph);
    let inner_handle = material(&mut graph);
    let root = graph.make_root(None, false);
    let outer = graph.make_material("Outer", Some(outer_handle));
    let inner = graph.make_material("Inner", Some(inner_handle));
    let (deep, _) = add_geometry(&mut graph, "Deep", None);
    let (after, _) = add_geometry(&mut graph, "After", None);
    graph.add_child(root, outer).unwrap();
    graph.add_child(outer, inner).unwrap();
    graph.add_child(inner, deep).unwrap();
    graph.add_child(outer, after).unwrap();

    graph.render();
    assert_eq!(effective_material(&graph, deep), Some(inner_handle));
    assert_eq!(effective_material(&graph, after), Some(outer_handle));
}

#[test]
fn material_node_without_handle_does_not_override() {
    let mut graph = new_graph();
    let own = material(&mut graph);
    let root = graph.make_root(None, false);
    let empty = graph.make_material("Empty", None);
    let (cube, _) = add_geometry(&mut graph, "Cube", Some(own));
    graph.add_child(root, empty).unwrap();
    graph.add_child(empty, cube).unwrap();

    graph.render();
    assert_eq!(effective_material(&graph, cube), Some(own));
}

#[test]
fn multi_geometry_override_binds_root_and_parts_keep_their_own() {
    let mut graph = new_graph();
    let imposed = material(&mut graph);
    let part_material = material(&mut graph);
    let root = graph.make_root(None, false);
    let paint = graph.make_material("Paint", Some(imposed));
    let rig = graph.make_multi_geometry("Rig").unwrap();
    let first = graph.add_part(rig, None).unwrap();
    let second = graph
        .add_part(rig, Some(Mat4::from_translation(Vec3::Y)))
        .unwrap();
    let rig_entity = graph.node(rig).unwrap().as_drawable().unwrap().entity();
    let engine = graph.engine_mut();
    for (entity, primitives) in [(rig_entity, 2), (first, 1), (second, 1)] {
        engine
            .create_renderable(entity, &BoundingBox::default(), primitives)
            .unwrap();
    }
    graph
        .node_mut(rig)
        .unwrap()
        .as_materializable_mut()
        .unwrap()
        .set_material_at(1, Some(part_material));
    graph.add_child(root, paint).unwrap();
    graph.add_child(paint, rig).unwrap();

    graph.render();

    let engine = graph.engine();
    assert_eq!(engine.primitive_material(rig_entity, 0), Some(imposed));
    assert_eq!(engine.primitive_material(rig_entity, 1), Some(imposed));
    assert_eq!(engine.primitive_material(first, 0), None);
    assert_eq!(engine.primitive_material(second, 0), Some(part_material));
    assert_eq!(engine.scene_entities(graph.scene()), &[rig_entity, first, second]);
}

// ============================================================================
// DAG sharing
// ============================================================================

#[test]
fn shared_drawable_is_collected_once() {
    let mut graph = new_graph();
    let root = graph.make_root(None, false);
    let left = graph.make_transform("Left", translation(-1.0, 0.0, 0.0));
    let right = graph.make_transform("Right", translation(1.0, 0.0, 0.0));
    let (shared, entity) = add_geometry(&mut graph, "Shared", None);
    graph.add_child(root, left).unwrap();
    graph.add_child(root, right).unwrap();
    graph.add_child(left, shared).unwrap();
    graph.add_child(right, shared).unwrap();

    let mut engine = HeadlessEngine::new();
    let mut visitor = RenderVisitor::new(&mut engine);
    graph.traverse(&mut visitor);
    assert_eq!(visitor.renderables(), &[entity]);
}

#[test]
fn traverse_from_inner_start_node() {
    let mut engine = HeadlessEngine::new();
    let leaf_entity = engine.create_entity();
    let other_entity = engine.create_entity();

    let mut arena = NodeArena::new();
    let root = arena.insert(Node::group("Root")).unwrap();
    let branch = arena.insert(Node::group("Branch")).unwrap();
    let leaf = arena
        .insert(Node::geometry("Leaf", Geometry::new(leaf_entity, BoundingBox::default())))
        .unwrap();
    let other = arena
        .insert(Node::geometry("Other", Geometry::new(other_entity, BoundingBox::default())))
        .unwrap();
    arena.add_child(root, branch).unwrap();
    arena.add_child(branch, leaf).unwrap();
    arena.add_child(root, other).unwrap();

    let mut visitor = RenderVisitor::new(&mut engine);
    traverse(&mut arena, branch, &mut visitor);
    assert_eq!(visitor.renderables(), &[leaf_entity]);
}
