//! In-memory scene document: the seam between the conversion engine and
//! whatever host SDK actually owns scene files.
//!
//! Nodes live in an arena and reference each other by dense index; meshes
//! carry layered per-corner attributes with the usual mapping/reference
//! indirection, which [`AttributeLayer::value_at`] hides from the pipelines.

use glam::{DMat4, DQuat, DVec2, DVec3, DVec4, EulerRot};
use log::warn;

use crate::axis::{self, AxisSystem, CANONICAL_UNIT};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneDocument {
    pub name: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub settings: SceneSettings,
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
    #[cfg_attr(feature = "json", serde(default))]
    pub materials: Vec<SceneMaterial>,
    #[cfg_attr(feature = "json", serde(default))]
    pub poses: Vec<BindPose>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneSettings {
    pub unit: String,
    pub axis: AxisSystem,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            unit: CANONICAL_UNIT.to_string(),
            axis: AxisSystem::CANONICAL,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneNode {
    pub name: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub parent: Option<usize>,
    #[cfg_attr(feature = "json", serde(default))]
    pub children: Vec<usize>,
    #[cfg_attr(feature = "json", serde(default = "default_true"))]
    pub visible: bool,
    #[cfg_attr(feature = "json", serde(default))]
    pub translation: DVec3,
    /// Euler degrees, applied X then Y then Z.
    #[cfg_attr(feature = "json", serde(default))]
    pub rotation: DVec3,
    #[cfg_attr(feature = "json", serde(default = "default_scale"))]
    pub scale: DVec3,
    #[cfg_attr(feature = "json", serde(default))]
    pub material: Option<usize>,
    #[cfg_attr(feature = "json", serde(default))]
    pub attribute: NodeAttribute,
}

#[cfg(feature = "json")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "json")]
fn default_scale() -> DVec3 {
    DVec3::ONE
}

impl SceneNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            visible: true,
            translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            material: None,
            attribute: NodeAttribute::None,
        }
    }

    pub fn mesh(&self) -> Option<&SceneMesh> {
        match &self.attribute {
            NodeAttribute::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_skeleton(&self) -> bool {
        matches!(self.attribute, NodeAttribute::Skeleton(_))
    }

    pub fn local_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(
            self.scale,
            quat_from_euler_degrees(self.rotation),
            self.translation,
        )
    }
}

pub(crate) fn quat_from_euler_degrees(degrees: DVec3) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

pub(crate) fn euler_degrees_from_quat(q: DQuat) -> DVec3 {
    let (z, y, x) = q.to_euler(EulerRot::ZYX);
    DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum NodeAttribute {
    #[default]
    None,
    Mesh(Box<SceneMesh>),
    Skeleton(SkeletonNodeKind),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum SkeletonNodeKind {
    Root,
    Limb,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneMesh {
    pub control_points: Vec<DVec3>,
    /// Corner -> control point, three corners per triangle.
    pub polygon_vertices: Vec<u32>,
    pub polygon_count: usize,
    #[cfg_attr(feature = "json", serde(default))]
    pub normals: Option<AttributeLayer<DVec3>>,
    #[cfg_attr(feature = "json", serde(default))]
    pub uv_layers: Vec<AttributeLayer<DVec2>>,
    #[cfg_attr(feature = "json", serde(default))]
    pub color_layers: Vec<AttributeLayer<DVec4>>,
    #[cfg_attr(feature = "json", serde(default))]
    pub tangents: Option<AttributeLayer<DVec3>>,
    #[cfg_attr(feature = "json", serde(default))]
    pub binormals: Option<AttributeLayer<DVec3>>,
    #[cfg_attr(feature = "json", serde(default))]
    pub skin: Option<SkinDeformer>,
    #[cfg_attr(feature = "json", serde(default))]
    pub blend_channels: Vec<BlendShapeChannel>,
}

impl SceneMesh {
    pub fn corner_count(&self) -> usize {
        self.polygon_vertices.len()
    }

    pub fn control_point_of_corner(&self, corner: usize) -> usize {
        self.polygon_vertices[corner] as usize
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum LayerMapping {
    ByControlPoint,
    ByCorner,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum LayerReference {
    Direct,
    IndexToDirect,
}

/// One attribute layer with the host-SDK addressing dance: a corner resolves
/// to a slot (by mapping mode), the slot resolves to a value (directly or
/// through the index array).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeLayer<T> {
    pub mapping: LayerMapping,
    pub reference: LayerReference,
    pub values: Vec<T>,
    #[cfg_attr(feature = "json", serde(default))]
    pub indices: Vec<u32>,
}

impl<T: Copy> AttributeLayer<T> {
    pub fn direct(mapping: LayerMapping, values: Vec<T>) -> Self {
        Self {
            mapping,
            reference: LayerReference::Direct,
            values,
            indices: Vec::new(),
        }
    }

    pub fn indexed(mapping: LayerMapping, values: Vec<T>, indices: Vec<u32>) -> Self {
        Self {
            mapping,
            reference: LayerReference::IndexToDirect,
            values,
            indices,
        }
    }

    pub fn value_at(&self, corner: usize, control_point: usize) -> Option<T> {
        let slot = match self.mapping {
            LayerMapping::ByControlPoint => control_point,
            LayerMapping::ByCorner => corner,
        };
        let index = match self.reference {
            LayerReference::Direct => slot,
            LayerReference::IndexToDirect => *self.indices.get(slot)? as usize,
        };
        self.values.get(index).copied()
    }
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SkinDeformer {
    pub clusters: Vec<SkinCluster>,
}

/// Per-bone record of influenced control points.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SkinCluster {
    pub name: String,
    pub bone_node: usize,
    pub control_points: Vec<u32>,
    pub weights: Vec<f64>,
    #[cfg_attr(feature = "json", serde(default = "identity_matrix"))]
    pub transform: DMat4,
    #[cfg_attr(feature = "json", serde(default = "identity_matrix"))]
    pub transform_link: DMat4,
}

#[cfg(feature = "json")]
fn identity_matrix() -> DMat4 {
    DMat4::IDENTITY
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendShapeChannel {
    pub name: String,
    /// 0..100, the host's current deform slider.
    #[cfg_attr(feature = "json", serde(default))]
    pub deform_percent: f64,
    pub targets: Vec<ShapeTarget>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeTarget {
    pub name: String,
    pub control_points: Vec<DVec3>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneMaterial {
    pub name: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub diffuse: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub normal: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub specular: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub opacity: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub emissive: String,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BindPose {
    pub name: String,
    pub entries: Vec<BindPoseEntry>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BindPoseEntry {
    pub node: usize,
    pub matrix: DMat4,
}

impl SceneDocument {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            settings: SceneSettings::default(),
            nodes: Vec::new(),
            roots: Vec::new(),
            materials: Vec::new(),
            poses: Vec::new(),
        }
    }

    pub fn add_root(&mut self, node: SceneNode) -> usize {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[id].parent = None;
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: usize, node: SceneNode) -> usize {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn node(&self, id: usize) -> &SceneNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut SceneNode {
        &mut self.nodes[id]
    }

    /// Node ids in depth-first order, children visited in declaration order.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    pub fn global_matrix(&self, id: usize) -> DMat4 {
        let mut matrix = self.nodes[id].local_matrix();
        let mut current = self.nodes[id].parent;
        while let Some(p) = current {
            matrix = self.nodes[p].local_matrix() * matrix;
            current = self.nodes[p].parent;
        }
        matrix
    }

    /// Re-orients root transforms into `target` and records the new frame.
    /// Handedness is metadata only; a mismatch is logged, never mirrored.
    pub fn convert_to_axis(&mut self, target: AxisSystem) {
        if self.settings.axis == target {
            return;
        }
        if self.settings.axis.handedness != target.handedness {
            warn!(
                "handedness change {} -> {} is recorded but not mirrored",
                self.settings.axis.handedness.code(),
                target.handedness.code()
            );
        }
        let rotation = self.settings.axis.rotation_to(target);
        let q = DQuat::from_mat4(&rotation);
        for i in 0..self.roots.len() {
            let node = &mut self.nodes[self.roots[i]];
            node.translation = rotation.transform_point3(node.translation);
            node.rotation =
                euler_degrees_from_quat(q * quat_from_euler_degrees(node.rotation));
        }
        self.settings.axis = target;
    }

    /// Scales root transforms so scene geometry evaluates in meters.
    pub fn convert_to_meters(&mut self) {
        let factor = match axis::unit_scale_to_meters(&self.settings.unit) {
            Some(f) => f,
            None => {
                warn!(
                    "unknown unit '{}', leaving scale untouched",
                    self.settings.unit
                );
                1.0
            }
        };
        if factor != 1.0 {
            for i in 0..self.roots.len() {
                let node = &mut self.nodes[self.roots[i]];
                node.translation *= factor;
                node.scale *= factor;
            }
        }
        self.settings.unit = CANONICAL_UNIT.to_string();
    }
}
