use std::collections::BTreeMap;

use glam::{DMat4, DVec2, DVec3, DVec4};

use crate::axis::AxisSystem;
use crate::weights::WeightSet;

/// Root aggregate for one conversion run.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub root_name: String,
    /// Unit string of the originating scene ('meter', 'inch', ...). Geometry
    /// in the model is always expressed in canonical meters; this records what
    /// the scene was authored in so an export can restore it.
    pub unit: String,
    pub axis: AxisSystem,
    pub application: String,
    pub version: String,
    /// Sub-model labels; `MeshGroup::model_name_id` indexes into this.
    pub model_names: Vec<String>,
    pub mesh_groups: Vec<MeshGroup>,
    pub materials: Vec<Material>,
    pub skeleton: Skeleton,
}

impl Model {
    /// Grows `mesh_groups` so `id` is a valid dense index, then returns it.
    pub fn mesh_group_mut(&mut self, id: usize) -> &mut MeshGroup {
        while self.mesh_groups.len() <= id {
            let next = self.mesh_groups.len();
            self.mesh_groups.push(MeshGroup::new(next));
        }
        &mut self.mesh_groups[id]
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshGroup {
    pub id: usize,
    pub name: String,
    pub material_id: usize,
    pub model_name_id: usize,
    /// Local bone index -> skeleton bone name, in first-encounter order.
    pub bone_palette: Vec<String>,
    pub parts: Vec<Part>,
}

impl MeshGroup {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn part_mut(&mut self, id: usize) -> &mut Part {
        while self.parts.len() <= id {
            let next = self.parts.len();
            self.parts.push(Part::new(next));
        }
        &mut self.parts[id]
    }

    /// Palette-local id for a bone name, appending on first encounter.
    pub fn palette_id(&mut self, bone_name: &str) -> usize {
        if let Some(i) = self.bone_palette.iter().position(|b| b == bone_name) {
            return i;
        }
        self.bone_palette.push(bone_name.to_string());
        self.bone_palette.len() - 1
    }
}

#[derive(Clone, Debug, Default)]
pub struct Part {
    pub id: usize,
    pub name: String,
    /// Deduplicated vertices; triangle corners index into this.
    pub vertices: Vec<Vertex>,
    /// Triangle-corner indices, length divisible by 3.
    pub indices: Vec<u32>,
    pub shapes: BTreeMap<String, ShapePart>,
    /// Which optional vertex channels this part carries.
    pub channels: VertexChannels,
}

impl Part {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Presence flags for the optional vertex attribute channels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct VertexChannels {
    pub uv3: bool,
    pub color2: bool,
    pub tangents: bool,
}

/// A named morph target: sparse vertex-index -> full replacement vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapePart {
    pub name: String,
    pub replacements: BTreeMap<usize, Vertex>,
}

/// Value type; welding depends on exact memberwise equality.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub color: DVec4,
    pub color2: Option<DVec4>,
    pub uv1: DVec2,
    pub uv2: DVec2,
    pub uv3: Option<DVec2>,
    pub tangent: Option<DVec3>,
    pub binormal: Option<DVec3>,
    pub weights: WeightSet,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            normal: DVec3::ZERO,
            color: DVec4::ONE,
            color2: None,
            uv1: DVec2::ZERO,
            uv2: DVec2::ZERO,
            uv3: None,
            tangent: None,
            binormal: None,
            weights: WeightSet::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Material {
    pub name: String,
    pub diffuse: String,
    pub normal: String,
    pub specular: String,
    pub opacity: String,
    pub emissive: String,
}

/// Bone arena; cross-references are dense indices, never pointers.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub root: Option<usize>,
}

impl Skeleton {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn bone_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Empty string marks the root.
    pub parent_name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Local affine pose (rotation + translation, unit scale expected).
    pub pose_matrix: DMat4,
    /// Scene node id, populated only during scene materialization.
    pub node: Option<usize>,
}
