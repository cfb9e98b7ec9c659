//! Skeleton assembly (flat rows -> bone tree) and flattening (the inverse).

use glam::DMat4;

use crate::model::{Bone, Skeleton};
use crate::Error;

/// One flat bone row: what the store persists and what assembly consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct BoneSeed {
    pub name: String,
    /// Empty string marks the root.
    pub parent_name: String,
    pub matrix: DMat4,
}

/// Builds the bone arena from flat rows.
///
/// The unique bone with an empty parent name becomes the root; every other
/// bone is attached to the bone whose name matches its parent name (O(n²)
/// scan, fine at model scale). No root means an empty skeleton, which is
/// legal. Bones left unreachable after assembly (unknown parent, cycle) are
/// a hard error rather than a silent drop.
pub fn assemble(seeds: &[BoneSeed]) -> Result<Skeleton, Error> {
    let mut skeleton = Skeleton::default();

    let Some(root) = seeds.iter().position(|s| s.parent_name.is_empty()) else {
        return Ok(skeleton);
    };

    skeleton.bones = seeds
        .iter()
        .map(|s| Bone {
            name: s.name.clone(),
            parent_name: s.parent_name.clone(),
            parent: None,
            children: Vec::new(),
            pose_matrix: s.matrix,
            node: None,
        })
        .collect();
    skeleton.root = Some(root);

    assign_children(&mut skeleton, root);

    let mut reachable = vec![false; skeleton.bones.len()];
    mark_reachable(&skeleton, root, &mut reachable);
    let orphans: Vec<String> = skeleton
        .bones
        .iter()
        .zip(&reachable)
        .filter(|&(_, &r)| !r)
        .map(|(b, _)| b.name.clone())
        .collect();
    if !orphans.is_empty() {
        return Err(Error::SkeletonOrphans { names: orphans });
    }

    Ok(skeleton)
}

fn assign_children(skeleton: &mut Skeleton, parent: usize) {
    let parent_name = skeleton.bones[parent].name.clone();
    for i in 0..skeleton.bones.len() {
        if i == parent || skeleton.root == Some(i) {
            continue;
        }
        if skeleton.bones[i].parent.is_none() && skeleton.bones[i].parent_name == parent_name {
            skeleton.bones[i].parent = Some(parent);
            skeleton.bones[parent].children.push(i);
            assign_children(skeleton, i);
        }
    }
}

fn mark_reachable(skeleton: &Skeleton, bone: usize, reachable: &mut [bool]) {
    reachable[bone] = true;
    for &child in &skeleton.bones[bone].children {
        mark_reachable(skeleton, child, reachable);
    }
}

/// Flattens a skeleton back to rows, root first, children in pre-order.
pub fn flatten(skeleton: &Skeleton) -> Vec<BoneSeed> {
    let mut rows = Vec::with_capacity(skeleton.bones.len());
    if let Some(root) = skeleton.root {
        flatten_into(skeleton, root, &mut rows);
    }
    rows
}

fn flatten_into(skeleton: &Skeleton, bone: usize, rows: &mut Vec<BoneSeed>) {
    let b = &skeleton.bones[bone];
    rows.push(BoneSeed {
        name: b.name.clone(),
        parent_name: b.parent_name.clone(),
        matrix: b.pose_matrix,
    });
    for &child in &b.children {
        flatten_into(skeleton, child, rows);
    }
}
