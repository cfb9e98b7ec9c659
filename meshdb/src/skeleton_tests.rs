use glam::{DMat4, DVec3};

use crate::skeleton::{assemble, flatten, BoneSeed};
use crate::Error;

fn seed(name: &str, parent: &str, x: f64) -> BoneSeed {
    BoneSeed {
        name: name.to_string(),
        parent_name: parent.to_string(),
        matrix: DMat4::from_translation(DVec3::new(x, 0.0, 0.0)),
    }
}

fn sorted_pairs(seeds: &[BoneSeed]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = seeds
        .iter()
        .map(|s| (s.name.clone(), s.parent_name.clone()))
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn assembles_and_flattens_round_trip() {
    let seeds = vec![
        seed("spine", "hips", 2.0),
        seed("hips", "", 1.0),
        seed("head", "neck", 4.0),
        seed("neck", "spine", 3.0),
        seed("leg_l", "hips", 5.0),
        seed("leg_r", "hips", 6.0),
    ];

    let skeleton = assemble(&seeds).expect("valid skeleton");
    let root = skeleton.root.expect("root assigned");
    assert_eq!(skeleton.bones[root].name, "hips");
    assert_eq!(skeleton.bones.len(), 6);

    let rows = flatten(&skeleton);
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].name, "hips");
    assert_eq!(sorted_pairs(&rows), sorted_pairs(&seeds));

    // Matrices survive untouched.
    for row in &rows {
        let original = seeds.iter().find(|s| s.name == row.name).expect("present");
        assert_eq!(row.matrix, original.matrix);
    }
}

#[test]
fn result_is_independent_of_row_order() {
    let forward = vec![
        seed("root", "", 0.0),
        seed("a", "root", 1.0),
        seed("b", "a", 2.0),
        seed("c", "a", 3.0),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let from_forward = flatten(&assemble(&forward).expect("forward assembles"));
    let from_reversed = flatten(&assemble(&reversed).expect("reversed assembles"));
    assert_eq!(sorted_pairs(&from_forward), sorted_pairs(&from_reversed));
}

#[test]
fn no_root_means_empty_skeleton() {
    let seeds = vec![seed("a", "ghost", 0.0)];
    let skeleton = assemble(&seeds).expect("empty skeleton is legal");
    assert!(skeleton.is_empty());
    assert!(flatten(&skeleton).is_empty());
}

#[test]
fn empty_input_means_empty_skeleton() {
    let skeleton = assemble(&[]).expect("empty input");
    assert!(skeleton.is_empty());
}

#[test]
fn unknown_parent_is_rejected() {
    let seeds = vec![
        seed("root", "", 0.0),
        seed("a", "root", 1.0),
        seed("stray", "missing", 2.0),
    ];
    match assemble(&seeds) {
        Err(Error::SkeletonOrphans { names }) => assert_eq!(names, vec!["stray".to_string()]),
        other => panic!("expected orphan error, got {other:?}"),
    }
}

#[test]
fn parent_cycle_is_rejected() {
    let seeds = vec![
        seed("root", "", 0.0),
        seed("a", "b", 1.0),
        seed("b", "a", 2.0),
    ];
    match assemble(&seeds) {
        Err(Error::SkeletonOrphans { mut names }) => {
            names.sort();
            assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected orphan error, got {other:?}"),
    }
}

#[test]
fn children_attach_by_name_not_by_position() {
    let seeds = vec![
        seed("toe", "foot", 3.0),
        seed("root", "", 0.0),
        seed("foot", "root", 2.0),
    ];
    let skeleton = assemble(&seeds).expect("assembles");
    let foot = skeleton.bone_by_name("foot").expect("foot exists");
    let toe = skeleton.bone_by_name("toe").expect("toe exists");
    assert_eq!(skeleton.bones[toe].parent, Some(foot));
    assert!(skeleton.bones[foot].children.contains(&toe));
}
