//! Property-based tests for the bookmark tree.
//!
//! These tests build random folder trees and verify that child counts always
//! match the stored rows and that renaming a folder rebases exactly its
//! subtree.

#[path = "../common/mod.rs"]
mod common;

use std::collections::HashMap;

use bookmarks::managers::bookmark_manager::BookmarkManagerTrait;
use bookmarks::store::BookmarkStore;
use bookmarks::types::bookmark::{is_within, BookmarkNode};
use common::{edit, fixture, folder, node, Fixture, OWNER};
use proptest::prelude::*;

/// One step of tree construction: `parent` indexes into the folders created so
/// far (index 0 is the root).
#[derive(Debug, Clone)]
enum Step {
    Folder { parent: usize },
    Node { parent: usize },
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            any::<usize>().prop_map(|parent| Step::Folder { parent }),
            any::<usize>().prop_map(|parent| Step::Node { parent }),
        ],
        1..25,
    )
}

/// Builds the tree and returns the full-paths of all folders, root first.
fn build(fx: &Fixture, steps: &[Step]) -> Vec<String> {
    let mut folders = vec!["/".to_string()];
    for (i, step) in steps.iter().enumerate() {
        match step {
            Step::Folder { parent } => {
                let path = folders[parent % folders.len()].clone();
                let created = fx
                    .manager
                    .create_bookmark(folder(&path, &format!("F{}", i)), OWNER)
                    .expect("create folder");
                folders.push(created.full_path());
            }
            Step::Node { parent } => {
                let path = folders[parent % folders.len()].clone();
                fx.manager
                    .create_bookmark(node(&path, &format!("N{}", i), "https://n.example"), OWNER)
                    .expect("create node");
            }
        }
    }
    folders
}

fn assert_child_counts(all: &[BookmarkNode]) {
    let mut rows_per_path: HashMap<&str, i64> = HashMap::new();
    for b in all {
        *rows_per_path.entry(b.path.as_str()).or_default() += 1;
    }
    for f in all.iter().filter(|b| b.is_folder()) {
        let expected = rows_per_path.get(f.full_path().as_str()).copied().unwrap_or(0);
        assert_eq!(f.child_count, expected, "child count of {}", f.full_path());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn child_counts_match_rows_after_creates(steps in arb_steps()) {
        let fx = fixture();
        build(&fx, &steps);
        assert_child_counts(&fx.repo.get_all(OWNER).unwrap());
    }

    #[test]
    fn rename_rebases_exactly_the_subtree(steps in arb_steps(), pick in any::<usize>()) {
        let fx = fixture();
        let folders = build(&fx, &steps);
        prop_assume!(folders.len() > 1);

        let old = &folders[1 + pick % (folders.len() - 1)];
        let target = fx.manager.get_folder_by_path(old, OWNER).unwrap().into_node();
        let before = fx.repo.get_all(OWNER).unwrap();

        let mut input = edit(&target);
        input.display_name = format!("{}-renamed", target.display_name);
        let renamed = fx.manager.update_bookmark(input, OWNER).unwrap();
        let new = renamed.full_path();

        let after: HashMap<String, BookmarkNode> = fx
            .repo
            .get_all(OWNER)
            .unwrap()
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();
        prop_assert_eq!(after.len(), before.len());

        for b in &before {
            let now = &after[&b.id];
            if is_within(&b.path, old) {
                prop_assert_eq!(&now.path, &format!("{}{}", new, &b.path[old.len()..]));
            } else {
                prop_assert_eq!(&now.path, &b.path);
            }
        }
        let all: Vec<BookmarkNode> = after.into_values().collect();
        assert_child_counts(&all);
    }

    #[test]
    fn deleting_leaves_keeps_counts_consistent(steps in arb_steps(), picks in prop::collection::vec(any::<usize>(), 1..6)) {
        let fx = fixture();
        build(&fx, &steps);

        for pick in picks {
            let all = fx.repo.get_all(OWNER).unwrap();
            let leaves: Vec<&BookmarkNode> = all
                .iter()
                .filter(|b| !b.is_folder() || b.child_count == 0)
                .collect();
            if leaves.is_empty() {
                break;
            }
            let victim = leaves[pick % leaves.len()];
            fx.manager.delete(&victim.id, OWNER).unwrap();
        }
        assert_child_counts(&fx.repo.get_all(OWNER).unwrap());
    }
}
