//! Organisation chart assembly
//!
//! Turns the flat directory listing into a forest keyed by manager
//! relationships. Children are found with a full scan per node, so assembly
//! is quadratic in the number of users.

use std::collections::HashSet;

use crate::client::DirectoryApi;
use crate::models::{DirectoryUser, OrgNode};

/// Root-level org-chart nodes plus the number of users left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgForest {
    pub roots: Vec<OrgNode>,
    /// Users that appear nowhere in the forest (manager cycles, self-managed users)
    pub unreached: usize,
}

impl OrgForest {
    /// Total nodes in the forest, counting repeated ids once per occurrence
    pub fn placed(&self) -> usize {
        fn count(node: &OrgNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

/// Build the org forest from a flat user list.
///
/// A user is a root when it has no manager or its manager is not in the list.
/// Input order is preserved among roots and among siblings. Every entry scans
/// the whole list for reports, so a repeated id heads its own copy of the
/// subtree. An entry is never its own descendant.
pub fn build_forest(users: &[DirectoryUser]) -> OrgForest {
    let ids: HashSet<&str> = users.iter().map(|u| u.id.as_str()).collect();
    let mut reached = vec![false; users.len()];
    let mut path = Vec::new();

    let roots = users
        .iter()
        .enumerate()
        .filter(|(_, u)| match u.manager_id.as_deref() {
            None => true,
            Some(manager) => !ids.contains(manager),
        })
        .map(|(i, _)| build_node(i, users, &mut path, &mut reached))
        .collect();

    let unreached = reached.iter().filter(|r| !**r).count();
    if unreached > 0 {
        log::warn!(
            "{} of {} users could not be placed in the org chart",
            unreached,
            users.len()
        );
    }

    OrgForest { roots, unreached }
}

/// `path` holds the input indexes of the current node's ancestors
fn build_node(
    index: usize,
    users: &[DirectoryUser],
    path: &mut Vec<usize>,
    reached: &mut [bool],
) -> OrgNode {
    let user = &users[index];
    let mut node = OrgNode::from(user);
    reached[index] = true;
    path.push(index);

    let child_indexes: Vec<usize> = users
        .iter()
        .enumerate()
        .filter(|(i, u)| {
            u.manager_id.as_deref() == Some(user.id.as_str()) && !path.contains(i)
        })
        .map(|(i, _)| i)
        .collect();

    node.children = child_indexes
        .into_iter()
        .map(|i| build_node(i, users, path, reached))
        .collect();

    path.pop();
    node
}

/// Fetch photos for every node, one user at a time.
///
/// A failed fetch leaves that node without a photo and moves on.
pub async fn populate_photos(forest: &mut OrgForest, directory: &dyn DirectoryApi) {
    let mut stack: Vec<&mut OrgNode> = forest.roots.iter_mut().collect();
    let mut failures = 0usize;

    while let Some(node) = stack.pop() {
        match directory.get_user_photo(&node.id).await {
            Ok(photo) => node.photo_url = photo,
            Err(err) => {
                failures += 1;
                log::warn!("Could not load photo for user {}: {}", node.id, err);
            }
        }
        stack.extend(node.children.iter_mut());
    }

    if failures > 0 {
        log::warn!("{} photo fetches failed", failures);
    }
}
