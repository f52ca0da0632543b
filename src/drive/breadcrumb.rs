//! Breadcrumb trails.
//!
//! Drive folders form a DAG. The trail follows the first listed parent of
//! each folder, which is only correct when every folder has one canonical
//! location. A folder added to a second parent will show the path through
//! its first parent.

use std::collections::HashSet;

use super::{Breadcrumb, DriveApi};

/// Walk parent links from `start_id` up to `root_id`.
///
/// Returns the trail root first with `start_id` last. The walk stops at the
/// root, at a folder with no parent, at a folder already visited, or when
/// metadata cannot be fetched. It never fails: whatever was collected so far
/// is returned, which may be empty.
pub async fn build_path(drive: &dyn DriveApi, start_id: &str, root_id: &str) -> Vec<Breadcrumb> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut cursor = start_id.to_string();

    loop {
        if !visited.insert(cursor.clone()) {
            tracing::warn!(folder_id = %cursor, "Parent cycle in breadcrumb walk");
            break;
        }

        let node = match drive.get_node(&cursor).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                tracing::debug!(folder_id = %cursor, "Breadcrumb folder not found");
                break;
            }
            Err(e) => {
                tracing::warn!(folder_id = %cursor, error = %e, "Breadcrumb lookup failed");
                break;
            }
        };

        path.push(Breadcrumb {
            id: node.id.clone(),
            name: node.name.clone(),
        });

        if cursor == root_id {
            break;
        }

        match node.parents.into_iter().next() {
            Some(parent) => cursor = parent,
            None => break,
        }
    }

    // Collected leaf first.
    path.reverse();
    path
}

/// Whether `path` starts at `root_id`, i.e. the folder lies inside the root.
pub fn starts_at_root(path: &[Breadcrumb], root_id: &str) -> bool {
    path.first().map(|c| c.id == root_id).unwrap_or(false)
}
