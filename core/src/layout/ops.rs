use serde::{Deserialize, Serialize};

use super::{tabset, LayoutError, LayoutNode};

/// One hop on the way from the root to a node: the ancestor's id and the index
/// of the child that leads further down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub id: String,
    pub index: usize,
}

/// Everything needed to put a removed tab back where it was.
///
/// Produced by [`remove_node`]. The entry is a value: it is never edited, only
/// replaced by a newer entry for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreEntry {
    /// The removed tab, exactly as it was.
    pub tab: LayoutNode,
    /// The tabset that held the tab.
    pub tabset_id: String,
    /// Position of the tab inside its tabset.
    pub index: usize,
    /// Ancestors of the tabset, root first.
    pub path: Vec<PathSegment>,
}

/// Structural edits accepted by [`update_by_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeUpdate {
    /// Make the child at the given index the active tab.
    Select(usize),
    /// Drop the node (and its subtree) from its parent.
    Detach,
}

pub fn find_by_id<'a>(tree: &'a LayoutNode, id: &str) -> Option<&'a LayoutNode> {
    if tree.id == id {
        return Some(tree);
    }
    tree.children.iter().find_map(|child| find_by_id(child, id))
}

/// Returns the ancestors of the node with `id`, root first. The root itself
/// yields an empty path.
pub fn find_path(tree: &LayoutNode, id: &str) -> Option<Vec<PathSegment>> {
    if tree.id == id {
        return Some(Vec::new());
    }
    tree.children.iter().enumerate().find_map(|(index, child)| {
        find_path(child, id).map(|mut rest| {
            rest.insert(0, PathSegment { id: tree.id.clone(), index });
            rest
        })
    })
}

pub fn update_by_id(tree: &LayoutNode, id: &str, update: NodeUpdate) -> Result<LayoutNode, LayoutError> {
    let mut next = tree.clone();
    match update {
        NodeUpdate::Select(index) => {
            let node = next
                .find_mut(id)
                .ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))?;
            if index >= node.children.len() {
                return Err(LayoutError::IndexOutOfRange { id: id.to_string(), index });
            }
            node.selected = Some(index);
        }
        NodeUpdate::Detach => {
            if next.id == id {
                return Err(LayoutError::CannotDetachRoot(id.to_string()));
            }
            detach(&mut next, id).ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))?;
        }
    }
    Ok(next)
}

fn detach(node: &mut LayoutNode, id: &str) -> Option<LayoutNode> {
    if let Some(pos) = node.children.iter().position(|child| child.id == id) {
        let removed = node.children.remove(pos);
        node.fix_selection_after_removal(pos);
        return Some(removed);
    }
    node.children.iter_mut().find_map(|child| detach(child, id))
}

/// Drops tabsets without tabs, then rows and columns left without children.
/// The root is always kept.
pub fn remove_empty_containers(tree: &LayoutNode) -> LayoutNode {
    let mut next = tree.clone();
    prune(&mut next);
    next
}

fn prune(node: &mut LayoutNode) {
    for child in &mut node.children {
        prune(child);
    }
    node.children.retain(|child| child.is_tab() || !child.children.is_empty());
}

/// Removes the tab `id` and describes how to reinsert it.
///
/// The returned tree and entry belong together: a caller that cannot keep the
/// entry must not adopt the tree either.
pub fn remove_node(tree: &LayoutNode, id: &str) -> Result<(LayoutNode, RestoreEntry), LayoutError> {
    let target = find_by_id(tree, id).ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))?;
    if !target.is_tab() {
        return Err(LayoutError::NotATab(id.to_string()));
    }

    let mut path = find_path(tree, id).ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))?;
    // The last hop is the tabset holding the tab.
    let slot = path.pop().ok_or_else(|| LayoutError::CannotDetachRoot(id.to_string()))?;

    let mut next = tree.clone();
    detach(&mut next, id).ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))?;

    let entry = RestoreEntry {
        tab: target.clone(),
        tabset_id: slot.id,
        index: slot.index,
        path,
    };
    Ok((next, entry))
}

/// Reinserts the tab described by `entry`.
///
/// If the original tabset still exists the tab goes back into it. If it was
/// pruned, the tabset is recreated under the closest ancestor that still
/// exists, first along the recorded path and then along the tabset's position in
/// `fallback`. Rows and columns pruned along with it are rebuilt from their
/// counterparts in `fallback`.
///
/// Siblings are ordered by `fallback` where it knows them: the node lands right
/// after its nearest preceding sibling there. Recorded indices are only used
/// for nodes `fallback` does not contain.
///
/// Returns `None` if the tab is already present or no place is found.
pub fn restore_node(tree: &LayoutNode, entry: &RestoreEntry, fallback: &LayoutNode) -> Option<LayoutNode> {
    if find_by_id(tree, &entry.tab.id).is_some() {
        return None;
    }

    let mut next = tree.clone();
    if let Some(holder) = next.find_mut(&entry.tabset_id) {
        if !holder.is_tabset() {
            return None;
        }
        let reference = find_by_id(fallback, &entry.tabset_id);
        let index = insertion_index(holder, &entry.tab.id, reference, entry.index);
        holder.children.insert(index, entry.tab.clone());
        holder.selected = Some(index);
        return Some(next);
    }

    let shell = tabset(entry.tabset_id.clone(), vec![entry.tab.clone()]);
    let fallback_path = find_path(fallback, &entry.tabset_id).unwrap_or_default();
    let anchor = [entry.path.as_slice(), fallback_path.as_slice()]
        .into_iter()
        .find_map(|path| {
            path.iter()
                .rposition(|segment| find_by_id(&next, &segment.id).is_some_and(LayoutNode::is_container))
                .map(|at| (path, at))
        });

    match anchor {
        Some((path, at)) => {
            let branch = rebuild_branch(&path[at + 1..], shell, &next, fallback);
            let reference = find_by_id(fallback, &path[at].id);
            let parent = next.find_mut(&path[at].id)?;
            let index = insertion_index(parent, &branch.id, reference, path[at].index);
            parent.children.insert(index, branch);
            Some(next)
        }
        None if next.is_container() => {
            next.children.push(shell);
            Some(next)
        }
        None => None,
    }
}

// Wraps `node` in empty copies of the containers named by `missing`, outermost
// first. Ids unknown to `fallback` or still present in `tree` are skipped.
fn rebuild_branch(missing: &[PathSegment], node: LayoutNode, tree: &LayoutNode, fallback: &LayoutNode) -> LayoutNode {
    missing.iter().rev().fold(node, |inner, segment| {
        match find_by_id(fallback, &segment.id) {
            Some(template) if template.is_container() && find_by_id(tree, &segment.id).is_none() => LayoutNode {
                id: template.id.clone(),
                kind: template.kind,
                name: template.name.clone(),
                component: None,
                selected: None,
                children: vec![inner],
            },
            _ => inner,
        }
    })
}

// Where `id` goes among `parent`'s children: right after the nearest sibling
// preceding it in `reference`, else right before the nearest following one.
fn insertion_index(parent: &LayoutNode, id: &str, reference: Option<&LayoutNode>, recorded: usize) -> usize {
    let clamped = recorded.min(parent.children.len());
    let Some(order) = reference.map(|node| &node.children) else {
        return clamped;
    };
    let Some(rank) = order.iter().position(|sibling| sibling.id == id) else {
        return clamped;
    };

    let live = |sibling: &LayoutNode| parent.children.iter().position(|child| child.id == sibling.id);
    if let Some(pos) = order[..rank].iter().rev().find_map(live) {
        return pos + 1;
    }
    order[rank + 1..].iter().find_map(live).unwrap_or(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{column, row, tab};

    fn sample() -> LayoutNode {
        row("root", vec![
            column("left", vec![
                tabset("left-main", vec![tab("t-a", "a", "A"), tab("t-b", "b", "B")]),
                tabset("left-bottom", vec![tab("t-c", "c", "C")]),
            ]),
            tabset("right", vec![tab("t-d", "d", "D")]),
        ])
    }

    #[test]
    fn test_find_path_lists_ancestors() {
        let path = find_path(&sample(), "t-c").unwrap();
        assert_eq!(path, vec![
            PathSegment { id: "root".into(), index: 0 },
            PathSegment { id: "left".into(), index: 1 },
            PathSegment { id: "left-bottom".into(), index: 0 },
        ]);
        assert_eq!(find_path(&sample(), "root").unwrap(), vec![]);
        assert!(find_path(&sample(), "nope").is_none());
    }

    #[test]
    fn test_update_select() {
        let tree = update_by_id(&sample(), "left-main", NodeUpdate::Select(1)).unwrap();
        assert_eq!(find_by_id(&tree, "left-main").unwrap().selected, Some(1));

        let err = update_by_id(&sample(), "left-main", NodeUpdate::Select(5)).unwrap_err();
        assert!(matches!(err, LayoutError::IndexOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_update_detach() {
        let tree = update_by_id(&sample(), "right", NodeUpdate::Detach).unwrap();
        assert!(find_by_id(&tree, "right").is_none());
        assert!(find_by_id(&tree, "t-d").is_none());

        let err = update_by_id(&sample(), "root", NodeUpdate::Detach).unwrap_err();
        assert!(matches!(err, LayoutError::CannotDetachRoot(_)));
    }

    #[test]
    fn test_remove_node_records_position() {
        let (tree, entry) = remove_node(&sample(), "t-b").unwrap();
        assert!(find_by_id(&tree, "t-b").is_none());
        assert_eq!(entry.tabset_id, "left-main");
        assert_eq!(entry.index, 1);
        assert_eq!(entry.tab.component.as_deref(), Some("b"));
        assert_eq!(entry.path.last().unwrap().id, "left");
    }

    #[test]
    fn test_remove_node_rejects_containers() {
        assert!(matches!(remove_node(&sample(), "left"), Err(LayoutError::NotATab(_))));
        assert!(matches!(remove_node(&sample(), "zzz"), Err(LayoutError::NodeNotFound(_))));
    }

    #[test]
    fn test_remove_keeps_selection_in_range() {
        let selected = update_by_id(&sample(), "left-main", NodeUpdate::Select(1)).unwrap();
        let (tree, _) = remove_node(&selected, "t-b").unwrap();
        assert_eq!(find_by_id(&tree, "left-main").unwrap().selected, Some(0));
    }

    #[test]
    fn test_remove_empty_containers_prunes_upwards() {
        let (tree, _) = remove_node(&sample(), "t-d").unwrap();
        assert!(find_by_id(&tree, "right").is_some());
        let cleaned = remove_empty_containers(&tree);
        assert!(find_by_id(&cleaned, "right").is_none());

        let only_column = row("root", vec![column("col", vec![tabset("ts", vec![])])]);
        let cleaned = remove_empty_containers(&only_column);
        assert_eq!(cleaned.id, "root");
        assert!(cleaned.children.is_empty());
    }

    #[test]
    fn test_restore_into_existing_tabset() {
        let original = sample();
        let (tree, entry) = remove_node(&original, "t-a").unwrap();
        let restored = restore_node(&tree, &entry, &original).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_restore_is_rejected_when_present() {
        let original = sample();
        let (_, entry) = remove_node(&original, "t-a").unwrap();
        assert!(restore_node(&original, &entry, &original).is_none());
    }

    #[test]
    fn test_restore_recreates_pruned_tabset() {
        let original = sample();
        let (tree, entry) = remove_node(&original, "t-c").unwrap();
        let tree = remove_empty_containers(&tree);
        assert!(find_by_id(&tree, "left-bottom").is_none());

        let restored = restore_node(&tree, &entry, &original).unwrap();
        let path = find_path(&restored, "t-c").unwrap();
        assert_eq!(path.last().unwrap().id, "left-bottom");
        assert_eq!(path[1], PathSegment { id: "left".into(), index: 1 });
    }

    #[test]
    fn test_restore_uses_fallback_shape() {
        let original = sample();
        let (_, entry) = remove_node(&original, "t-c").unwrap();
        // A tree where the recorded ancestors no longer exist except in the fallback.
        let current = row("root", vec![column("left", vec![]), tabset("right", vec![])]);
        let stripped = RestoreEntry { path: vec![], ..entry };

        let restored = restore_node(&current, &stripped, &original).unwrap();
        let path = find_path(&restored, "left-bottom").unwrap();
        assert_eq!(path.last().unwrap().id, "left");
    }

    #[test]
    fn test_restore_rebuilds_pruned_column() {
        let original = sample();
        let mut tree = original.clone();
        let mut entries = Vec::new();
        for id in ["t-a", "t-b", "t-c"] {
            let (next, entry) = remove_node(&tree, id).unwrap();
            tree = remove_empty_containers(&next);
            entries.push(entry);
        }
        assert!(find_by_id(&tree, "left").is_none());

        // Bottom tabset first, then the main one above it
        let tree = restore_node(&tree, &entries[2], &original).unwrap();
        let ids: Vec<_> = tree.children.iter().map(|child| child.id.as_str()).collect();
        assert_eq!(ids, ["left", "right"]);
        assert_eq!(find_by_id(&tree, "left").unwrap().kind, original.children[0].kind);

        let tree = restore_node(&tree, &entries[1], &original).unwrap();
        let tree = restore_node(&tree, &entries[0], &original).unwrap();
        let left = find_by_id(&tree, "left").unwrap();
        let ids: Vec<_> = left.children.iter().map(|child| child.id.as_str()).collect();
        assert_eq!(ids, ["left-main", "left-bottom"]);
        let tabs: Vec<_> = tree.tabs().into_iter().map(|tab| tab.id.as_str()).collect();
        assert_eq!(tabs, ["t-a", "t-b", "t-c", "t-d"]);
    }

    #[test]
    fn test_restore_orders_by_fallback_siblings() {
        let original = sample();
        let (tree, first) = remove_node(&original, "t-a").unwrap();
        let (tree, second) = remove_node(&tree, "t-b").unwrap();
        // Both were recorded at index 0
        assert_eq!((first.index, second.index), (0, 0));

        let tree = restore_node(&tree, &first, &original).unwrap();
        let tree = restore_node(&tree, &second, &original).unwrap();
        let ids: Vec<_> = find_by_id(&tree, "left-main").unwrap().children.iter().map(|tab| tab.id.as_str()).collect();
        assert_eq!(ids, ["t-a", "t-b"]);
    }
}
