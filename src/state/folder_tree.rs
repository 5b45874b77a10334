//! Arena representation of the folder hierarchy and its expansion flags.

use crate::models::FolderNode;
use log::warn;
use std::collections::{HashMap, HashSet};

/// A folder in the arena. Relations are stored as ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub children: Vec<String>,
}

/// One line of the flattened, expansion-aware tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Flat id-to-node mapping plus the ordered root ids.
///
/// Rebuilt wholesale from each snapshot; parent ids are taken from the
/// nesting, never from the payload, so parent and child links always agree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderTree {
    nodes: HashMap<String, TreeNode>,
    roots: Vec<String>,
}

impl FolderTree {
    /// Builds the arena from a nested snapshot, keeping server order.
    ///
    /// A repeated id keeps its first occurrence; the later subtree is dropped.
    pub fn from_snapshot(snapshot: &[FolderNode]) -> Self {
        let mut tree = FolderTree::default();
        let mut roots = Vec::with_capacity(snapshot.len());
        for node in snapshot {
            if tree.insert_subtree(node, None) {
                roots.push(node.id.clone());
            }
        }
        tree.roots = roots;
        tree
    }

    fn insert_subtree(&mut self, node: &FolderNode, parent_id: Option<&str>) -> bool {
        if self.nodes.contains_key(&node.id) {
            warn!("Duplicate folder id {} in tree snapshot, skipping", node.id);
            return false;
        }
        if node.parent_id.as_deref() != parent_id {
            log::debug!(
                "Folder {} reports parent {:?} but is nested under {:?}",
                node.id,
                node.parent_id,
                parent_id
            );
        }

        self.nodes.insert(
            node.id.clone(),
            TreeNode {
                id: node.id.clone(),
                name: node.name.clone(),
                parent_id: parent_id.map(str::to_string),
                children: Vec::new(),
            },
        );

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if self.insert_subtree(child, Some(&node.id)) {
                children.push(child.id.clone());
            }
        }
        if let Some(inserted) = self.nodes.get_mut(&node.id) {
            inserted.children = children;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| !node.children.is_empty())
    }

    /// Root-to-node chain of `(id, name)`; empty for unknown ids.
    pub fn breadcrumb(&self, id: &str) -> Vec<(String, String)> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            chain.push((node.id.clone(), node.name.clone()));
            current = node.parent_id.as_deref().and_then(|p| self.nodes.get(p));
        }
        chain.reverse();
        chain
    }

    /// True if `id` is `ancestor_id` or lies somewhere beneath it.
    pub fn is_within(&self, id: &str, ancestor_id: &str) -> bool {
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            if node.id == ancestor_id {
                return true;
            }
            current = node.parent_id.as_deref().and_then(|p| self.nodes.get(p));
        }
        false
    }

    /// Rebuilds the nested form with parent ids consistent with the nesting.
    pub fn to_nested(&self) -> Vec<FolderNode> {
        self.roots.iter().filter_map(|id| self.nested(id)).collect()
    }

    fn nested(&self, id: &str) -> Option<FolderNode> {
        let node = self.nodes.get(id)?;
        Some(FolderNode {
            id: node.id.clone(),
            name: node.name.clone(),
            parent_id: node.parent_id.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.nested(child))
                .collect(),
        })
    }

    /// Depth-first rows, descending only into expanded folders.
    pub fn visible_rows(&self, expansion: &ExpansionState) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        for id in &self.roots {
            self.push_rows(id, 0, expansion, &mut rows);
        }
        rows
    }

    fn push_rows(&self, id: &str, depth: usize, expansion: &ExpansionState, rows: &mut Vec<TreeRow>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let expanded = expansion.is_expanded(id);
        rows.push(TreeRow {
            id: node.id.clone(),
            name: node.name.clone(),
            depth,
            has_children: !node.children.is_empty(),
            expanded,
        });
        if expanded {
            for child in &node.children {
                self.push_rows(child, depth + 1, expansion, rows);
            }
        }
    }
}

/// Ids of the folders currently expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<String>,
}

impl ExpansionState {
    /// Flips the flag for `id`. Expanding a folder without children does nothing.
    ///
    /// Returns the new expansion flag.
    pub fn toggle(&mut self, id: &str, tree: &FolderTree) -> bool {
        if self.expanded.remove(id) {
            return false;
        }
        if tree.has_children(id) {
            self.expanded.insert(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Drops ids that no longer exist in `tree`.
    pub fn retain_present(&mut self, tree: &FolderTree) {
        self.expanded.retain(|id| tree.contains(id));
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FolderNode> {
        vec![
            FolderNode::new("1", "A").with_children(vec![
                FolderNode::new("3", "C").with_children(vec![FolderNode::new("5", "E")]),
                FolderNode::new("4", "D"),
            ]),
            FolderNode::new("2", "B"),
        ]
    }

    /// Every node is listed by its parent iff its parent id names that parent.
    fn assert_links_consistent(tree: &FolderTree) {
        for id in tree.nodes.keys() {
            let node = tree.get(id).unwrap();
            match &node.parent_id {
                Some(parent) => assert!(tree.get(parent).unwrap().children.contains(id)),
                None => assert!(tree.roots().contains(id)),
            }
            for child in &node.children {
                assert_eq!(tree.get(child).unwrap().parent_id.as_deref(), Some(id.as_str()));
            }
        }
    }

    #[test]
    fn builds_consistent_arena_in_server_order() {
        let tree = FolderTree::from_snapshot(&sample());
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.roots(), ["1", "2"]);
        assert_eq!(tree.get("1").unwrap().children, ["3", "4"]);
        assert_links_consistent(&tree);
    }

    #[test]
    fn nesting_overrides_reported_parent() {
        let mut child = FolderNode::new("9", "Wrong");
        child.parent_id = Some("2".into());
        let tree = FolderTree::from_snapshot(&[FolderNode::new("1", "A").with_children(vec![child])]);
        assert_eq!(tree.get("9").unwrap().parent_id.as_deref(), Some("1"));
        assert_eq!(tree.to_nested()[0].children[0].parent_id.as_deref(), Some("1"));
        assert_links_consistent(&tree);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let snapshot = vec![
            FolderNode::new("1", "A").with_children(vec![FolderNode::new("2", "inner")]),
            FolderNode::new("2", "outer"),
        ];
        let tree = FolderTree::from_snapshot(&snapshot);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.roots(), ["1"]);
        assert_eq!(tree.get("2").unwrap().name, "inner");
        assert_links_consistent(&tree);
    }

    #[test]
    fn breadcrumb_and_ancestry() {
        let tree = FolderTree::from_snapshot(&sample());
        let names: Vec<_> = tree.breadcrumb("5").into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, ["A", "C", "E"]);
        assert!(tree.is_within("5", "1"));
        assert!(tree.is_within("1", "1"));
        assert!(!tree.is_within("2", "1"));
        assert!(tree.breadcrumb("missing").is_empty());
    }

    #[test]
    fn toggle_ignores_leaves_and_rows_follow_expansion() {
        let tree = FolderTree::from_snapshot(&sample());
        let mut expansion = ExpansionState::default();

        assert!(!expansion.toggle("2", &tree));
        assert!(expansion.is_empty());

        assert_eq!(tree.visible_rows(&expansion).len(), 2);
        assert!(expansion.toggle("1", &tree));
        let rows = tree.visible_rows(&expansion);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "4", "2"]);
        assert_eq!(rows[1].depth, 1);
        assert!(rows[1].has_children);

        assert!(!expansion.toggle("1", &tree));
        assert!(!expansion.is_expanded("1"));
    }

    #[test]
    fn expansion_survives_refresh_by_id() {
        let tree = FolderTree::from_snapshot(&sample());
        let mut expansion = ExpansionState::default();
        expansion.toggle("1", &tree);
        expansion.toggle("3", &tree);

        let refreshed = FolderTree::from_snapshot(&[
            FolderNode::new("1", "A").with_children(vec![FolderNode::new("4", "D")]),
        ]);
        expansion.retain_present(&refreshed);
        assert!(expansion.is_expanded("1"));
        assert!(!expansion.is_expanded("3"));
        assert_eq!(expansion.len(), 1);
    }
}
