//! Folder arena
//!
//! The server sends folders as nested trees (and repeats each folder at the
//! top level). The client flattens that into records keyed by id with a
//! derived children index, rebuilt from scratch on every load.

use chrono::NaiveDateTime;
use log::warn;
use std::collections::{HashMap, HashSet};

use crate::models::{Folder, FolderId, ROOT_DISPLAY_NAME};

/// Separator used when rendering folder paths
pub const PATH_SEPARATOR: &str = " / ";

/// A folder without its children
#[derive(Debug, Clone, PartialEq)]
pub struct FolderRecord {
    pub id: FolderId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<FolderId>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl FolderRecord {
    fn from_folder(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            description: folder.description.clone(),
            parent_id: folder.parent_id,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

/// Icon state of a folder row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderIcon {
    /// No children
    Leaf,
    Collapsed,
    Expanded,
}

impl FolderIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            FolderIcon::Leaf => "📄",
            FolderIcon::Collapsed => "📁",
            FolderIcon::Expanded => "📂",
        }
    }
}

/// One visible line of the folder sidebar
#[derive(Debug, Clone, PartialEq)]
pub struct FolderRow {
    pub id: FolderId,
    pub name: String,
    pub depth: usize,
    pub icon: FolderIcon,
}

/// Immutable snapshot of the folder hierarchy
#[derive(Debug, Clone, Default)]
pub struct FolderTree {
    records: HashMap<FolderId, FolderRecord>,
    children: HashMap<FolderId, Vec<FolderId>>,
    root: Option<FolderId>,
    /// Parentless folders other than the root, in server order
    orphans: Vec<FolderId>,
}

impl FolderTree {
    /// Build the arena from the server's folder list
    pub fn from_folders(folders: &[Folder]) -> Self {
        let mut records: HashMap<FolderId, FolderRecord> = HashMap::new();
        let mut order: Vec<FolderId> = Vec::new();
        let mut flagged_root: Option<FolderId> = None;

        // Depth-first walk; the first occurrence of an id wins
        let mut stack: Vec<&Folder> = folders.iter().rev().collect();
        while let Some(folder) = stack.pop() {
            if folder.is_root && flagged_root.is_none() {
                flagged_root = Some(folder.id);
            }
            if !records.contains_key(&folder.id) {
                records.insert(folder.id, FolderRecord::from_folder(folder));
                order.push(folder.id);
            }
            stack.extend(folder.children.iter().rev());
        }

        // A folder whose parent is unknown (or itself) sits at the top level
        let is_top_level = |record: &FolderRecord| match record.parent_id {
            None => true,
            Some(parent) => parent == record.id || !records.contains_key(&parent),
        };

        let mut children: HashMap<FolderId, Vec<FolderId>> = HashMap::new();
        let mut top_level: Vec<FolderId> = Vec::new();
        for id in &order {
            let record = &records[id];
            if is_top_level(record) {
                top_level.push(*id);
            } else if let Some(parent) = record.parent_id {
                children.entry(parent).or_default().push(*id);
            }
        }

        let root = flagged_root.filter(|id| records.contains_key(id)).or_else(|| {
            top_level
                .iter()
                .filter(|id| records[*id].parent_id.is_none())
                .min()
                .copied()
        });

        let mut tree = Self {
            records,
            children,
            root,
            orphans: Vec::new(),
        };

        // A flagged root that still names a parent is detached from it
        if let Some(root) = root {
            if let Some(parent) = tree.records[&root].parent_id {
                if let Some(siblings) = tree.children.get_mut(&parent) {
                    siblings.retain(|id| *id != root);
                }
            }
        }

        let mut orphans: Vec<FolderId> = top_level.into_iter().filter(|id| Some(*id) != root).collect();
        tree.break_cycles(&order, &mut orphans);
        if !orphans.is_empty() {
            warn!(
                "Folder tree has {} folder(s) outside the root: {:?}",
                orphans.len(),
                orphans
            );
        }
        tree.orphans = orphans;
        tree
    }

    /// Detach any folder unreachable from the top level (a parent cycle) so
    /// that every folder is reachable exactly once.
    fn break_cycles(&mut self, order: &[FolderId], orphans: &mut Vec<FolderId>) {
        let mut visited: HashSet<FolderId> = HashSet::new();
        let starts: Vec<FolderId> = self.root.iter().chain(orphans.iter()).copied().collect();
        for start in starts {
            self.mark_reachable(start, &mut visited);
        }
        for id in order {
            if visited.contains(id) {
                continue;
            }
            if let Some(parent) = self.records[id].parent_id {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|child| child != id);
                }
            }
            orphans.push(*id);
            self.mark_reachable(*id, &mut visited);
        }
    }

    fn mark_reachable(&self, start: FolderId, visited: &mut HashSet<FolderId>) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                stack.extend(self.children_of(id).iter().copied());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn root_id(&self) -> Option<FolderId> {
        self.root
    }

    pub fn root(&self) -> Option<&FolderRecord> {
        self.root.and_then(|id| self.records.get(&id))
    }

    pub fn is_root(&self, id: FolderId) -> bool {
        self.root == Some(id)
    }

    pub fn orphans(&self) -> &[FolderId] {
        &self.orphans
    }

    /// Root first, then orphans
    pub fn top_level(&self) -> impl Iterator<Item = FolderId> + '_ {
        self.root.into_iter().chain(self.orphans.iter().copied())
    }

    /// Direct record lookup by id
    pub fn get(&self, id: FolderId) -> Option<&FolderRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: FolderId) -> bool {
        self.records.contains_key(&id)
    }

    /// Depth-first search from the top level
    pub fn find_by_id(&self, id: FolderId) -> Option<&FolderRecord> {
        let mut stack: Vec<FolderId> = self.top_level().collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            if current == id {
                return self.records.get(&current);
            }
            stack.extend(self.children_of(current).iter().rev().copied());
        }
        None
    }

    pub fn children_of(&self, id: FolderId) -> &[FolderId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: FolderId) -> bool {
        self.children_of(id).is_empty()
    }

    /// Name to show for a folder; the root always shows as "Favorites"
    pub fn display_name(&self, id: FolderId) -> Option<&str> {
        if self.is_root(id) {
            return Some(ROOT_DISPLAY_NAME);
        }
        self.records.get(&id).map(|r| r.name.as_str())
    }

    /// Ids from the top-level ancestor down to `id` (inclusive)
    pub fn lineage(&self, id: FolderId) -> Vec<FolderId> {
        let mut lineage = Vec::new();
        let mut current = Some(id);
        while let Some(folder) = current {
            let Some(record) = self.records.get(&folder) else {
                break;
            };
            // Stop at anything the arena treats as top level
            if lineage.contains(&folder) || lineage.len() > self.records.len() {
                break;
            }
            lineage.push(folder);
            current = if self.is_root(folder) || self.orphans.contains(&folder) {
                None
            } else {
                record.parent_id
            };
        }
        lineage.reverse();
        lineage
    }

    /// Render `Favorites / Work / Clients`
    pub fn path_of(&self, id: FolderId) -> Option<String> {
        if !self.contains(id) {
            return None;
        }
        let names: Vec<&str> = self
            .lineage(id)
            .into_iter()
            .filter_map(|folder| self.display_name(folder))
            .collect();
        Some(names.join(PATH_SEPARATOR))
    }

    /// Whether `id` is `ancestor` or one of its descendants
    pub fn is_in_subtree(&self, ancestor: FolderId, id: FolderId) -> bool {
        self.contains(id) && self.lineage(id).contains(&ancestor)
    }

    /// `id` and every folder below it, depth-first
    pub fn descendants(&self, id: FolderId) -> Vec<FolderId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children_of(current).iter().rev().copied());
        }
        result
    }

    /// Flatten into display rows, descending only into expanded folders
    pub fn rows(&self, expanded: &HashSet<FolderId>) -> Vec<FolderRow> {
        fn collect(
            tree: &FolderTree,
            id: FolderId,
            depth: usize,
            expanded: &HashSet<FolderId>,
            rows: &mut Vec<FolderRow>,
        ) {
            let Some(name) = tree.display_name(id) else {
                return;
            };
            let is_open = expanded.contains(&id);
            let icon = if tree.is_leaf(id) {
                FolderIcon::Leaf
            } else if is_open {
                FolderIcon::Expanded
            } else {
                FolderIcon::Collapsed
            };
            rows.push(FolderRow {
                id,
                name: name.to_string(),
                depth,
                icon,
            });
            if icon == FolderIcon::Expanded {
                for child in tree.children_of(id) {
                    collect(tree, *child, depth + 1, expanded, rows);
                }
            }
        }

        let mut rows = Vec::new();
        for id in self.top_level() {
            collect(self, id, 0, expanded, &mut rows);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Favorites(1) -> [Work(2) -> [Clients(4) -> [Acme(5)]], Personal(3)]
    fn sample_folders() -> Vec<Folder> {
        let acme = Folder::new(5, "Acme", Some(FolderId(4)));
        let clients = Folder::new(4, "Clients", Some(FolderId(2))).with_children(vec![acme.clone()]);
        let work = Folder::new(2, "Work", Some(FolderId(1))).with_children(vec![clients.clone()]);
        let personal = Folder::new(3, "Personal", Some(FolderId(1)));
        let root = Folder::new(1, "Root", None).with_children(vec![work.clone(), personal.clone()]);
        // Server shape: every folder repeated at the top level
        vec![root, work, personal, clients, acme]
    }

    #[test]
    fn test_dedupes_server_listing() {
        let tree = FolderTree::from_folders(&sample_folders());
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root_id(), Some(FolderId(1)));
        assert!(tree.orphans().is_empty());
        assert_eq!(tree.children_of(FolderId(1)), &[FolderId(2), FolderId(3)]);
        assert_eq!(tree.children_of(FolderId(2)), &[FolderId(4)]);
    }

    #[test]
    fn test_find_by_id_at_every_depth() {
        let tree = FolderTree::from_folders(&sample_folders());
        for id in 1..=5 {
            assert_eq!(tree.find_by_id(FolderId(id)).map(|r| r.id), Some(FolderId(id)));
        }
        assert!(tree.find_by_id(FolderId(99)).is_none());
    }

    #[test]
    fn test_root_by_flag_not_name() {
        let folders = vec![
            Folder::new(1, "Inbox", None),
            Folder::new(7, "Everything", None).marked_root(),
        ];
        let tree = FolderTree::from_folders(&folders);
        assert_eq!(tree.root_id(), Some(FolderId(7)));
        assert_eq!(tree.orphans(), &[FolderId(1)]);
        assert_eq!(tree.display_name(FolderId(7)), Some(ROOT_DISPLAY_NAME));
    }

    #[test]
    fn test_root_falls_back_to_lowest_parentless_id() {
        let folders = vec![
            Folder::new(9, "Detached", None),
            Folder::new(2, "Root", None).with_children(vec![Folder::new(3, "Work", Some(FolderId(2)))]),
        ];
        let tree = FolderTree::from_folders(&folders);
        assert_eq!(tree.root_id(), Some(FolderId(2)));
        assert_eq!(tree.orphans(), &[FolderId(9)]);
        let top: Vec<FolderId> = tree.top_level().collect();
        assert_eq!(top, vec![FolderId(2), FolderId(9)]);
    }

    #[test]
    fn test_parent_cycle_is_broken() {
        let folders = vec![
            Folder::new(1, "Root", None),
            Folder::new(2, "A", Some(FolderId(3))),
            Folder::new(3, "B", Some(FolderId(2))),
        ];
        let tree = FolderTree::from_folders(&folders);
        assert_eq!(tree.len(), 3);
        // Every folder is reachable exactly once
        let reachable: usize = tree.top_level().map(|id| tree.descendants(id).len()).sum();
        assert_eq!(reachable, 3);
        assert!(tree.find_by_id(FolderId(2)).is_some());
        assert!(tree.find_by_id(FolderId(3)).is_some());
    }

    #[test]
    fn test_path_of() {
        let tree = FolderTree::from_folders(&sample_folders());
        assert_eq!(tree.path_of(FolderId(1)).unwrap(), "Favorites");
        assert_eq!(tree.path_of(FolderId(5)).unwrap(), "Favorites / Work / Clients / Acme");
        assert!(tree.path_of(FolderId(42)).is_none());
    }

    #[test]
    fn test_subtree_membership() {
        let tree = FolderTree::from_folders(&sample_folders());
        assert!(tree.is_in_subtree(FolderId(2), FolderId(5)));
        assert!(tree.is_in_subtree(FolderId(2), FolderId(2)));
        assert!(tree.is_in_subtree(FolderId(1), FolderId(3)));
        assert!(!tree.is_in_subtree(FolderId(3), FolderId(5)));
        assert!(!tree.is_in_subtree(FolderId(2), FolderId(42)));
        assert_eq!(
            tree.descendants(FolderId(2)),
            vec![FolderId(2), FolderId(4), FolderId(5)]
        );
    }

    #[test]
    fn test_rows_follow_expansion() {
        let tree = FolderTree::from_folders(&sample_folders());

        let rows = tree.rows(&HashSet::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Favorites");
        assert_eq!(rows[0].icon, FolderIcon::Collapsed);

        let expanded: HashSet<FolderId> = [FolderId(1), FolderId(2)].into_iter().collect();
        let rows = tree.rows(&expanded);
        let summary: Vec<(&str, usize, FolderIcon)> =
            rows.iter().map(|r| (r.name.as_str(), r.depth, r.icon)).collect();
        assert_eq!(
            summary,
            vec![
                ("Favorites", 0, FolderIcon::Expanded),
                ("Work", 1, FolderIcon::Expanded),
                ("Clients", 2, FolderIcon::Collapsed),
                ("Personal", 1, FolderIcon::Leaf),
            ]
        );
    }
}
