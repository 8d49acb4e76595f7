use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::folder::{FolderInfo, FolderKind};

/// Fetches issued per lazy expand: child mail folders and child contact folders.
pub const FETCHES_PER_EXPAND: u8 = 2;

/// The dummy child that gives an unloaded node its expand affordance.
///
/// `consume` succeeds for exactly one caller, however many fetch completions race for it.
#[derive(Debug)]
pub struct Placeholder(AtomicBool);

impl Placeholder {
    pub fn present() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn absent() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn is_present(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Remove the placeholder. Returns `true` only for the call that removed it.
    pub fn consume(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Handle to a node. Handles from before a `clear` resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    generation: u64,
    index: usize,
}

#[derive(Debug)]
pub struct TreeNode {
    pub label: String,
    pub info: FolderInfo,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Shown open in the view. Independent of `info.expanded`, which tracks loading.
    pub open: bool,
    placeholder: Placeholder,
    pending_fetches: u8,
}

impl TreeNode {
    pub fn has_placeholder(&self) -> bool {
        self.placeholder.is_present()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    /// Whether the view should draw an expand glyph.
    pub fn is_expandable(&self) -> bool {
        self.has_placeholder() || !self.children.is_empty()
    }
}

/// A node about to be inserted.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub label: String,
    pub info: FolderInfo,
    pub placeholder: bool,
}

impl NewNode {
    /// A node whose children are loaded on first expand.
    pub fn lazy(label: impl Into<String>, info: FolderInfo) -> Self {
        Self {
            label: label.into(),
            info,
            placeholder: true,
        }
    }

    pub fn leaf(label: impl Into<String>, info: FolderInfo) -> Self {
        Self {
            label: label.into(),
            info,
            placeholder: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub added: usize,
    /// This batch was the one that took the placeholder out.
    pub placeholder_removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Leaf,
    Closed,
    Open,
}

/// One visible line of the tree, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub id: NodeId,
    pub depth: usize,
    pub label: String,
    pub kind: FolderKind,
    pub glyph: Glyph,
    /// The row draws the placeholder child of `id`, not `id` itself.
    pub is_placeholder: bool,
}

/// Folder hierarchy for the current session.
#[derive(Debug, Default)]
pub struct FolderTree {
    generation: u64,
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Drop every node. Outstanding handles stop resolving.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.generation += 1;
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        if id.generation != self.generation {
            return None;
        }
        self.nodes.get(id.index)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        if id.generation != self.generation {
            return None;
        }
        self.nodes.get_mut(id.index)
    }

    fn alloc(&mut self, parent: Option<NodeId>, new: NewNode) -> NodeId {
        let id = NodeId {
            generation: self.generation,
            index: self.nodes.len(),
        };
        self.nodes.push(TreeNode {
            label: new.label,
            info: new.info,
            parent,
            children: Vec::new(),
            open: false,
            placeholder: if new.placeholder {
                Placeholder::present()
            } else {
                Placeholder::absent()
            },
            pending_fetches: 0,
        });
        id
    }

    pub fn push_root(&mut self, new: NewNode) -> NodeId {
        let id = self.alloc(None, new);
        self.roots.push(id);
        id
    }

    pub fn insert_root_first(&mut self, new: NewNode) -> NodeId {
        let id = self.alloc(None, new);
        self.roots.insert(0, id);
        id
    }

    /// Append a batch of children under `parent`.
    ///
    /// A non-empty batch consumes the parent's placeholder if it is still there.
    /// `None` when `parent` no longer exists.
    pub fn append_children(&mut self, parent: NodeId, batch: Vec<NewNode>) -> Option<Appended> {
        self.get(parent)?;
        let added = batch.len();
        let ids: Vec<NodeId> = batch
            .into_iter()
            .map(|n| self.alloc(Some(parent), n))
            .collect();

        let node = self.get_mut(parent)?;
        node.children.extend(ids);
        let placeholder_removed = added > 0 && node.placeholder.consume();
        Some(Appended {
            added,
            placeholder_removed,
        })
    }

    /// Mark a lazy node as expanded and return the folder id whose children must be fetched.
    ///
    /// `None` if the node is not lazily loaded or was expanded before.
    pub fn begin_load(&mut self, id: NodeId) -> Option<String> {
        let node = self.get_mut(id)?;
        if !node.info.kind.loads_lazily() || node.info.expanded {
            return None;
        }
        node.info.expanded = true;
        node.pending_fetches = FETCHES_PER_EXPAND;
        node.open = true;
        Some(node.info.id.clone())
    }

    /// One child fetch for `id` finished (successfully or not).
    ///
    /// After the last one the placeholder is consumed if nothing else did.
    /// Returns whether this call removed it; `None` when the node is gone.
    pub fn finish_fetch(&mut self, id: NodeId) -> Option<bool> {
        let node = self.get_mut(id)?;
        node.pending_fetches = node.pending_fetches.saturating_sub(1);
        if node.pending_fetches == 0 {
            Some(node.placeholder.consume())
        } else {
            Some(false)
        }
    }

    pub fn set_open(&mut self, id: NodeId, open: bool) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.open = open;
                true
            }
            None => false,
        }
    }

    /// Visible rows: roots and the descendants of open nodes, depth first.
    pub fn flatten(&self) -> Vec<FlatRow> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.flatten_node(root, 0, &mut rows);
        }
        rows
    }

    fn flatten_node(&self, id: NodeId, depth: usize, rows: &mut Vec<FlatRow>) {
        let Some(node) = self.get(id) else {
            return;
        };
        let glyph = if !node.is_expandable() {
            Glyph::Leaf
        } else if node.open {
            Glyph::Open
        } else {
            Glyph::Closed
        };
        rows.push(FlatRow {
            id,
            depth,
            label: node.label.clone(),
            kind: node.info.kind,
            glyph,
            is_placeholder: false,
        });

        if !node.open {
            return;
        }
        if node.has_placeholder() {
            rows.push(FlatRow {
                id,
                depth: depth + 1,
                label: String::new(),
                kind: node.info.kind,
                glyph: Glyph::Leaf,
                is_placeholder: true,
            });
        }
        for &child in &node.children {
            self.flatten_node(child, depth + 1, rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_tree() -> (FolderTree, NodeId) {
        let mut tree = FolderTree::new();
        let root = tree.push_root(NewNode::lazy(
            "MsgFolderRoot",
            FolderInfo::new("ROOT", FolderKind::MsgFolderRoot),
        ));
        (tree, root)
    }

    fn mail(name: &str) -> NewNode {
        NewNode::leaf(name, FolderInfo::new(name, FolderKind::Message))
    }

    #[test]
    fn placeholder_consumes_once() {
        let p = Placeholder::present();
        assert!(p.consume());
        assert!(!p.consume());
        assert!(!Placeholder::absent().consume());
    }

    #[test]
    fn begin_load_only_once() {
        let (mut tree, root) = root_tree();
        assert_eq!(tree.begin_load(root).as_deref(), Some("ROOT"));
        assert!(tree.get(root).unwrap().info.expanded);
        assert!(tree.get(root).unwrap().is_loading());
        assert_eq!(tree.begin_load(root), None);
    }

    #[test]
    fn calendars_are_never_lazy() {
        let mut tree = FolderTree::new();
        let cal_root = tree.push_root(NewNode::leaf(
            "Calendar Folders (Dummy Folder)",
            FolderInfo::dummy_calendar_root(),
        ));
        let cal = tree
            .append_children(
                cal_root,
                vec![NewNode::leaf("Calendar", FolderInfo::new("C1", FolderKind::Calendar))],
            )
            .unwrap();
        assert_eq!(cal.added, 1);
        let cal_id = tree.get(cal_root).unwrap().children[0];
        assert_eq!(tree.begin_load(cal_root), None);
        assert_eq!(tree.begin_load(cal_id), None);
    }

    #[test]
    fn first_non_empty_batch_takes_the_placeholder() {
        let (mut tree, root) = root_tree();
        tree.begin_load(root);

        let first = tree.append_children(root, vec![mail("Inbox"), mail("Sent")]).unwrap();
        let second = tree.append_children(root, vec![mail("Contacts")]).unwrap();
        assert!(first.placeholder_removed);
        assert!(!second.placeholder_removed);

        assert_eq!(tree.finish_fetch(root), Some(false));
        assert_eq!(tree.finish_fetch(root), Some(false));

        let node = tree.get(root).unwrap();
        assert!(!node.has_placeholder());
        assert_eq!(node.children.len(), 3);
        assert!(!node.is_loading());
    }

    #[test]
    fn empty_results_leave_no_children_and_no_placeholder() {
        let (mut tree, root) = root_tree();
        tree.begin_load(root);

        let a = tree.append_children(root, vec![]).unwrap();
        assert!(!a.placeholder_removed);
        assert_eq!(tree.finish_fetch(root), Some(false));
        assert!(tree.get(root).unwrap().has_placeholder());
        assert_eq!(tree.finish_fetch(root), Some(true));

        let node = tree.get(root).unwrap();
        assert!(node.info.expanded);
        assert!(!node.has_placeholder());
        assert!(node.children.is_empty());
        assert!(!node.is_expandable());
    }

    #[test]
    fn unstarted_fetch_settled_up_front_lets_an_empty_batch_finish() {
        let (mut tree, root) = root_tree();
        tree.begin_load(root);

        // the contact fetch could not start: it is finished at dispatch time
        assert_eq!(tree.finish_fetch(root), Some(false));
        assert!(tree.get(root).unwrap().is_loading());

        tree.append_children(root, vec![]);
        assert_eq!(tree.finish_fetch(root), Some(true));
        let node = tree.get(root).unwrap();
        assert!(!node.has_placeholder());
        assert!(!node.is_loading());
    }

    #[test]
    fn cleared_tree_ignores_stale_handles() {
        let (mut tree, root) = root_tree();
        tree.begin_load(root);
        tree.clear();

        assert!(tree.is_empty());
        assert!(tree.get(root).is_none());
        assert!(tree.append_children(root, vec![mail("Inbox")]).is_none());
        assert!(tree.finish_fetch(root).is_none());
        assert!(!tree.set_open(root, true));
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn flatten_walks_open_nodes_only() {
        let (mut tree, root) = root_tree();
        let cal_root = tree.push_root(NewNode::leaf(
            "Calendar Folders (Dummy Folder)",
            FolderInfo::dummy_calendar_root(),
        ));

        let rows = tree.flatten();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].glyph, Glyph::Closed);
        assert_eq!(rows[1].glyph, Glyph::Leaf);

        tree.begin_load(root);
        let rows = tree.flatten();
        assert!(rows[1].is_placeholder);
        assert_eq!(rows[1].depth, 1);

        tree.append_children(
            root,
            vec![NewNode::lazy("Inbox", FolderInfo::new("IN", FolderKind::Message))],
        );
        let rows = tree.flatten();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["MsgFolderRoot", "Inbox", "Calendar Folders (Dummy Folder)"]
        );
        assert_eq!(rows[1].glyph, Glyph::Closed);
        assert_eq!(rows[2].id, cal_root);

        tree.set_open(root, false);
        assert_eq!(tree.flatten().len(), 2);
    }
}
