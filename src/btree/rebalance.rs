//! Split, borrow and merge operations for the B+ tree.
//!
//! All functions take the descent path recorded by the mutation that
//! triggered them: `path` holds `(node, child index)` pairs from the root
//! down to (but excluding) the node being rebalanced. Subtree counts are
//! recomputed on every node a rebalance touches, then up the remaining
//! path to the root.

use std::mem;

use super::{BPlusTree, Node, NodeKind, TreeKey};

impl<K: TreeKey, V> BPlusTree<K, V> {
    /// Split an overflowing leaf (one holding `order` keys).
    ///
    /// The upper half moves to a new leaf spliced after the original; the
    /// new leaf's first key is promoted as the parent separator.
    pub(super) fn split_leaf(&mut self, leaf: usize, path: &[(usize, usize)]) {
        let mid = (self.order + 1) / 2;

        let (sep, right_keys, right_lists, old_next) = match &mut self.nodes[leaf].kind {
            NodeKind::Leaf { keys, lists, next } => {
                let right_keys = keys.split_off(mid);
                let right_lists = lists.split_off(mid);
                (right_keys[0], right_keys, right_lists, *next)
            }
            NodeKind::Internal { .. } => unreachable!("split_leaf on internal node"),
        };

        let new_leaf = self.alloc(Node::new_leaf(right_keys, right_lists, old_next));
        if let NodeKind::Leaf { next, .. } = &mut self.nodes[leaf].kind {
            *next = Some(new_leaf);
        }
        self.recompute_size(leaf);
        self.recompute_size(new_leaf);

        self.insert_into_parent(leaf, sep, new_leaf, path);
    }

    /// Split an overflowing internal node.
    ///
    /// The middle key is promoted; keys and children above it move to a new
    /// right sibling.
    fn split_internal(&mut self, node: usize, path: &[(usize, usize)]) {
        let (promoted, right_keys, right_children) = match &mut self.nodes[node].kind {
            NodeKind::Internal { keys, children } => {
                let mid = keys.len() / 2;
                let mut right_keys = keys.split_off(mid);
                let promoted = right_keys.remove(0);
                let right_children = children.split_off(mid + 1);
                (promoted, right_keys, right_children)
            }
            NodeKind::Leaf { .. } => unreachable!("split_internal on leaf"),
        };

        let new_node = self.alloc(Node::new_internal(right_keys, right_children));
        self.recompute_size(node);
        self.recompute_size(new_node);

        self.insert_into_parent(node, promoted, new_node, path);
    }

    /// Hook `right` (and the separator between the halves) into the parent
    /// of `left`, creating a new root when `left` was the root.
    fn insert_into_parent(&mut self, left: usize, sep: K, right: usize, path: &[(usize, usize)]) {
        let Some(&(parent, child_idx)) = path.last() else {
            let new_root = self.alloc(Node::new_internal(vec![sep], vec![left, right]));
            self.recompute_size(new_root);
            self.root = new_root;
            return;
        };

        let order = self.order;
        let overflow = match &mut self.nodes[parent].kind {
            NodeKind::Internal { keys, children } => {
                // The descent entered `left` through slot `child_idx`; the
                // promoted separator takes that key position.
                keys.insert(child_idx, sep);
                children.insert(child_idx + 1, right);
                keys.len() >= order
            }
            NodeKind::Leaf { .. } => unreachable!("leaf on internal path"),
        };

        let rest = &path[..path.len() - 1];
        if overflow {
            self.split_internal(parent, rest);
        } else {
            self.recompute_upward(parent, rest);
        }
    }

    /// Restore minimum occupancy of a non-root leaf after `remove`.
    ///
    /// Tries, in order: borrow from the left sibling, borrow from the
    /// right sibling, merge with the left sibling, merge with the right.
    pub(super) fn rebalance_leaf(&mut self, leaf: usize, path: &[(usize, usize)]) {
        let Some(&(parent, idx)) = path.last() else {
            unreachable!("non-root leaf has a parent")
        };
        let min_keys = (self.order - 1) / 2;
        let rest = &path[..path.len() - 1];

        let (left_sibling, right_sibling) = self.siblings_of(parent, idx);

        if let Some(left) = left_sibling {
            if self.nodes[left].key_count() > min_keys {
                self.borrow_from_left_leaf(leaf, left, parent, idx);
                self.recompute_upward(parent, rest);
                return;
            }
        }
        if let Some(right) = right_sibling {
            if self.nodes[right].key_count() > min_keys {
                self.borrow_from_right_leaf(leaf, right, parent, idx);
                self.recompute_upward(parent, rest);
                return;
            }
        }

        if let Some(left) = left_sibling {
            self.merge_leaves(left, leaf, parent, idx - 1, rest);
        } else if let Some(right) = right_sibling {
            self.merge_leaves(leaf, right, parent, idx, rest);
        }
    }

    fn siblings_of(&self, parent: usize, idx: usize) -> (Option<usize>, Option<usize>) {
        match &self.nodes[parent].kind {
            NodeKind::Internal { children, .. } => {
                let left = (idx > 0).then(|| children[idx - 1]);
                let right = (idx + 1 < children.len()).then(|| children[idx + 1]);
                (left, right)
            }
            NodeKind::Leaf { .. } => unreachable!("leaf as parent"),
        }
    }

    /// Move the left sibling's last (key, list) to the front of `leaf` and
    /// refresh the separator between them.
    fn borrow_from_left_leaf(&mut self, leaf: usize, left: usize, parent: usize, idx: usize) {
        let (moved_key, moved_list) = match &mut self.nodes[left].kind {
            NodeKind::Leaf { keys, lists, .. } => {
                let k = keys[keys.len() - 1];
                keys.truncate(keys.len() - 1);
                let l = lists.len();
                (k, lists.remove(l - 1))
            }
            NodeKind::Internal { .. } => unreachable!("leaf sibling expected"),
        };

        match &mut self.nodes[leaf].kind {
            NodeKind::Leaf { keys, lists, .. } => {
                keys.insert(0, moved_key);
                lists.insert(0, moved_list);
            }
            NodeKind::Internal { .. } => unreachable!("leaf expected"),
        }

        if let NodeKind::Internal { keys, .. } = &mut self.nodes[parent].kind {
            keys[idx - 1] = moved_key;
        }
        self.recompute_size(left);
        self.recompute_size(leaf);
    }

    /// Move the right sibling's first (key, list) to the end of `leaf` and
    /// refresh the separator between them.
    fn borrow_from_right_leaf(&mut self, leaf: usize, right: usize, parent: usize, idx: usize) {
        let (moved_key, moved_list, right_first) = match &mut self.nodes[right].kind {
            NodeKind::Leaf { keys, lists, .. } => {
                let k = keys.remove(0);
                let l = lists.remove(0);
                (k, l, keys[0])
            }
            NodeKind::Internal { .. } => unreachable!("leaf sibling expected"),
        };

        match &mut self.nodes[leaf].kind {
            NodeKind::Leaf { keys, lists, .. } => {
                keys.push(moved_key);
                lists.push(moved_list);
            }
            NodeKind::Internal { .. } => unreachable!("leaf expected"),
        }

        if let NodeKind::Internal { keys, .. } = &mut self.nodes[parent].kind {
            keys[idx] = right_first;
        }
        self.recompute_size(right);
        self.recompute_size(leaf);
    }

    /// Concatenate leaf `right` onto leaf `left`, splice the chain, release
    /// `right`, and drop the separator at `sep_idx` from the parent.
    fn merge_leaves(
        &mut self,
        left: usize,
        right: usize,
        parent: usize,
        sep_idx: usize,
        rest: &[(usize, usize)],
    ) {
        let (right_keys, right_lists, right_next) = match &mut self.nodes[right].kind {
            NodeKind::Leaf { keys, lists, next } => {
                (mem::take(keys), mem::take(lists), next.take())
            }
            NodeKind::Internal { .. } => unreachable!("leaf expected"),
        };

        match &mut self.nodes[left].kind {
            NodeKind::Leaf { keys, lists, next } => {
                keys.extend(right_keys);
                lists.extend(right_lists);
                *next = right_next;
            }
            NodeKind::Internal { .. } => unreachable!("leaf expected"),
        }
        self.release(right);
        self.recompute_size(left);

        self.remove_separator(parent, sep_idx, rest);
    }

    /// Drop separator `sep_idx` (and the child to its right) from `parent`,
    /// then restore the parent's occupancy.
    fn remove_separator(&mut self, parent: usize, sep_idx: usize, rest: &[(usize, usize)]) {
        match &mut self.nodes[parent].kind {
            NodeKind::Internal { keys, children } => {
                keys.remove(sep_idx);
                children.remove(sep_idx + 1);
            }
            NodeKind::Leaf { .. } => unreachable!("leaf as parent"),
        }

        if parent == self.root {
            let collapse = match &self.nodes[parent].kind {
                NodeKind::Internal { keys, children } => {
                    keys.is_empty().then(|| children[0])
                }
                NodeKind::Leaf { .. } => None,
            };
            match collapse {
                Some(only_child) => {
                    // Root lost its last separator: its single child becomes
                    // the new root.
                    self.release(parent);
                    self.root = only_child;
                }
                None => self.recompute_size(parent),
            }
            return;
        }

        let min_keys = (self.order - 1) / 2;
        if self.nodes[parent].key_count() < min_keys {
            self.rebalance_internal(parent, rest);
        } else {
            self.recompute_upward(parent, rest);
        }
    }

    /// Restore minimum occupancy of a non-root internal node, mirroring the
    /// leaf procedure: borrow left, borrow right, else merge.
    fn rebalance_internal(&mut self, node: usize, path: &[(usize, usize)]) {
        let Some(&(parent, idx)) = path.last() else {
            unreachable!("non-root internal node has a parent")
        };
        let min_keys = (self.order - 1) / 2;
        let rest = &path[..path.len() - 1];

        let (left_sibling, right_sibling) = self.siblings_of(parent, idx);

        if let Some(left) = left_sibling {
            if self.nodes[left].key_count() > min_keys {
                self.borrow_from_left_internal(node, left, parent, idx);
                self.recompute_upward(parent, rest);
                return;
            }
        }
        if let Some(right) = right_sibling {
            if self.nodes[right].key_count() > min_keys {
                self.borrow_from_right_internal(node, right, parent, idx);
                self.recompute_upward(parent, rest);
                return;
            }
        }

        if let Some(left) = left_sibling {
            self.merge_internals(left, node, parent, idx - 1, rest);
        } else if let Some(right) = right_sibling {
            self.merge_internals(node, right, parent, idx, rest);
        }
    }

    /// Rotate through the parent: the separator left of `node` comes down
    /// as its new first key, the left sibling's last key goes up, and the
    /// sibling's last child moves over.
    fn borrow_from_left_internal(&mut self, node: usize, left: usize, parent: usize, idx: usize) {
        let (up_key, moved_child) = match &mut self.nodes[left].kind {
            NodeKind::Internal { keys, children } => {
                let k = keys[keys.len() - 1];
                keys.truncate(keys.len() - 1);
                let c = children[children.len() - 1];
                children.truncate(children.len() - 1);
                (k, c)
            }
            NodeKind::Leaf { .. } => unreachable!("internal sibling expected"),
        };

        let down_key = match &mut self.nodes[parent].kind {
            NodeKind::Internal { keys, .. } => mem::replace(&mut keys[idx - 1], up_key),
            NodeKind::Leaf { .. } => unreachable!("leaf as parent"),
        };

        match &mut self.nodes[node].kind {
            NodeKind::Internal { keys, children } => {
                keys.insert(0, down_key);
                children.insert(0, moved_child);
            }
            NodeKind::Leaf { .. } => unreachable!("internal node expected"),
        }
        self.recompute_size(left);
        self.recompute_size(node);
    }

    /// Mirror image of [`Self::borrow_from_left_internal`].
    fn borrow_from_right_internal(&mut self, node: usize, right: usize, parent: usize, idx: usize) {
        let (up_key, moved_child) = match &mut self.nodes[right].kind {
            NodeKind::Internal { keys, children } => (keys.remove(0), children.remove(0)),
            NodeKind::Leaf { .. } => unreachable!("internal sibling expected"),
        };

        let down_key = match &mut self.nodes[parent].kind {
            NodeKind::Internal { keys, .. } => mem::replace(&mut keys[idx], up_key),
            NodeKind::Leaf { .. } => unreachable!("leaf as parent"),
        };

        match &mut self.nodes[node].kind {
            NodeKind::Internal { keys, children } => {
                keys.push(down_key);
                children.push(moved_child);
            }
            NodeKind::Leaf { .. } => unreachable!("internal node expected"),
        }
        self.recompute_size(right);
        self.recompute_size(node);
    }

    /// Concatenate internal `right` onto `left` with the parent separator
    /// pulled down between them, release `right`, and drop the separator.
    fn merge_internals(
        &mut self,
        left: usize,
        right: usize,
        parent: usize,
        sep_idx: usize,
        rest: &[(usize, usize)],
    ) {
        let (right_keys, right_children) = match &mut self.nodes[right].kind {
            NodeKind::Internal { keys, children } => (mem::take(keys), mem::take(children)),
            NodeKind::Leaf { .. } => unreachable!("internal node expected"),
        };

        let down_key = match &self.nodes[parent].kind {
            NodeKind::Internal { keys, .. } => keys[sep_idx],
            NodeKind::Leaf { .. } => unreachable!("leaf as parent"),
        };

        match &mut self.nodes[left].kind {
            NodeKind::Internal { keys, children } => {
                keys.push(down_key);
                keys.extend(right_keys);
                children.extend(right_children);
            }
            NodeKind::Leaf { .. } => unreachable!("internal node expected"),
        }
        self.release(right);
        self.recompute_size(left);

        self.remove_separator(parent, sep_idx, rest);
    }
}
