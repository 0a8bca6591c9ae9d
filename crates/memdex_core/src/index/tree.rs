//! Arena-backed red-black tree.

use slab::Slab;
use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::atomic::{self, AtomicUsize};

/// Arena slot of a node. Stable across rotations; released (and possibly
/// reused) only when the node is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

/// Cached handle of an extreme node, readable and resettable through `&self`.
#[derive(Debug, Default)]
struct ExtremeCache(AtomicUsize);

impl ExtremeCache {
    const EMPTY: usize = 0;

    fn get(&self) -> Option<NodeId> {
        match self.0.load(atomic::Ordering::Relaxed) {
            Self::EMPTY => None,
            slot => Some(NodeId(slot - 1)),
        }
    }

    fn set(&self, id: NodeId) {
        self.0.store(id.0 + 1, atomic::Ordering::Relaxed);
    }

    fn clear(&self) {
        self.0.store(Self::EMPTY, atomic::Ordering::Relaxed);
    }
}

/// An ordered map implemented as a red-black tree over a node arena.
///
/// `OrderedIndex` supports:
/// - Point lookups, inserts and deletes in O(log n)
/// - Ordered range scans (`between`, `less_than`, `greater_than`) that stop
///   as soon as the upper bound is passed
/// - Batch exact-match lookups (`in_keys`)
/// - Cached `min` / `max`
///
/// Nodes live in a [`Slab`]; links between them, including the parent
/// back-reference, are plain slot handles.
///
/// # Example
///
/// ```
/// use memdex_core::index::OrderedIndex;
///
/// let mut index = OrderedIndex::new();
/// index.set(20, "b", true);
/// index.set(10, "a", true);
/// index.set(30, "c", true);
///
/// assert_eq!(index.between(&10, &20), vec![&"a", &"b"]);
/// assert_eq!(index.max(), Some((&30, &"c")));
/// ```
#[derive(Debug)]
pub struct OrderedIndex<K, V> {
    nodes: Slab<Node<K, V>>,
    root: Option<NodeId>,
    min: ExtremeCache,
    max: ExtremeCache,
}

impl<K, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
            min: ExtremeCache::default(),
            max: ExtremeCache::default(),
        }
    }
}

impl<K: Ord, V> OrderedIndex<K, V> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts `key`, or overwrites its value when it exists and `upsert` is set.
    ///
    /// Returns whether an insertion or overwrite happened.
    pub fn set(&mut self, key: K, value: V, upsert: bool) -> bool {
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;

        while let Some(id) = cur {
            let node = &self.nodes[id.0];
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    if upsert {
                        self.nodes[id.0].value = value;
                    }
                    return upsert;
                }
                Ordering::Less => {
                    go_left = true;
                    cur = node.left;
                }
                Ordering::Greater => {
                    go_left = false;
                    cur = node.right;
                }
            }
            parent = Some(id);
        }

        let id = NodeId(self.nodes.insert(Node {
            key,
            value,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        }));

        match parent {
            None => self.root = Some(id),
            Some(p) if go_left => self.nodes[p.0].left = Some(id),
            Some(p) => self.nodes[p.0].right = Some(id),
        }

        self.insert_fixup(id);
        self.note_inserted(id);
        true
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.nodes[id.0].value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(|id| &mut self.nodes[id.0].value)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key`, returning its value.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let id = self.find(key)?;
        Some(self.delete_node(id))
    }

    /// Values whose keys satisfy `low <= key <= high`, ascending by key.
    pub fn between(&self, low: &K, high: &K) -> Vec<&V> {
        self.collect_range(Bound::Included(low), Bound::Included(high))
    }

    /// Values whose keys are below `bound` (or equal, when `inclusive`), ascending.
    pub fn less_than(&self, bound: &K, inclusive: bool) -> Vec<&V> {
        let upper = if inclusive {
            Bound::Included(bound)
        } else {
            Bound::Excluded(bound)
        };
        self.collect_range(Bound::Unbounded, upper)
    }

    /// Values whose keys are above `bound` (or equal, when `inclusive`), ascending.
    pub fn greater_than(&self, bound: &K, inclusive: bool) -> Vec<&V> {
        match self.max() {
            None => return Vec::new(),
            Some((max, _)) => match bound.cmp(max) {
                Ordering::Greater => return Vec::new(),
                Ordering::Equal if !inclusive => return Vec::new(),
                _ => {}
            },
        }
        let lower = if inclusive {
            Bound::Included(bound)
        } else {
            Bound::Excluded(bound)
        };
        self.collect_range(lower, Bound::Unbounded)
    }

    /// Values for each key of `keys` that is present, in `keys` order.
    pub fn in_keys<'a, I>(&self, keys: I) -> Vec<&V>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        keys.into_iter().filter_map(|key| self.get(key)).collect()
    }

    /// The smallest entry.
    pub fn min(&self) -> Option<(&K, &V)> {
        let id = match self.min.get() {
            Some(id) => id,
            None => {
                let id = self.leftmost(self.root?);
                self.min.set(id);
                id
            }
        };
        let node = &self.nodes[id.0];
        Some((&node.key, &node.value))
    }

    /// The largest entry.
    pub fn max(&self) -> Option<(&K, &V)> {
        let id = match self.max.get() {
            Some(id) => id,
            None => {
                let id = self.rightmost(self.root?);
                self.max.set(id);
                id
            }
        };
        let node = &self.nodes[id.0];
        Some((&node.key, &node.value))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.min.clear();
        self.max.clear();
    }

    /// In-order iterator over all entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            index: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Validates the red-black and search-tree invariants.
    ///
    /// Returns the black height on success, or a description of the first
    /// violated rule.
    pub fn check_invariants(&self) -> Result<usize, String> {
        let Some(root) = self.root else {
            return if self.nodes.is_empty() {
                Ok(0)
            } else {
                Err(format!("{} nodes unreachable from empty root", self.nodes.len()))
            };
        };
        let root_node = &self.nodes[root.0];
        if root_node.parent.is_some() {
            return Err("root has a parent".into());
        }
        if root_node.color != Color::Black {
            return Err("root is red".into());
        }

        let mut seen = 0;
        let height = self.check_subtree(root, None, None, &mut seen)?;
        if seen != self.nodes.len() {
            return Err(format!(
                "{} nodes reachable but arena holds {}",
                seen,
                self.nodes.len()
            ));
        }

        let mut prev: Option<&K> = None;
        for (key, _) in self.iter() {
            if prev.is_some_and(|p| p >= key) {
                return Err("in-order keys are not strictly ascending".into());
            }
            prev = Some(key);
        }
        Ok(height)
    }

    fn check_subtree(
        &self,
        id: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
        seen: &mut usize,
    ) -> Result<usize, String> {
        let node = &self.nodes[id.0];
        *seen += 1;

        if lower.is_some_and(|l| &node.key <= l) || upper.is_some_and(|u| &node.key >= u) {
            return Err("key outside the bounds of its subtree".into());
        }

        let mut heights = [0usize; 2];
        for (slot, child) in [node.left, node.right].into_iter().enumerate() {
            heights[slot] = match child {
                None => 1,
                Some(c) => {
                    let child_node = &self.nodes[c.0];
                    if child_node.parent != Some(id) {
                        return Err("child does not point back to its parent".into());
                    }
                    if node.color == Color::Red && child_node.color == Color::Red {
                        return Err("red node has a red child".into());
                    }
                    let (lo, hi) = if slot == 0 {
                        (lower, Some(&node.key))
                    } else {
                        (Some(&node.key), upper)
                    };
                    self.check_subtree(c, lo, hi, seen)?
                }
            };
        }

        if heights[0] != heights[1] {
            return Err("black heights differ between subtrees".into());
        }
        Ok(heights[0] + usize::from(node.color == Color::Black))
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        // cached extremes reject out-of-range keys without descending
        if let Some(id) = self.min.get() {
            match key.cmp(&self.nodes[id.0].key) {
                Ordering::Equal => return Some(id),
                Ordering::Less => return None,
                Ordering::Greater => {}
            }
        }
        if let Some(id) = self.max.get() {
            match key.cmp(&self.nodes[id.0].key) {
                Ordering::Equal => return Some(id),
                Ordering::Greater => return None,
                Ordering::Less => {}
            }
        }

        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id.0];
            cur = match key.cmp(&node.key) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    fn collect_range(&self, lower: Bound<&K>, upper: Bound<&K>) -> Vec<&V> {
        let above_lower = |key: &K| match lower {
            Bound::Included(l) => key >= l,
            Bound::Excluded(l) => key > l,
            Bound::Unbounded => true,
        };
        let below_upper = |key: &K| match upper {
            Bound::Included(u) => key <= u,
            Bound::Excluded(u) => key < u,
            Bound::Unbounded => true,
        };

        // seek the first key at or above the lower bound, keeping the
        // ancestors still to be visited on the stack
        let mut stack = Vec::new();
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id.0];
            if above_lower(&node.key) {
                stack.push(id);
                cur = node.left;
            } else {
                cur = node.right;
            }
        }

        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if !below_upper(&node.key) {
                break;
            }
            out.push(&node.value);

            let mut cur = node.right;
            while let Some(c) = cur {
                stack.push(c);
                cur = self.nodes[c.0].left;
            }
        }
        out
    }

    fn note_inserted(&self, id: NodeId) {
        let key = &self.nodes[id.0].key;
        if let Some(min) = self.min.get() {
            if key < &self.nodes[min.0].key {
                self.min.set(id);
            }
        }
        if let Some(max) = self.max.get() {
            if key > &self.nodes[max.0].key {
                self.max.set(id);
            }
        }
    }

    fn delete_node(&mut self, z: NodeId) -> V {
        let (z_left, z_right, z_parent, z_color) = {
            let n = &self.nodes[z.0];
            (n.left, n.right, n.parent, n.color)
        };

        // `x` is the node that moved into the vacated position (possibly
        // none); `x_parent` locates that position when `x` is none.
        let x;
        let x_parent;
        let removed_color;

        match (z_left, z_right) {
            (None, _) => {
                x = z_right;
                x_parent = z_parent;
                removed_color = z_color;
                self.transplant(z, z_right);
            }
            (Some(_), None) => {
                x = z_left;
                x_parent = z_parent;
                removed_color = z_color;
                self.transplant(z, z_left);
            }
            (Some(left), Some(right)) => {
                let y = self.leftmost(right);
                removed_color = self.nodes[y.0].color;
                x = self.nodes[y.0].right;

                if self.nodes[y.0].parent == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.nodes[y.0].parent;
                    self.transplant(y, x);
                    self.nodes[y.0].right = Some(right);
                    self.nodes[right.0].parent = Some(y);
                }

                self.transplant(z, Some(y));
                self.nodes[y.0].left = Some(left);
                self.nodes[left.0].parent = Some(y);
                self.nodes[y.0].color = z_color;
            }
        }

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        if self.min.get() == Some(z) {
            self.min.clear();
        }
        if self.max.get() == Some(z) {
            self.max.clear();
        }

        self.nodes.remove(z.0).value
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        loop {
            let Some(p) = self.nodes[z.0].parent else {
                break;
            };
            if self.nodes[p.0].color == Color::Black {
                break;
            }
            let Some(g) = self.nodes[p.0].parent else {
                break;
            };

            if self.nodes[g.0].left == Some(p) {
                let uncle = self.nodes[g.0].right;
                if self.is_red(uncle) {
                    self.paint(Some(p), Color::Black);
                    self.paint(uncle, Color::Black);
                    self.paint(Some(g), Color::Red);
                    z = g;
                } else {
                    if self.nodes[p.0].right == Some(z) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent_of(z);
                    self.paint(p, Color::Black);
                    self.paint(Some(g), Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g.0].left;
                if self.is_red(uncle) {
                    self.paint(Some(p), Color::Black);
                    self.paint(uncle, Color::Black);
                    self.paint(Some(g), Color::Red);
                    z = g;
                } else {
                    if self.nodes[p.0].left == Some(z) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent_of(z);
                    self.paint(p, Color::Black);
                    self.paint(Some(g), Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        self.paint(self.root, Color::Black);
    }

    fn delete_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = parent else {
                break;
            };

            if x == self.nodes[p.0].left {
                let Some(mut w) = self.nodes[p.0].right else {
                    x = Some(p);
                    parent = self.nodes[p.0].parent;
                    continue;
                };
                if self.nodes[w.0].color == Color::Red {
                    self.paint(Some(w), Color::Black);
                    self.paint(Some(p), Color::Red);
                    self.rotate_left(p);
                    match self.nodes[p.0].right {
                        Some(next) => w = next,
                        None => {
                            x = Some(p);
                            parent = self.nodes[p.0].parent;
                            continue;
                        }
                    }
                }
                let (w_left, w_right) = (self.nodes[w.0].left, self.nodes[w.0].right);
                if !self.is_red(w_left) && !self.is_red(w_right) {
                    self.paint(Some(w), Color::Red);
                    x = Some(p);
                    parent = self.nodes[p.0].parent;
                } else {
                    if !self.is_red(w_right) {
                        self.paint(w_left, Color::Black);
                        self.paint(Some(w), Color::Red);
                        self.rotate_right(w);
                        w = self.nodes[p.0].right.unwrap_or(w);
                    }
                    let p_color = self.nodes[p.0].color;
                    self.paint(Some(w), p_color);
                    self.paint(Some(p), Color::Black);
                    self.paint(self.nodes[w.0].right, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.nodes[p.0].left else {
                    x = Some(p);
                    parent = self.nodes[p.0].parent;
                    continue;
                };
                if self.nodes[w.0].color == Color::Red {
                    self.paint(Some(w), Color::Black);
                    self.paint(Some(p), Color::Red);
                    self.rotate_right(p);
                    match self.nodes[p.0].left {
                        Some(next) => w = next,
                        None => {
                            x = Some(p);
                            parent = self.nodes[p.0].parent;
                            continue;
                        }
                    }
                }
                let (w_left, w_right) = (self.nodes[w.0].left, self.nodes[w.0].right);
                if !self.is_red(w_left) && !self.is_red(w_right) {
                    self.paint(Some(w), Color::Red);
                    x = Some(p);
                    parent = self.nodes[p.0].parent;
                } else {
                    if !self.is_red(w_left) {
                        self.paint(w_right, Color::Black);
                        self.paint(Some(w), Color::Red);
                        self.rotate_left(w);
                        w = self.nodes[p.0].left.unwrap_or(w);
                    }
                    let p_color = self.nodes[p.0].color;
                    self.paint(Some(w), p_color);
                    self.paint(Some(p), Color::Black);
                    self.paint(self.nodes[w.0].left, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.paint(x, Color::Black);
    }

    /// Replaces the subtree rooted at `old` with the one rooted at `new`.
    fn transplant(&mut self, old: NodeId, new: Option<NodeId>) {
        let parent = self.nodes[old.0].parent;
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p.0].left == Some(old) => self.nodes[p.0].left = new,
            Some(p) => self.nodes[p.0].right = new,
        }
        if let Some(n) = new {
            self.nodes[n.0].parent = parent;
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x.0].right else {
            return;
        };
        let y_left = self.nodes[y.0].left;
        self.nodes[x.0].right = y_left;
        if let Some(yl) = y_left {
            self.nodes[yl.0].parent = Some(x);
        }
        self.transplant(x, Some(y));
        self.nodes[y.0].left = Some(x);
        self.nodes[x.0].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x.0].left else {
            return;
        };
        let y_right = self.nodes[y.0].right;
        self.nodes[x.0].left = y_right;
        if let Some(yr) = y_right {
            self.nodes[yr.0].parent = Some(x);
        }
        self.transplant(x, Some(y));
        self.nodes[y.0].right = Some(x);
        self.nodes[x.0].parent = Some(y);
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id.0].left {
            id = left;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.nodes[id.0].right {
            id = right;
        }
        id
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.nodes[id.0].color == Color::Red)
    }

    fn paint(&mut self, id: Option<NodeId>, color: Color) {
        if let Some(id) = id {
            self.nodes[id.0].color = color;
        }
    }
}

/// In-order iterator over an [`OrderedIndex`].
pub struct Iter<'a, K, V> {
    index: &'a OrderedIndex<K, V>,
    stack: Vec<NodeId>,
}

impl<K, V> Iter<'_, K, V> {
    fn push_left_spine(&mut self, mut cur: Option<NodeId>) {
        while let Some(id) = cur {
            self.stack.push(id);
            cur = self.index.nodes[id.0].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.index.nodes[id.0];
        self.push_left_spine(node.right);
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn filled(keys: &[i64]) -> OrderedIndex<i64, i64> {
        let mut index = OrderedIndex::new();
        for &k in keys {
            index.set(k, k * 10, true);
        }
        index
    }

    #[test]
    fn set_and_get() {
        let index = filled(&[30, 10, 50, 20, 40]);
        assert_eq!(index.len(), 5);
        assert_eq!(index.get(&20), Some(&200));
        assert_eq!(index.get(&25), None);
        assert!(index.check_invariants().is_ok());
    }

    #[test]
    fn set_without_upsert_keeps_value() {
        let mut index = filled(&[1]);
        assert!(!index.set(1, 99, false));
        assert_eq!(index.get(&1), Some(&10));

        assert!(index.set(1, 99, true));
        assert_eq!(index.get(&1), Some(&99));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let keys: Vec<i64> = (0..1024).collect();
        let index = filled(&keys);
        let height = index.check_invariants().unwrap();
        // black height of a red-black tree with n nodes is at most log2(n + 1)
        assert!(height <= 11, "black height {height}");
    }

    #[test]
    fn delete_returns_value_and_rebalances() {
        let mut index = filled(&(0..100).collect::<Vec<_>>());
        for k in (0..100).step_by(3) {
            assert_eq!(index.delete(&k), Some(k * 10));
            index.check_invariants().unwrap();
        }
        assert_eq!(index.delete(&0), None);
        assert_eq!(index.len(), 66);
    }

    #[test]
    fn delete_node_with_two_children() {
        let mut index = filled(&[50, 25, 75, 10, 30, 60, 90]);
        assert_eq!(index.delete(&50), Some(500));
        index.check_invariants().unwrap();
        let keys: Vec<_> = index.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![10, 25, 30, 60, 75, 90]);
    }

    #[test]
    fn between_is_inclusive_and_ordered() {
        let index = filled(&[50, 10, 40, 20, 30]);
        assert_eq!(index.between(&20, &40), vec![&200, &300, &400]);
        assert_eq!(index.between(&21, &29), Vec::<&i64>::new());
        assert_eq!(index.between(&0, &100).len(), 5);
    }

    #[test]
    fn less_than_bounds() {
        let index = filled(&[10, 20, 30, 40, 50]);
        assert_eq!(index.less_than(&30, false), vec![&100, &200]);
        assert_eq!(index.less_than(&30, true), vec![&100, &200, &300]);
        assert!(index.less_than(&10, false).is_empty());
    }

    #[test]
    fn greater_than_bounds() {
        let index = filled(&[10, 20, 30, 40, 50]);
        assert_eq!(index.greater_than(&30, false), vec![&400, &500]);
        assert_eq!(index.greater_than(&30, true), vec![&300, &400, &500]);
        assert!(index.greater_than(&50, false).is_empty());
        assert_eq!(index.greater_than(&50, true), vec![&500]);
        assert!(index.greater_than(&60, true).is_empty());

        let empty: OrderedIndex<i64, i64> = OrderedIndex::new();
        assert!(empty.greater_than(&0, true).is_empty());
    }

    #[test]
    fn in_keys_skips_missing() {
        let index = filled(&[1, 2, 3]);
        assert_eq!(index.in_keys(&[3, 9, 1]), vec![&30, &10]);
    }

    #[test]
    fn min_max_are_recomputed_after_delete() {
        let mut index = filled(&[30, 10, 50, 20, 40]);
        assert_eq!(index.min(), Some((&10, &100)));
        assert_eq!(index.max(), Some((&50, &500)));

        index.delete(&10);
        index.delete(&50);
        assert_eq!(index.min(), Some((&20, &200)));
        assert_eq!(index.max(), Some((&40, &400)));

        index.set(5, 50, true);
        assert_eq!(index.min(), Some((&5, &50)));
    }

    #[test]
    fn min_max_survive_slot_reuse() {
        let mut index = filled(&[1, 2, 3]);
        assert_eq!(index.max(), Some((&3, &30)));
        index.delete(&3);
        // the freed slot is reused by the next insert
        index.set(0, 0, true);
        assert_eq!(index.max(), Some((&2, &20)));
        assert_eq!(index.min(), Some((&0, &0)));
    }

    #[test]
    fn clear_resets() {
        let mut index = filled(&[1, 2, 3]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.min(), None);
        assert_eq!(index.max(), None);
        assert_eq!(index.check_invariants(), Ok(0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(i16),
        Delete(i16),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-200i16..200).prop_map(Op::Set),
            (-200i16..200).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_under_random_ops(ops in prop::collection::vec(op_strategy(), 0..400)) {
            let mut index = OrderedIndex::new();
            let mut model = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Set(k) => {
                        index.set(k, i32::from(k), true);
                        model.insert(k, i32::from(k));
                    }
                    Op::Delete(k) => {
                        prop_assert_eq!(index.delete(&k), model.remove(&k));
                    }
                }
                prop_assert!(index.check_invariants().is_ok(), "{:?}", index.check_invariants());
            }

            let keys: Vec<_> = index.iter().map(|(k, _)| *k).collect();
            let expected: Vec<_> = model.keys().copied().collect();
            prop_assert_eq!(keys, expected);
            prop_assert_eq!(index.min().map(|(k, _)| *k), model.keys().next().copied());
            prop_assert_eq!(index.max().map(|(k, _)| *k), model.keys().next_back().copied());
        }

        #[test]
        fn set_then_get_round_trips(
            prior in prop::collection::vec(any::<i32>(), 0..100),
            key in any::<i32>(),
            value in any::<u64>(),
        ) {
            let mut index = OrderedIndex::new();
            for k in prior {
                index.set(k, 0u64, true);
            }
            index.set(key, value, true);
            prop_assert_eq!(index.get(&key), Some(&value));
        }

        #[test]
        fn between_matches_filter(
            keys in prop::collection::btree_set(-500i32..500, 0..200),
            a in -600i32..600,
            b in -600i32..600,
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let mut index = OrderedIndex::new();
            for &k in &keys {
                index.set(k, k, true);
            }

            let got: Vec<i32> = index.between(&low, &high).into_iter().copied().collect();
            let expected: Vec<i32> = keys.range(low..=high).copied().collect();
            prop_assert_eq!(got, expected);
        }
    }
}
