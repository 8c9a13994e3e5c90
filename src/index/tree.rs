//! Unbalanced binary search tree with multi-value nodes
//!
//! Every distinct key owns one node holding the values filed under it, in
//! insertion order. Tree shape is decided by the insertion order of distinct
//! keys; there is no rebalancing, so a sorted insert sequence degenerates into
//! a list. All traversals are iterative for that reason.

use std::borrow::Borrow;
use std::cmp::Ordering;

use super::errors::{IndexError, IndexResult};

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    values: Vec<V>,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            values: vec![value],
            left: None,
            right: None,
        }
    }
}

/// Ordered index from a key to the non-empty sequence of values sharing it.
///
/// The index compares keys as given. Callers that want case-insensitive
/// exact lookups must normalize keys before both insert and search, otherwise
/// lookups silently miss.
pub struct OrderedMultiIndex<K, V> {
    root: Link<K, V>,
    key_count: usize,
    value_count: usize,
}

impl<K, V> OrderedMultiIndex<K, V> {
    /// Creates an empty index
    pub fn new() -> Self {
        Self {
            root: None,
            key_count: 0,
            value_count: 0,
        }
    }

    /// Returns the number of distinct keys (nodes)
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Returns the number of stored values across all nodes
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Returns true if the index holds nothing
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node<K, V>, usize)> = Vec::new();
        if let Some(root) = self.root.as_deref() {
            stack.push((root, 1));
        }
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.left.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.right.as_deref().map(|n| (n, depth + 1)));
        }
        deepest
    }

    /// In-order iteration over `(key, values)` pairs
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(self.root.as_deref());
        iter
    }

    /// Remove every node
    pub fn clear(&mut self) {
        let mut pending: Vec<Box<Node<K, V>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.left.take());
            pending.extend(node.right.take());
        }
        self.key_count = 0;
        self.value_count = 0;
    }
}

impl<K: Ord, V> OrderedMultiIndex<K, V> {
    /// Insert `value` under `key`.
    ///
    /// An existing key appends to its node; a new key becomes a leaf.
    pub fn insert(&mut self, key: K, value: V) {
        let mut link = &mut self.root;
        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Less => link = &mut node.left,
                Ordering::Greater => link = &mut node.right,
                Ordering::Equal => {
                    node.values.push(value);
                    self.value_count += 1;
                    return;
                }
            }
        }

        *link = Some(Box::new(Node::new(key, value)));
        self.key_count += 1;
        self.value_count += 1;
    }

    /// Exact-match lookup.
    ///
    /// Returns the values filed under `key` in insertion order, or an empty
    /// slice.
    pub fn search<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root.as_deref();
        while let Some(node) = cursor {
            match key.cmp(node.key.borrow()) {
                Ordering::Less => cursor = node.left.as_deref(),
                Ordering::Greater => cursor = node.right.as_deref(),
                Ordering::Equal => return &node.values,
            }
        }
        &[]
    }

    /// Remove the values under `key` for which `predicate` returns true.
    ///
    /// A node left without values is unlinked from the tree. Returns the
    /// removed values in their original order.
    pub fn remove_where<Q, F>(&mut self, key: &Q, mut predicate: F) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnMut(&V) -> bool,
    {
        let link = find_link(&mut self.root, key);
        let Some(node) = link.as_mut() else {
            return Vec::new();
        };

        let (removed, kept): (Vec<V>, Vec<V>) =
            std::mem::take(&mut node.values).into_iter().partition(|v| predicate(v));
        node.values = kept;

        self.value_count -= removed.len();
        if node.values.is_empty() {
            unlink(link);
            self.key_count -= 1;
        }
        removed
    }

    /// Verify BST ordering and that no node is empty
    pub fn check_invariants(&self, name: &'static str) -> IndexResult<()> {
        let mut previous: Option<&K> = None;
        let mut keys = 0usize;
        let mut values = 0usize;

        for (key, node_values) in self.iter() {
            if node_values.is_empty() {
                return Err(IndexError::corruption(
                    name,
                    format!("node #{} holds no records", keys),
                ));
            }
            if previous.is_some_and(|prev| prev >= key) {
                return Err(IndexError::corruption(
                    name,
                    format!("in-order key #{} breaks search tree ordering", keys),
                ));
            }
            previous = Some(key);
            keys += 1;
            values += node_values.len();
        }

        if keys != self.key_count || values != self.value_count {
            return Err(IndexError::corruption(
                name,
                format!(
                    "counted {} keys / {} values, expected {} / {}",
                    keys, values, self.key_count, self.value_count
                ),
            ));
        }
        Ok(())
    }
}

impl<K: Ord + Clone, V> OrderedMultiIndex<K, V> {
    /// Remove every value matching `predicate`, whatever key it is filed under.
    ///
    /// Visits all nodes. Returns the number of removed values.
    pub fn remove_all_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let keys: Vec<K> = self
            .iter()
            .filter(|(_, values)| values.iter().any(&mut predicate))
            .map(|(key, _)| key.clone())
            .collect();

        keys.iter()
            .map(|key| self.remove_where(key, &mut predicate).len())
            .sum()
    }
}

impl<K: AsRef<str>, V> OrderedMultiIndex<K, V> {
    /// Case-insensitive prefix scan.
    ///
    /// Every node is inspected: case folding does not preserve the tree's
    /// ordering, so no subtree can be skipped. Matches are returned node by
    /// node in key order, each node's values in insertion order. An empty
    /// prefix returns every value.
    pub fn search_by_prefix(&self, prefix: &str) -> Vec<&V> {
        let prefix: Vec<char> = prefix.chars().flat_map(char::to_lowercase).collect();

        let mut results: Vec<&V> = Vec::new();
        for (key, values) in self.iter() {
            if starts_with_ignore_case(key.as_ref(), &prefix) {
                results.extend(values);
            }
        }
        results
    }
}

impl<K, V> Default for OrderedMultiIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for OrderedMultiIndex<K, V> {
    fn drop(&mut self) {
        // Boxed children would otherwise be dropped recursively
        self.clear();
    }
}

/// In-order iterator over an [`OrderedMultiIndex`]
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left_spine(&mut self, mut cursor: Option<&'a Node<K, V>>) {
        while let Some(node) = cursor {
            self.stack.push(node);
            cursor = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a [V]);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some((&node.key, node.values.as_slice()))
    }
}

fn starts_with_ignore_case(key: &str, lowered_prefix: &[char]) -> bool {
    let mut key_chars = key.chars().flat_map(char::to_lowercase);
    lowered_prefix.iter().all(|c| key_chars.next() == Some(*c))
}

/// Returns the link holding `key`, or the empty link where it would go
fn find_link<'a, K, V, Q>(root: &'a mut Link<K, V>, key: &Q) -> &'a mut Link<K, V>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let mut link = root;
    loop {
        let ordering = match link.as_deref() {
            Some(node) => key.cmp(node.key.borrow()),
            None => return link,
        };
        match ordering {
            Ordering::Equal => return link,
            Ordering::Less => {
                if let Some(node) = link {
                    link = &mut node.left;
                }
            }
            Ordering::Greater => {
                if let Some(node) = link {
                    link = &mut node.right;
                }
            }
        }
    }
}

/// Unlink the node at `link`, keeping the search order of its subtrees
fn unlink<K, V>(link: &mut Link<K, V>) {
    let Some(node) = link else {
        return;
    };

    if node.left.is_some() && node.right.is_some() {
        // Replace the node's contents with its in-order successor
        if let Some(successor) = take_min(&mut node.right) {
            let Node { key, values, .. } = *successor;
            node.key = key;
            node.values = values;
        }
        return;
    }

    let child = node.left.take().or_else(|| node.right.take());
    *link = child;
}

/// Detach the smallest node of a subtree, splicing its right child in its place
fn take_min<K, V>(subtree: &mut Link<K, V>) -> Link<K, V> {
    let mut link = subtree;
    while link.as_ref().is_some_and(|node| node.left.is_some()) {
        if let Some(node) = link {
            link = &mut node.left;
        }
    }

    let mut min = link.take()?;
    *link = min.right.take();
    Some(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<V>(index: &OrderedMultiIndex<String, V>) -> Vec<&str> {
        index.iter().map(|(key, _)| key.as_str()).collect()
    }

    #[test]
    fn test_exact_search() {
        let mut index = OrderedMultiIndex::new();
        index.insert("advanced programming".to_string(), 1);
        index.insert("data structures".to_string(), 2);

        assert_eq!(index.search("advanced programming"), &[1]);
        assert_eq!(index.search("data structures"), &[2]);
        assert!(index.search("missing").is_empty());
    }

    #[test]
    fn test_duplicates_share_a_node() {
        let mut index = OrderedMultiIndex::new();
        index.insert("fiction".to_string(), 3);
        index.insert("history".to_string(), 1);
        index.insert("fiction".to_string(), 1);
        index.insert("fiction".to_string(), 2);

        assert_eq!(index.search("fiction"), &[3, 1, 2]);
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.value_count(), 4);
    }

    #[test]
    fn test_prefix_search() {
        let mut index = OrderedMultiIndex::new();
        index.insert("data structures".to_string(), 1);
        index.insert("database design".to_string(), 2);
        index.insert("algorithms".to_string(), 3);

        let mut found: Vec<i32> = index.search_by_prefix("data").into_iter().copied().collect();
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        assert!(index.search_by_prefix("base").is_empty());
        assert!(index.search_by_prefix("structures").is_empty());
    }

    #[test]
    fn test_prefix_search_ignores_case() {
        let mut index = OrderedMultiIndex::new();
        index.insert("Data Structures".to_string(), 1);
        index.insert("zebra".to_string(), 2);

        assert_eq!(index.search_by_prefix("DATA s"), vec![&1]);
        assert_eq!(index.search_by_prefix("ZE"), vec![&2]);
    }

    #[test]
    fn test_empty_prefix_returns_everything() {
        let mut index = OrderedMultiIndex::new();
        for (i, key) in ["m", "c", "x", "a", "c", "z"].iter().enumerate() {
            index.insert(key.to_string(), i);
        }

        assert_eq!(index.search_by_prefix("").len(), 6);
        assert_eq!(index.search_by_prefix("").len(), index.value_count());
    }

    #[test]
    fn test_prefix_results_grouped_in_key_order() {
        let mut index = OrderedMultiIndex::new();
        index.insert("tolkien".to_string(), "b");
        index.insert("tolstoy".to_string(), "c");
        index.insert("tol".to_string(), "a");
        index.insert("tolkien".to_string(), "b2");

        assert_eq!(index.search_by_prefix("tol"), vec![&"a", &"b", &"b2", &"c"]);
    }

    #[test]
    fn test_prefix_covers_exact_match_of_full_key() {
        let mut index = OrderedMultiIndex::new();
        for (key, value) in [
            ("dune messiah", 4),
            ("du", 1),
            ("dune", 2),
            ("duma key", 5),
            ("dune", 3),
            ("emma", 6),
        ] {
            index.insert(key.to_string(), value);
        }

        for key in ["du", "dune", "dune messiah", "duma key", "emma"] {
            let exact = index.search(key);
            let prefixed = index.search_by_prefix(key);
            for value in exact {
                assert!(prefixed.contains(&value), "{} lost {}", key, value);
            }
        }

        // Longer keys extend the prefix result beyond the exact one
        assert_eq!(index.search("du"), &[1]);
        assert_eq!(index.search_by_prefix("du").len(), 5);
        assert_eq!(index.search("dune"), &[2, 3]);
        assert_eq!(index.search_by_prefix("dune"), vec![&2, &3, &4]);
        // A key with no extension matches exactly
        assert_eq!(index.search_by_prefix("dune messiah"), vec![&4]);
    }

    #[test]
    fn test_empty_index() {
        let index: OrderedMultiIndex<String, u32> = OrderedMultiIndex::new();
        assert!(index.search("anything").is_empty());
        assert!(index.search_by_prefix("").is_empty());
        assert_eq!(index.depth(), 0);
        index.check_invariants("empty").unwrap();
    }

    #[test]
    fn test_in_order_iteration_sorted() {
        let mut index = OrderedMultiIndex::new();
        for key in ["m", "c", "x", "a", "e", "w", "z"] {
            index.insert(key.to_string(), ());
        }
        assert_eq!(keys(&index), vec!["a", "c", "e", "m", "w", "x", "z"]);
        assert_eq!(index.depth(), 3);
    }

    #[test]
    fn test_remove_value_keeps_node() {
        let mut index = OrderedMultiIndex::new();
        index.insert("fiction".to_string(), 1);
        index.insert("fiction".to_string(), 2);

        assert_eq!(index.remove_where("fiction", |v| *v == 1), vec![1]);
        assert_eq!(index.search("fiction"), &[2]);
        assert_eq!(index.key_count(), 1);
        index.check_invariants("genre").unwrap();
    }

    #[test]
    fn test_remove_unlinks_emptied_nodes() {
        let mut index = OrderedMultiIndex::new();
        for key in ["m", "c", "x", "a", "e", "w", "z", "d"] {
            index.insert(key.to_string(), key.to_string());
        }

        // leaf, node with one child, node with two children, root
        for key in ["a", "e", "x", "m"] {
            let removed = index.remove_where(key, |_| true);
            assert_eq!(removed, vec![key.to_string()]);
            index.check_invariants("test").unwrap();
        }

        assert_eq!(keys(&index), vec!["c", "d", "w", "z"]);
        assert_eq!(index.key_count(), 4);
        assert!(index.search("m").is_empty());
        assert_eq!(index.search("d"), &["d".to_string()]);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut index = OrderedMultiIndex::new();
        index.insert("a".to_string(), 1);

        assert!(index.remove_where("b", |_| true).is_empty());
        assert!(index.remove_where("a", |v| *v == 2).is_empty());
        assert_eq!(index.value_count(), 1);
    }

    #[test]
    fn test_remove_all_where_sweeps_every_node() {
        let mut index = OrderedMultiIndex::new();
        index.insert("b".to_string(), 7);
        index.insert("a".to_string(), 7);
        index.insert("a".to_string(), 8);
        index.insert("c".to_string(), 9);

        assert_eq!(index.remove_all_where(|v| *v == 7), 2);
        assert_eq!(keys(&index), vec!["a", "c"]);
        assert_eq!(index.search("a"), &[8]);
        index.check_invariants("test").unwrap();
    }

    #[test]
    fn test_degenerate_tree_does_not_overflow() {
        let mut index = OrderedMultiIndex::new();
        for i in 0..10_000u32 {
            index.insert(format!("{:06}", i), i);
        }

        assert_eq!(index.depth(), 10_000);
        assert_eq!(index.search("009999"), &[9_999]);
        assert_eq!(index.search_by_prefix("00999").len(), 10);
        index.check_invariants("sorted").unwrap();
        drop(index);
    }
}
