//! Prefix trie keyed by name components.
//!
//! Each node corresponds to one name and holds a multiset of values in
//! insertion order. The same structure backs the FIB (longest prefix wins)
//! and the PIT (every ancestor of a Data name is satisfied).
//!
//! Traversals that mutate prune nodes left with no values and no children
//! on the way back up, so the trie never keeps empty branches around.

use crate::name::Name;
use std::collections::HashMap;

/// Result of [`PrefixTrie::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// The node had no values before this insertion.
    pub first_value: bool,
    /// The value was stored (false only for a duplicate in [`PrefixTrie::add_unique`]).
    pub value_added: bool,
}

#[derive(Debug)]
struct TrieNode<V> {
    children: HashMap<String, TrieNode<V>>,
    values: Vec<V>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<V> TrieNode<V> {
    fn is_vacant(&self) -> bool {
        self.children.is_empty() && self.values.is_empty()
    }

    fn descend_or_create(&mut self, name: &Name) -> &mut TrieNode<V> {
        let mut node = self;
        for component in name.components() {
            node = node.children.entry(component.clone()).or_default();
        }
        node
    }

    fn descend(&self, name: &Name) -> Option<&TrieNode<V>> {
        let mut node = self;
        for component in name.components() {
            node = node.children.get(component)?;
        }
        Some(node)
    }

    fn descend_mut(&mut self, name: &Name) -> Option<&mut TrieNode<V>> {
        let mut node = self;
        for component in name.components() {
            node = node.children.get_mut(component)?;
        }
        Some(node)
    }

    fn longest_match<'a, F>(&'a self, target: &Name, depth: usize, f: &mut F) -> bool
    where
        F: FnMut(&Name, &'a V),
    {
        if let Some(child) = target.get(depth).and_then(|c| self.children.get(c)) {
            if child.longest_match(target, depth + 1, f) {
                return true;
            }
        }
        if self.values.is_empty() {
            return false;
        }
        let prefix = target.prefix(depth);
        for value in &self.values {
            f(&prefix, value);
        }
        true
    }

    fn longest_match_mut<F>(&mut self, target: &Name, depth: usize, f: &mut F) -> bool
    where
        F: FnMut(&Name, &mut V),
    {
        if let Some(child) = target.get(depth).and_then(|c| self.children.get_mut(c)) {
            if child.longest_match_mut(target, depth + 1, f) {
                return true;
            }
        }
        if self.values.is_empty() {
            return false;
        }
        let prefix = target.prefix(depth);
        for value in &mut self.values {
            f(&prefix, value);
        }
        true
    }

    fn satisfied<F>(&mut self, target: &Name, depth: usize, f: &mut F)
    where
        F: FnMut(&Name, &mut V),
    {
        if let Some(child) = target.get(depth).and_then(|c| self.children.get_mut(c)) {
            child.satisfied(target, depth + 1, f);
        }
        if !self.values.is_empty() {
            let prefix = target.prefix(depth);
            for value in &mut self.values {
                f(&prefix, value);
            }
        }
    }

    fn retain_satisfied<F>(&mut self, target: &Name, depth: usize, f: &mut F)
    where
        F: FnMut(&Name, &mut V) -> bool,
    {
        if let Some(component) = target.get(depth) {
            if let Some(child) = self.children.get_mut(component) {
                child.retain_satisfied(target, depth + 1, f);
                if child.is_vacant() {
                    self.children.remove(component);
                }
            }
        }
        if !self.values.is_empty() {
            let prefix = target.prefix(depth);
            self.values.retain_mut(|value| f(&prefix, value));
        }
    }

    fn remove_satisfied<F>(&mut self, target: &Name, depth: usize, f: &mut F)
    where
        F: FnMut(&Name, V),
    {
        if let Some(component) = target.get(depth) {
            if let Some(child) = self.children.get_mut(component) {
                child.remove_satisfied(target, depth + 1, f);
                if child.is_vacant() {
                    self.children.remove(component);
                }
            }
        }
        if !self.values.is_empty() {
            let prefix = target.prefix(depth);
            for value in self.values.drain(..) {
                f(&prefix, value);
            }
        }
    }

    fn remove_subtree<F>(&mut self, target: &Name, depth: usize, f: &mut F)
    where
        F: FnMut(&Name, V),
    {
        match target.get(depth) {
            None => {
                let mut parts = target.components().to_vec();
                self.drain_all(&mut parts, f);
            }
            Some(component) => {
                if let Some(child) = self.children.get_mut(component) {
                    child.remove_subtree(target, depth + 1, f);
                    if child.is_vacant() {
                        self.children.remove(component);
                    }
                }
            }
        }
    }

    fn retain_exact<F>(&mut self, target: &Name, depth: usize, f: &mut F)
    where
        F: FnMut(&mut V) -> bool,
    {
        match target.get(depth) {
            None => self.values.retain_mut(|value| f(value)),
            Some(component) => {
                if let Some(child) = self.children.get_mut(component) {
                    child.retain_exact(target, depth + 1, f);
                    if child.is_vacant() {
                        self.children.remove(component);
                    }
                }
            }
        }
    }

    fn drain_all<F>(&mut self, parts: &mut Vec<String>, f: &mut F)
    where
        F: FnMut(&Name, V),
    {
        if !self.values.is_empty() {
            let name = Name::from_components(parts.iter().cloned());
            for value in self.values.drain(..) {
                f(&name, value);
            }
        }
        for (component, mut child) in self.children.drain() {
            parts.push(component);
            child.drain_all(parts, f);
            parts.pop();
        }
    }

    fn for_each_pair<'a, F>(&'a self, parts: &mut Vec<String>, f: &mut F)
    where
        F: FnMut(&Name, &'a V),
    {
        if !self.values.is_empty() {
            let name = Name::from_components(parts.iter().cloned());
            for value in &self.values {
                f(&name, value);
            }
        }
        for (component, child) in &self.children {
            parts.push(component.clone());
            child.for_each_pair(parts, f);
            parts.pop();
        }
    }

    fn for_each_value<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a V),
    {
        for value in &self.values {
            f(value);
        }
        for child in self.children.values() {
            child.for_each_value(f);
        }
    }

    fn count(&self) -> usize {
        self.values.len() + self.children.values().map(TrieNode::count).sum::<usize>()
    }
}

/// A mapping from names to value multisets with prefix-aware traversals.
#[derive(Debug)]
pub struct PrefixTrie<V> {
    root: TrieNode<V>,
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PrefixTrie<V> {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
        }
    }

    /// Stores `value` at `name`, creating intermediate nodes as needed.
    pub fn add(&mut self, name: &Name, value: V) -> AddOutcome {
        let node = self.root.descend_or_create(name);
        node.values.push(value);
        AddOutcome {
            first_value: node.values.len() == 1,
            value_added: true,
        }
    }

    /// Like [`add`](Self::add), but skips values already present at `name`.
    pub fn add_unique(&mut self, name: &Name, value: V) -> AddOutcome
    where
        V: PartialEq,
    {
        let node = self.root.descend_or_create(name);
        if node.values.contains(&value) {
            return AddOutcome {
                first_value: false,
                value_added: false,
            };
        }
        node.values.push(value);
        AddOutcome {
            first_value: node.values.len() == 1,
            value_added: true,
        }
    }

    /// Returns the first value at exactly `name`, creating it with `factory` if absent.
    pub fn lookup_or_create<F>(&mut self, name: &Name, factory: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let node = self.root.descend_or_create(name);
        if node.values.is_empty() {
            node.values.push(factory());
        }
        &mut node.values[0]
    }

    /// Values stored at exactly `name`.
    pub fn get(&self, name: &Name) -> Option<&[V]> {
        self.root
            .descend(name)
            .map(|node| node.values.as_slice())
            .filter(|values| !values.is_empty())
    }

    /// Mutable values stored at exactly `name`.
    pub fn get_mut(&mut self, name: &Name) -> Option<&mut [V]> {
        self.root
            .descend_mut(name)
            .map(|node| node.values.as_mut_slice())
            .filter(|values| !values.is_empty())
    }

    /// Visits the values of the deepest node on `target`'s path that holds any.
    ///
    /// The visitor receives the matched prefix. Returns whether anything matched.
    pub fn for_each_longest_prefix_match<'a, F>(&'a self, target: &Name, mut f: F) -> bool
    where
        F: FnMut(&Name, &'a V),
    {
        self.root.longest_match(target, 0, &mut f)
    }

    /// Like [`for_each_longest_prefix_match`](Self::for_each_longest_prefix_match) without the name.
    pub fn for_each_longest_prefix_match_value<'a, F>(&'a self, target: &Name, mut f: F) -> bool
    where
        F: FnMut(&'a V),
    {
        self.root.longest_match(target, 0, &mut |_, value| f(value))
    }

    /// Mutable variant of [`for_each_longest_prefix_match`](Self::for_each_longest_prefix_match).
    pub fn for_each_longest_prefix_match_mut<F>(&mut self, target: &Name, mut f: F) -> bool
    where
        F: FnMut(&Name, &mut V),
    {
        self.root.longest_match_mut(target, 0, &mut f)
    }

    /// Visits the values at every node from `target` up to the root, deepest first.
    pub fn for_each_satisfied<F>(&mut self, target: &Name, mut f: F)
    where
        F: FnMut(&Name, &mut V),
    {
        self.root.satisfied(target, 0, &mut f)
    }

    /// Like [`for_each_satisfied`](Self::for_each_satisfied), dropping values the visitor rejects.
    pub fn retain_satisfied<F>(&mut self, target: &Name, mut f: F)
    where
        F: FnMut(&Name, &mut V) -> bool,
    {
        self.root.retain_satisfied(target, 0, &mut f)
    }

    /// Removes and visits the values at every node from `target` up to the root.
    pub fn remove_satisfied<F>(&mut self, target: &Name, mut f: F)
    where
        F: FnMut(&Name, V),
    {
        self.root.remove_satisfied(target, 0, &mut f)
    }

    /// Removes and visits every value stored at or below `target`.
    pub fn remove_exact_subtree<F>(&mut self, target: &Name, mut f: F)
    where
        F: FnMut(&Name, V),
    {
        self.root.remove_subtree(target, 0, &mut f)
    }

    /// Keeps only the values at exactly `name` that `f` accepts, pruning if none remain.
    pub fn retain_exact<F>(&mut self, name: &Name, mut f: F)
    where
        F: FnMut(&mut V) -> bool,
    {
        self.root.retain_exact(name, 0, &mut f)
    }

    /// Visits every name holding at least one value.
    pub fn for_each_name<F>(&self, mut f: F)
    where
        F: FnMut(&Name),
    {
        let mut last: Option<Name> = None;
        self.for_each_pair(|name, _| {
            if last.as_ref() != Some(name) {
                f(name);
                last = Some(name.clone());
            }
        });
    }

    /// Visits every value.
    pub fn for_each_value<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a V),
    {
        self.root.for_each_value(&mut f)
    }

    /// Visits every (name, value) pair, depth first.
    pub fn for_each_pair<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&Name, &'a V),
    {
        self.root.for_each_pair(&mut Vec::new(), &mut f)
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_vacant()
    }
}
