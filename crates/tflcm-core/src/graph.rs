//! Undirected frame connectivity.
//!
//! Every stored (parent, child) pair, static or dynamic, contributes one
//! edge in both directions.  The graph is updated on ingestion and wiped on
//! `clear`; since the buffer never drops the last record of a pair, an edge
//! stays valid until then.  Neighbour sets are ordered so that breadth-first
//! search returns the same path for the same contents.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

#[derive(Debug, Default, Clone)]
pub(crate) struct FrameGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl FrameGraph {
    pub(crate) fn add_edge(&mut self, a: &str, b: &str) {
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub(crate) fn clear(&mut self) {
        self.adjacency.clear();
    }

    /// Every frame seen as a parent or child, sorted.
    pub(crate) fn frames(&self) -> impl Iterator<Item = &String> {
        self.adjacency.keys()
    }

    /// Whether any path links `source` and `target`.
    pub(crate) fn is_connected(&self, source: &str, target: &str) -> bool {
        if source == target {
            return true;
        }
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();
        queue.push_back(source);
        visited.insert(source);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            for next in self.neighbours(current) {
                if visited.insert(next.as_str()) {
                    queue.push_back(next.as_str());
                }
            }
        }
        false
    }

    /// Shortest edge path `source → … → target` as `(from, to)` hops.
    ///
    /// Returns `None` when the frames are disconnected, and an empty path
    /// when they are equal.
    pub(crate) fn shortest_path(&self, source: &str, target: &str) -> Option<Vec<(String, String)>> {
        if source == target {
            return Some(Vec::new());
        }
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut came_from: HashMap<&str, &str> = HashMap::new();
        queue.push_back(source);
        came_from.insert(source, source);

        let mut found = false;
        'search: while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                let next = next.as_str();
                if came_from.contains_key(next) {
                    continue;
                }
                came_from.insert(next, current);
                if next == target {
                    found = true;
                    break 'search;
                }
                queue.push_back(next);
            }
        }
        if !found {
            return None;
        }

        let mut path = Vec::new();
        let mut current = target;
        while current != source {
            let &prev = came_from.get(current)?;
            path.push((prev.to_string(), current.to_string()));
            current = prev;
        }
        path.reverse();
        Some(path)
    }

    fn neighbours(&self, frame: &str) -> impl Iterator<Item = &String> {
        self.adjacency.get(frame).into_iter().flatten()
    }
}
