use std::collections::HashMap;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<char, usize>,
    // `Some` marks the node as the end of an inserted key.
    value: Option<String>,
}

/// Character trie with longest-prefix lookup.
///
/// Nodes live in a single arena (`Vec`) and refer to their children by index,
/// so the whole structure is one allocation tree owned by the trie. There is no
/// deletion: a dictionary is built once, then only read. Lookups take `&self`
/// and the type is `Sync`, so one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct PrefixTrie {
    nodes: Vec<TrieNode>,
    insert_count: usize,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        PrefixTrie {
            nodes: vec![TrieNode::default()],
            insert_count: 0,
        }
    }
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key` with `value`, overwriting any previous value for the same key.
    ///
    /// An empty key marks the root, which [`find_longest_prefix`](Self::find_longest_prefix)
    /// never reports, so it is accepted but has no effect on lookups.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let mut current = ROOT;
        for ch in key.chars() {
            current = match self.nodes[current].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children.insert(ch, child);
                    child
                }
            };
        }
        self.nodes[current].value = Some(value.into());
        // Counts calls, not distinct keys: re-inserting a key still increments.
        self.insert_count += 1;
    }

    /// Inserts every pair in order; a later duplicate key overwrites an earlier one.
    pub fn batch_insert<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.insert(key.as_ref(), value);
        }
    }

    /// Number of `insert` calls performed, overwrites included.
    #[inline]
    pub fn count(&self) -> usize {
        self.insert_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    // A trie rebuilt from de-duplicated snapshot entries takes back the insert
    // count of the source it was saved from.
    pub(crate) fn restore_count(&mut self, count: usize) {
        self.insert_count = self.insert_count.max(count);
    }

    /// Walks `text` from its first character and returns the longest prefix that
    /// ends on an inserted key, together with that key's value.
    ///
    /// The walk stops at the first character without an outgoing edge. The
    /// returned prefix is the last terminal seen on the way, which is not
    /// necessarily where the walk stopped. Without any terminal the result is
    /// `("", None)`.
    pub fn find_longest_prefix<'t, 's>(&'s self, text: &'t str) -> (&'t str, Option<&'s str>) {
        let mut current = ROOT;
        let mut longest = 0;
        let mut longest_value = None;

        for (idx, ch) in text.char_indices() {
            match self.nodes[current].children.get(&ch) {
                Some(&child) => current = child,
                None => break,
            }
            if let Some(value) = &self.nodes[current].value {
                longest = idx + ch.len_utf8();
                longest_value = Some(value.as_str());
            }
        }

        (&text[..longest], longest_value)
    }

    /// Exact lookup of a whole key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut current = ROOT;
        for ch in key.chars() {
            current = *self.nodes[current].children.get(&ch)?;
        }
        self.nodes[current].value.as_deref()
    }

    /// All stored `(key, value)` pairs, in depth-first order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut stack = vec![(ROOT, String::new())];

        while let Some((node, key)) = stack.pop() {
            if let Some(value) = &self.nodes[node].value {
                out.push((key.clone(), value.clone()));
            }
            for (&ch, &child) in &self.nodes[node].children {
                let mut child_key = key.clone();
                child_key.push(ch);
                stack.push((child, child_key));
            }
        }

        out
    }
}

impl<K, V> FromIterator<(K, V)> for PrefixTrie
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut trie = PrefixTrie::new();
        trie.batch_insert(iter);
        trie
    }
}
