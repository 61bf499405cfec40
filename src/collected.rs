use std::collections::HashSet;

/// Deduplicating set of collected result identifiers.
///
/// Membership and insertion are a single operation so callers never check
/// "already seen" separately from recording. Output order is first-seen
/// order, not set iteration order.
#[derive(Debug, Default)]
pub struct CollectedSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl CollectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier. Returns true iff it was not already present;
    /// a repeated identifier leaves the set untouched.
    pub fn add(&mut self, identifier: &str) -> bool {
        if self.seen.contains(identifier) {
            return false;
        }
        self.seen.insert(identifier.to_string());
        self.order.push(identifier.to_string());
        true
    }

    /// All collected identifiers in first-seen order.
    pub fn all(&self) -> &[String] {
        &self.order
    }

    /// Consume the set, yielding the ordered identifiers.
    pub fn into_all(self) -> Vec<String> {
        self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_returns_true_only_for_new_identifiers() {
        let mut set = CollectedSet::new();
        assert!(set.add("https://example.com/item/1"));
        assert!(!set.add("https://example.com/item/1"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn repeated_add_does_not_mutate() {
        let mut set = CollectedSet::new();
        set.add("a");
        set.add("b");
        set.add("a");
        set.add("a");
        assert_eq!(set.all(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn output_preserves_first_seen_order() {
        let mut set = CollectedSet::new();
        for id in ["c", "a", "b", "a", "c", "d"] {
            set.add(id);
        }
        let expected: Vec<String> = ["c", "a", "b", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(set.into_all(), expected);
    }
}
