//! Selection index bookkeeping for lists and tables
//!
//! Navigation clamps at the collection bounds (no wraparound) and the index
//! is re-clamped after every collection replacement so a shrinking refresh
//! result can never leave it dangling.

/// Selection index into a screen's entity collection.
///
/// For an empty collection the index stays 0; detail rendering must guard
/// with an explicit emptiness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    index: usize,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Move up one row; a no-op at index 0.
    pub fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Move down one row; a no-op at the last index.
    pub fn down(&mut self, len: usize) {
        if self.index + 1 < len {
            self.index += 1;
        }
    }

    /// Re-clamp after the collection was replaced.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.index = 0;
        } else if self.index >= len {
            self.index = len - 1;
        }
    }

    /// The selected element of `items`, if any.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_clamps_at_last_index() {
        let mut sel = Selection::new();
        for _ in 0..10 {
            sel.down(3);
        }
        assert_eq!(sel.index(), 2);
    }

    #[test]
    fn test_up_stays_at_zero() {
        let mut sel = Selection::new();
        sel.up();
        sel.up();
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_down_on_empty_is_noop() {
        let mut sel = Selection::new();
        sel.down(0);
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut sel = Selection::new();
        for _ in 0..5 {
            sel.down(6);
        }
        assert_eq!(sel.index(), 5);

        sel.clamp(3);
        assert_eq!(sel.index(), 2);

        sel.clamp(0);
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_pick() {
        let items = vec!["a", "b", "c"];
        let mut sel = Selection::new();
        sel.down(items.len());
        assert_eq!(sel.pick(&items), Some(&"b"));

        let empty: Vec<&str> = vec![];
        assert_eq!(sel.pick(&empty), None);
    }
}
