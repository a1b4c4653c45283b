//! Tracks whether the slots have diverged from the inputs that produced the
//! currently displayed artifact.

/// Boolean dirty flag with explicit clean/dirty transitions.
///
/// Cleared when a generation succeeds and on every session reset; set by any
/// slot mutation after that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    dirty: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut tracker = DirtyTracker::new();
        assert!(!tracker.is_dirty());

        tracker.mark_dirty();
        tracker.mark_dirty();
        assert!(tracker.is_dirty());

        tracker.mark_clean();
        assert!(!tracker.is_dirty());
    }
}
