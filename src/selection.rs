/// Current index into the listing plus its valid upper bound.
///
/// The index is always within `[0, bound]` while the listing is non-empty.
/// When the listing is empty the index stays at 0 and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    index: usize,
    count: usize,
}

impl SelectionTracker {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Highest valid index, or `None` for an empty listing.
    pub fn bound(&self) -> Option<usize> {
        self.count.checked_sub(1)
    }

    pub fn clamp_to(&mut self, count: usize) {
        self.count = count;
        match self.bound() {
            Some(bound) if self.index > bound => self.index = bound,
            Some(_) => {}
            None => self.index = 0,
        }
    }

    /// Moves by `delta`, saturating at both ends. Returns `true` if the index changed.
    pub fn move_by(&mut self, delta: isize) -> bool {
        let Some(bound) = self.bound() else {
            return false;
        };
        let before = self.index;
        self.index = if delta.is_negative() {
            self.index.saturating_sub(delta.unsigned_abs())
        } else {
            self.index.saturating_add(delta.unsigned_abs()).min(bound)
        };
        self.index != before
    }

    /// Sets the index directly. Out-of-range indices are rejected and leave it untouched.
    pub fn set(&mut self, index: usize) -> bool {
        match self.bound() {
            Some(bound) if index <= bound => {
                self.index = index;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_index_into_new_range() {
        let mut sel = SelectionTracker::default();
        sel.clamp_to(10);
        assert!(sel.set(8));
        sel.clamp_to(3);
        assert_eq!(sel.index(), 2);
        sel.clamp_to(0);
        assert_eq!(sel.index(), 0);
        assert!(sel.is_empty());
    }

    #[test]
    fn move_saturates_without_wrapping() {
        let mut sel = SelectionTracker::default();
        sel.clamp_to(3);
        assert!(sel.move_by(1));
        assert!(sel.move_by(1));
        assert!(!sel.move_by(1));
        assert!(!sel.move_by(1));
        assert_eq!(sel.index(), 2);

        assert!(sel.move_by(-1));
        assert!(sel.move_by(-1));
        assert!(!sel.move_by(-1));
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn move_on_empty_listing_is_noop() {
        let mut sel = SelectionTracker::default();
        assert!(!sel.move_by(1));
        assert!(!sel.move_by(-1));
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn set_rejects_out_of_range() {
        let mut sel = SelectionTracker::default();
        assert!(!sel.set(0));
        sel.clamp_to(2);
        assert!(sel.set(1));
        assert!(!sel.set(2));
        assert_eq!(sel.index(), 1);
    }

    #[test]
    fn index_stays_in_range_for_any_sequence() {
        let mut sel = SelectionTracker::default();
        for count in [0usize, 1, 2, 5] {
            sel.clamp_to(count);
            for delta in [1isize, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1, -1, 3, -7] {
                sel.move_by(delta);
                match sel.bound() {
                    Some(bound) => assert!(sel.index() <= bound),
                    None => assert_eq!(sel.index(), 0),
                }
            }
        }
    }
}
