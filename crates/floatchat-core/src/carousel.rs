//! Which image each multi-image message is showing.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Displayed image index per message position. Entries are created lazily
/// and only change through [`CarouselStateManager::navigate`].
#[derive(Debug, Default)]
pub struct CarouselStateManager {
    indices: HashMap<usize, usize>,
}

impl CarouselStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self, position: usize) -> usize {
        self.indices.get(&position).copied().unwrap_or(0)
    }

    /// Create the zero entry for `position` if it has none yet
    pub fn ensure(&mut self, position: usize) -> usize {
        *self.indices.entry(position).or_insert(0)
    }

    #[cfg(test)]
    fn has_entry(&self, position: usize) -> bool {
        self.indices.contains_key(&position)
    }

    /// Step the carousel at `position` cyclically and record the new index.
    ///
    /// `total` is the number of images in that message; with one image or
    /// none there is nothing to navigate and the result is 0.
    pub fn navigate(&mut self, position: usize, direction: Direction, total: usize) -> usize {
        if total <= 1 {
            return 0;
        }

        let current = self.current_index(position) % total;
        let next = match direction {
            Direction::Next => (current + 1) % total,
            Direction::Prev => (current + total - 1) % total,
        };
        self.indices.insert(position, next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_zero() {
        let carousel = CarouselStateManager::new();
        assert_eq!(carousel.current_index(3), 0);
        assert!(!carousel.has_entry(3));
    }

    #[test]
    fn test_next_wraps_to_first() {
        let mut carousel = CarouselStateManager::new();
        for expected in [1, 2, 3] {
            assert_eq!(carousel.navigate(1, Direction::Next, 4), expected);
        }
        assert_eq!(carousel.current_index(1), 3);
        assert_eq!(carousel.navigate(1, Direction::Next, 4), 0);
    }

    #[test]
    fn test_prev_wraps_to_last() {
        let mut carousel = CarouselStateManager::new();
        assert_eq!(carousel.navigate(1, Direction::Prev, 4), 3);
        assert_eq!(carousel.navigate(1, Direction::Prev, 4), 2);
    }

    #[test]
    fn test_single_image_is_noop() {
        let mut carousel = CarouselStateManager::new();
        assert_eq!(carousel.navigate(0, Direction::Next, 1), 0);
        assert_eq!(carousel.navigate(0, Direction::Prev, 0), 0);
        assert!(!carousel.has_entry(0));
    }

    #[test]
    fn test_positions_are_independent() {
        let mut carousel = CarouselStateManager::new();
        carousel.ensure(1);
        carousel.ensure(3);
        carousel.navigate(3, Direction::Next, 2);

        assert_eq!(carousel.current_index(1), 0);
        assert_eq!(carousel.current_index(3), 1);
    }

    #[test]
    fn test_ensure_keeps_existing_index() {
        let mut carousel = CarouselStateManager::new();
        carousel.navigate(5, Direction::Next, 3);
        assert_eq!(carousel.ensure(5), 1);
    }
}
