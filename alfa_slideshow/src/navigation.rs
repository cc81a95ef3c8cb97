//! ALFA Slideshow - Navigation Engine
//!
//! Cyclic cursor over the item sequence. There is no first or last item:
//! stepping past either end wraps around.

/// Step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Signed step (+1 / -1)
    pub fn delta(&self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Indices around the cursor that should be ready for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecacheWindow {
    pub previous: usize,
    pub current: usize,
    pub next: usize,
}

impl PrecacheWindow {
    /// Distinct indices, current first
    pub fn indices(&self) -> Vec<usize> {
        let mut indices = vec![self.current];
        for index in [self.next, self.previous] {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        indices
    }
}

/// Cyclic cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEngine {
    /// Current index
    cursor: usize,
    /// Number of items (never zero)
    len: usize,
}

impl NavigationEngine {
    /// Cursor over `len` items starting at `start` (clamped)
    pub fn new(len: usize, start: usize) -> Self {
        let len = len.max(1);
        Self {
            cursor: start.min(len - 1),
            len,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Move one step, wrapping at both ends
    pub fn advance(&mut self, direction: Direction) -> usize {
        let len = self.len as i64;
        self.cursor = ((self.cursor as i64 + direction.delta() + len) % len) as usize;
        self.cursor
    }

    /// Land on an index without transition (after removal)
    pub fn jump_to(&mut self, index: usize) -> usize {
        self.cursor = index.min(self.len - 1);
        self.cursor
    }

    /// Shrink or grow the sequence, keeping the cursor in range
    pub fn resize(&mut self, len: usize) {
        self.len = len.max(1);
        self.cursor = self.cursor.min(self.len - 1);
    }

    /// {cursor-1, cursor, cursor+1} mod n
    pub fn precache_window(&self) -> PrecacheWindow {
        PrecacheWindow {
            previous: (self.cursor + self.len - 1) % self.len,
            current: self.cursor,
            next: (self.cursor + 1) % self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_then_back() {
        for len in 2..10 {
            for start in 0..len {
                let mut nav = NavigationEngine::new(len, start);
                nav.advance(Direction::Forward);
                nav.advance(Direction::Backward);
                assert_eq!(nav.cursor(), start);
            }
        }
    }

    #[test]
    fn test_cyclic_closure() {
        for len in 1..10 {
            for start in 0..len {
                let mut nav = NavigationEngine::new(len, start);
                for _ in 0..len {
                    nav.advance(Direction::Forward);
                }
                assert_eq!(nav.cursor(), start, "len={} start={}", len, start);
            }
        }
    }

    #[test]
    fn test_three_items_scenario() {
        let mut nav = NavigationEngine::new(3, 0);
        assert_eq!(nav.advance(Direction::Forward), 1);
        assert_eq!(nav.advance(Direction::Forward), 2);
        assert_eq!(nav.advance(Direction::Forward), 0);
        assert_eq!(nav.advance(Direction::Backward), 2);
    }

    #[test]
    fn test_single_item_is_idempotent() {
        let mut nav = NavigationEngine::new(1, 0);
        assert_eq!(nav.advance(Direction::Forward), 0);
        assert_eq!(nav.advance(Direction::Backward), 0);
        assert_eq!(nav.precache_window().indices(), vec![0]);
    }

    #[test]
    fn test_window() {
        let nav = NavigationEngine::new(5, 0);
        let window = nav.precache_window();
        assert_eq!(window, PrecacheWindow { previous: 4, current: 0, next: 1 });
        assert_eq!(window.indices(), vec![0, 1, 4]);

        let pair = NavigationEngine::new(2, 1).precache_window();
        assert_eq!(pair.indices(), vec![1, 0]);
    }

    #[test]
    fn test_jump_and_resize() {
        let mut nav = NavigationEngine::new(4, 3);
        nav.resize(3);
        assert_eq!(nav.cursor(), 2);
        assert_eq!(nav.jump_to(1), 1);
        assert_eq!(nav.jump_to(9), 2);
    }
}
