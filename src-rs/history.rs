use std::collections::VecDeque;

use image::RgbaImage;

use crate::layers::LayerStack;

pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// Pixel buffer and layer collection captured together before a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub pixels: RgbaImage,
    pub layers: LayerStack,
}

/// Bounded undo stack. Overflow drops the oldest entry; there is no redo.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layers::{Layer, LayerId};

    fn snapshot(tag: u64) -> Snapshot {
        let mut layers = LayerStack::new();
        layers.append(Layer::blur(LayerId(tag), Rect::new(0.0, 0.0, 1.0, 1.0), 1.0));
        Snapshot {
            pixels: RgbaImage::new(1, 1),
            layers,
        }
    }

    #[test]
    fn drops_oldest_beyond_capacity() {
        let mut history = History::new(20);
        for i in 0..25 {
            history.push(snapshot(i));
        }
        assert_eq!(history.len(), 20);

        let mut pops = 0;
        let mut last_tag = None;
        while let Some(entry) = history.pop() {
            pops += 1;
            last_tag = entry.layers.last().map(Layer::id);
        }
        assert_eq!(pops, 20);
        assert_eq!(last_tag, Some(LayerId(5)));
    }

    #[test]
    fn pop_on_empty_is_none() {
        let mut history = History::default();
        assert!(history.pop().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn lifo_order() {
        let mut history = History::new(3);
        history.push(snapshot(1));
        history.push(snapshot(2));
        assert_eq!(history.peek().and_then(|s| s.layers.last()).map(Layer::id), Some(LayerId(2)));
        assert_eq!(history.pop().and_then(|s| s.layers.last().map(Layer::id)), Some(LayerId(2)));
        assert_eq!(history.pop().and_then(|s| s.layers.last().map(Layer::id)), Some(LayerId(1)));
    }
}
