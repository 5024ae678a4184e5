//! Integer geometry primitives shared by the preprocessing stages.

use serde::{Deserialize, Serialize};

/// A point in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An axis-aligned rectangle in source pixel space.
///
/// The origin may be negative and the rectangle may extend outside the
/// source image; samples outside the source stay transparent black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_num_pixels() {
        assert_eq!(Size::new(4, 3).num_pixels(), 12);
        assert_eq!(Size::new(0, 100).num_pixels(), 0);
    }

    #[test]
    fn test_rect_accessors() {
        let rect = Rect::new(-5, 10, 20, 30);
        assert_eq!(rect.origin(), Point::new(-5, 10));
        assert_eq!(rect.size(), Size::new(20, 30));
    }
}
