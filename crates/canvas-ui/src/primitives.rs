/// A 2D point in screen space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 2]> for Point {
    fn from(arr: [f32; 2]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
        }
    }
}

impl From<Point> for [f32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

impl From<Point> for glam::Vec2 {
    fn from(point: Point) -> Self {
        glam::Vec2::new(point.x, point.y)
    }
}

impl From<glam::Vec2> for Point {
    fn from(v: glam::Vec2) -> Self {
        Point::new(v.x, v.y)
    }
}

/// Axis-aligned rectangle defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Rect {
    pub const ZERO: Rect = Rect::new([0.0, 0.0], [0.0, 0.0]);

    pub const fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    pub fn from_min_size(min: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            min,
            max: [min[0] + size[0], min[1] + size[1]],
        }
    }

    pub fn from_center_size(center: Point, size: [f32; 2]) -> Self {
        Self::from_min_size(
            [center.x - size[0] * 0.5, center.y - size[1] * 0.5],
            size,
        )
    }

    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }

    pub fn size(&self) -> [f32; 2] {
        [self.width(), self.height()]
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        )
    }

    /// Check if a point is inside this rectangle (edges inclusive)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min[0]
            && point.x <= self.max[0]
            && point.y >= self.min[1]
            && point.y <= self.max[1]
    }

    /// Check if `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min[0] >= self.min[0]
            && other.min[1] >= self.min[1]
            && other.max[0] <= self.max[0]
            && other.max[1] <= self.max[1]
    }

    /// Get the intersection of this rect with another
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let min_x = self.min[0].max(other.min[0]);
        let min_y = self.min[1].max(other.min[1]);
        let max_x = self.max[0].min(other.max[0]);
        let max_y = self.max[1].min(other.max[1]);

        if min_x <= max_x && min_y <= max_y {
            Some(Rect {
                min: [min_x, min_y],
                max: [max_x, max_y],
            })
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersect(other).is_some()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    /// Grow by `amount` on every side (negative shrinks)
    pub fn expand(&self, amount: f32) -> Rect {
        Rect {
            min: [self.min[0] - amount, self.min[1] - amount],
            max: [self.max[0] + amount, self.max[1] + amount],
        }
    }

    pub fn shrink(&self, amount: f32) -> Rect {
        self.expand(-amount)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            min: [self.min[0] + dx, self.min[1] + dy],
            max: [self.max[0] + dx, self.max[1] + dy],
        }
    }

    pub fn min_point(&self) -> Point {
        Point::new(self.min[0], self.min[1])
    }

    pub fn max_point(&self) -> Point {
        Point::new(self.max[0], self.max[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new([0.0, 0.0], [100.0, 100.0]);
        assert!(outer.contains_rect(&Rect::new([10.0, 10.0], [90.0, 90.0])));
        assert!(outer.contains_rect(&outer));
        assert!(!outer.contains_rect(&Rect::new([50.0, 50.0], [150.0, 60.0])));
    }

    #[test]
    fn test_union_and_intersect() {
        let a = Rect::new([0.0, 0.0], [10.0, 10.0]);
        let b = Rect::new([5.0, 5.0], [20.0, 15.0]);
        assert_eq!(a.union(&b), Rect::new([0.0, 0.0], [20.0, 15.0]));
        assert_eq!(a.intersect(&b), Some(Rect::new([5.0, 5.0], [10.0, 10.0])));
        assert!(a.intersect(&Rect::new([11.0, 0.0], [12.0, 1.0])).is_none());
    }
}
