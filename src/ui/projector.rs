use super::ui_types::{Point, Size};

/// Maps points from a view (touch/display pixels) onto a bitmap's pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Projector {
    pub view: Size,
    pub bitmap: Size,
}

impl Projector {
    pub fn new(view: Size, bitmap: Size) -> Self {
        Self { view, bitmap }
    }

    /// (bitmap / view) per axis, applied independently.
    pub fn scale_factors(&self) -> (f64, f64) {
        (
            self.bitmap.width as f64 / self.view.width as f64,
            self.bitmap.height as f64 / self.view.height as f64,
        )
    }

    /// `None` when the point lies outside `[0, view.width] x [0, view.height]`.
    pub fn project(&self, p: Point) -> Option<Point> {
        if self.view.width == 0 || self.view.height == 0 {
            return None;
        }
        if p.x < 0 || p.y < 0 || p.x as u32 > self.view.width || p.y as u32 > self.view.height {
            return None;
        }

        let (sx, sy) = self.scale_factors();

        Some(Point::new(
            (p.x as f64 * sx).round() as i32,
            (p.y as f64 * sy).round() as i32,
        ))
    }
}
