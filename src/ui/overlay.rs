use image::{Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};

use super::ui_types::{Color, Point, RegionKind};

pub const REGION_STROKE: u32 = 10;
pub const ROI_HANDLE_RADIUS: u32 = 30;
pub const ROI_GRID_STROKE: u32 = 3;
pub const DETECTION_STROKE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOp {
    /// Wipe the layer to transparent.
    Clear,
    /// Corners are inclusive and may be given in any order.
    StrokeRect {
        from: Point,
        to: Point,
        color: Color,
        width: u32,
    },
    FillCircle {
        center: Point,
        radius: u32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: u32,
    },
}

/// Paint operations for one annotation rectangle, in display space.
pub fn region_ops(kind: RegionKind, start: Point, end: Point) -> Vec<DrawOp> {
    match kind {
        RegionKind::Roi => roi_ops(start, end),
        RegionKind::Banner => vec![DrawOp::StrokeRect {
            from: start,
            to: end,
            color: Color::Red,
            width: REGION_STROKE,
        }],
        RegionKind::Target => vec![DrawOp::StrokeRect {
            from: start,
            to: end,
            color: Color::Yellow,
            width: REGION_STROKE,
        }],
    }
}

/// Outline, a handle on each corner, and a rule-of-thirds grid.
fn roi_ops(start: Point, end: Point) -> Vec<DrawOp> {
    let color = Color::White;
    let dx = end.x - start.x;
    let dy = end.y - start.y;

    let mut ops = vec![DrawOp::StrokeRect {
        from: start,
        to: end,
        color,
        width: REGION_STROKE,
    }];

    for center in [
        start,
        end,
        Point::new(end.x, start.y),
        Point::new(start.x, end.y),
    ] {
        ops.push(DrawOp::FillCircle {
            center,
            radius: ROI_HANDLE_RADIUS,
            color,
        });
    }

    for k in 1..=2 {
        let y = start.y + dy / 3 * k;
        ops.push(DrawOp::Line {
            from: Point::new(start.x, y),
            to: Point::new(end.x, y),
            color,
            width: ROI_GRID_STROKE,
        });
    }
    for k in 1..=2 {
        let x = start.x + dx / 3 * k;
        ops.push(DrawOp::Line {
            from: Point::new(x, start.y),
            to: Point::new(x, end.y),
            color,
            width: ROI_GRID_STROKE,
        });
    }

    ops
}

/// A detection box given as origin and size, outlined on its inclusive bounds.
pub fn detection_box_op(x: i32, y: i32, width: i32, height: i32) -> DrawOp {
    DrawOp::StrokeRect {
        from: Point::new(x, y),
        to: Point::new(x + width - 1, y + height - 1),
        color: Color::Red,
        width: DETECTION_STROKE,
    }
}

/// Renders paint operations onto an RGBA layer, clipped to its bounds.
pub fn rasterize(ops: &[DrawOp], layer: &mut RgbaImage) {
    for op in ops {
        match *op {
            DrawOp::Clear => {
                for p in layer.pixels_mut() {
                    *p = Rgba([0, 0, 0, 0]);
                }
            }
            DrawOp::StrokeRect {
                from,
                to,
                color,
                width,
            } => {
                let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
                let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
                let c = Rgba(color.rgba());

                if width <= 1 {
                    let rect = Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
                    draw_hollow_rect_mut(layer, rect, c);
                    continue;
                }

                let (lo, hi) = band(width);
                fill_band(layer, (x0 - lo, y0 - lo), (x1 + hi, y0 + hi), c);
                fill_band(layer, (x0 - lo, y1 - lo), (x1 + hi, y1 + hi), c);
                fill_band(layer, (x0 - lo, y0 - lo), (x0 + hi, y1 + hi), c);
                fill_band(layer, (x1 - lo, y0 - lo), (x1 + hi, y1 + hi), c);
            }
            DrawOp::FillCircle {
                center,
                radius,
                color,
            } => {
                draw_filled_circle_mut(layer, (center.x, center.y), radius as i32, Rgba(color.rgba()));
            }
            DrawOp::Line {
                from,
                to,
                color,
                width,
            } => {
                let (lo, hi) = band(width);
                let c = Rgba(color.rgba());

                if from.x == to.x || from.y == to.y {
                    let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
                    let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
                    fill_band(layer, (x0 - lo, y0 - lo), (x1 + hi, y1 + hi), c);
                    continue;
                }

                /// offset copies across the minor axis
                let steep = (to.y - from.y).abs() > (to.x - from.x).abs();
                for d in -lo..=hi {
                    let (ox, oy) = if steep { (d, 0) } else { (0, d) };
                    draw_line_segment_mut(
                        layer,
                        ((from.x + ox) as f32, (from.y + oy) as f32),
                        ((to.x + ox) as f32, (to.y + oy) as f32),
                        c,
                    );
                }
            }
        }
    }
}

/// Pixels on each side of a centre line for a stroke of `width`.
fn band(width: u32) -> (i32, i32) {
    let width = width.max(1) as i32;
    let lo = width / 2;
    (lo, width - lo - 1)
}

/// Filled rectangle between two inclusive corners, `min <= max` on both axes.
fn fill_band(layer: &mut RgbaImage, min: (i32, i32), max: (i32, i32), c: Rgba<u8>) {
    let rect = Rect::at(min.0, min.1).of_size((max.0 - min.0 + 1) as u32, (max.1 - min.1 + 1) as u32);
    draw_filled_rect_mut(layer, rect, c);
}
