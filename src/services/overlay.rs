//! Overlay renderer: paints detection boxes onto a copy of the source image.
//!
//! Outline strokes keep the historical geometry: the right and bottom strokes
//! sit just outside the box and the right stroke runs two pixels past the
//! bottom edge. Every painted rectangle is clamped to the image bounds first.

use image::Rgba;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::constants::{REDACTION_COLOR, STROKE_WIDTH};
use crate::services::codec::PixelBuffer;
use crate::services::detection::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    /// Hollow 2px border per box.
    #[default]
    Outline,
    /// Whole box painted opaque.
    SolidFill,
}

/// Half-open pixel span `[x0, x1) x [y0, y1)` in signed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Span {
    fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Intersect with `[0, width) x [0, height)`. `None` when nothing is left.
    fn clamp(self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x0.clamp(0, width as i64);
        let y0 = self.y0.clamp(0, height as i64);
        let x1 = self.x1.clamp(0, width as i64);
        let y1 = self.y1.clamp(0, height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32))
    }
}

fn outline_strokes(b: &BoundingBox) -> [Span; 4] {
    let w = STROKE_WIDTH;
    [
        // top
        Span::new(b.x1, b.y1, b.x2, b.y1.saturating_add(w)),
        // right, extends past the bottom edge
        Span::new(b.x2, b.y1, b.x2.saturating_add(w), b.y2.saturating_add(w)),
        // bottom
        Span::new(b.x1, b.y2, b.x2, b.y2.saturating_add(w)),
        // left
        Span::new(b.x1, b.y1, b.x1.saturating_add(w), b.y2),
    ]
}

fn spans_for(b: &BoundingBox, mode: OverlayMode) -> Vec<Span> {
    match mode {
        OverlayMode::SolidFill => vec![Span::new(b.x1, b.y1, b.x2, b.y2)],
        OverlayMode::Outline => outline_strokes(b).to_vec(),
    }
}

/// Render `boxes` onto a copy of `source`.
///
/// Boxes are drawn in order and later boxes overwrite earlier ones. Inverted
/// boxes (`x2 < x1` or `y2 < y1`) are skipped.
pub fn render(source: &PixelBuffer, boxes: &[BoundingBox], mode: OverlayMode) -> PixelBuffer {
    let mut canvas = source.clone();
    let (width, height) = canvas.dimensions();
    let color = Rgba(REDACTION_COLOR);

    for b in boxes {
        if b.x2 < b.x1 || b.y2 < b.y1 {
            log::debug!("[overlay] Skipping inverted box {:?}", b);
            continue;
        }

        for span in spans_for(b, mode) {
            if let Some(rect) = span.clamp(width, height) {
                draw_filled_rect_mut(&mut canvas, rect, color);
            }
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba(REDACTION_COLOR);

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 251) as u8, (y * 11 % 251) as u8, 90, 255])
        })
    }

    fn in_span(x: u32, y: u32, s: &Span) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= s.x0 && x < s.x1 && y >= s.y0 && y < s.y1
    }

    #[test]
    fn solid_fill_paints_exactly_the_box() {
        let source = gradient(40, 30);
        let b = BoundingBox::new(5, 4, 17, 20);
        let out = render(&source, &[b], OverlayMode::SolidFill);

        for (x, y, px) in out.enumerate_pixels() {
            let inside = (5..17).contains(&x) && (4..20).contains(&y);
            if inside {
                assert_eq!(*px, RED, "({x},{y}) not painted");
            } else {
                assert_eq!(px, source.get_pixel(x, y), "({x},{y}) changed");
            }
        }
    }

    #[test]
    fn outline_paints_strokes_and_keeps_interior() {
        let source = gradient(40, 40);
        let b = BoundingBox::new(6, 8, 20, 25);
        let out = render(&source, &[b], OverlayMode::Outline);
        let strokes = outline_strokes(&b);

        for (x, y, px) in out.enumerate_pixels() {
            if strokes.iter().any(|s| in_span(x, y, s)) {
                assert_eq!(*px, RED, "stroke pixel ({x},{y}) not painted");
            } else {
                assert_eq!(px, source.get_pixel(x, y), "({x},{y}) changed");
            }
        }

        // interior strictly inside the border
        for y in 10..23 {
            for x in 8..18 {
                assert_eq!(out.get_pixel(x, y), source.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn outline_extends_past_right_and_bottom_edges() {
        let source = gradient(30, 30);
        let out = render(&source, &[BoundingBox::new(2, 2, 10, 10)], OverlayMode::Outline);

        assert_eq!(*out.get_pixel(11, 11), RED);
        assert_eq!(*out.get_pixel(10, 2), RED);
        assert_eq!(*out.get_pixel(2, 11), RED);
        // bottom stroke ends at x2, the right stroke covers the corner
        assert_eq!(out.get_pixel(12, 11), source.get_pixel(12, 11));
    }

    #[test]
    fn later_boxes_overwrite_earlier_ones() {
        let source = gradient(20, 20);
        let boxes = [BoundingBox::new(0, 0, 10, 10), BoundingBox::new(5, 5, 15, 15)];
        let out = render(&source, &boxes, OverlayMode::SolidFill);

        assert_eq!(*out.get_pixel(7, 7), RED);
        assert_eq!(*out.get_pixel(14, 14), RED);
        assert_eq!(out.get_pixel(17, 2), source.get_pixel(17, 2));
    }

    #[test]
    fn out_of_bounds_boxes_are_clamped() {
        let source = gradient(10, 10);
        let boxes = [
            BoundingBox::new(-5, -5, 3, 3),
            BoundingBox::new(8, 8, 500, 500),
            BoundingBox::new(50, 50, 60, 60),
        ];

        let filled = render(&source, &boxes, OverlayMode::SolidFill);
        assert_eq!(*filled.get_pixel(0, 0), RED);
        assert_eq!(*filled.get_pixel(2, 2), RED);
        assert_eq!(*filled.get_pixel(9, 9), RED);
        assert_eq!(filled.get_pixel(5, 5), source.get_pixel(5, 5));

        let outlined = render(&source, &boxes, OverlayMode::Outline);
        assert_eq!(outlined.dimensions(), (10, 10));
        assert_eq!(*outlined.get_pixel(9, 8), RED);
    }

    #[test]
    fn extreme_coordinates_are_clamped_without_overflow() {
        let source = gradient(10, 10);
        let huge = BoundingBox::new(0, 0, i64::MAX, i64::MAX);
        let span_all = BoundingBox::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX);
        let far_off = BoundingBox::new(i64::MIN, i64::MIN, i64::MIN, i64::MIN);

        let outlined = render(&source, &[huge], OverlayMode::Outline);
        assert_eq!(*outlined.get_pixel(5, 0), RED);
        assert_eq!(*outlined.get_pixel(0, 5), RED);
        assert_eq!(outlined.get_pixel(5, 5), source.get_pixel(5, 5));

        // every stroke of this box lies outside the image
        let outlined = render(&source, &[span_all, far_off], OverlayMode::Outline);
        assert_eq!(outlined.as_raw(), source.as_raw());

        let filled = render(&source, &[span_all], OverlayMode::SolidFill);
        assert!(filled.pixels().all(|px| *px == RED));

        let filled = render(&source, &[far_off], OverlayMode::SolidFill);
        assert_eq!(filled.as_raw(), source.as_raw());
    }

    #[test]
    fn inverted_and_empty_boxes_draw_nothing() {
        let source = gradient(12, 12);
        let boxes = [BoundingBox::new(8, 2, 3, 9), BoundingBox::new(4, 4, 4, 4)];

        let filled = render(&source, &boxes, OverlayMode::SolidFill);
        assert_eq!(filled.as_raw(), source.as_raw());

        let outlined = render(&source, &boxes[..1], OverlayMode::Outline);
        assert_eq!(outlined.as_raw(), source.as_raw());
    }

    #[test]
    fn source_buffer_is_untouched() {
        let source = gradient(8, 8);
        let before = source.clone();
        let _ = render(&source, &[BoundingBox::new(0, 0, 8, 8)], OverlayMode::SolidFill);
        assert_eq!(source.as_raw(), before.as_raw());
    }
}
