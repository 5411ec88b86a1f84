//! Raw-layout visualization rendering.

use image::{DynamicImage, Rgba, RgbaImage};
use solstice_core::BoxLabel;

use crate::detector::RawDetection;

/// Border thickness in pixels.
const BORDER_PX: u32 = 3;

/// Label color for visualization borders.
const fn label_color(label: BoxLabel) -> Rgba<u8> {
    match label {
        BoxLabel::Text | BoxLabel::Paragraph => Rgba([46, 125, 50, 255]),
        BoxLabel::Title | BoxLabel::SectionHeader => Rgba([21, 101, 192, 255]),
        BoxLabel::List | BoxLabel::ListItem => Rgba([106, 27, 154, 255]),
        BoxLabel::Table => Rgba([230, 81, 0, 255]),
        BoxLabel::Figure => Rgba([183, 28, 28, 255]),
        _ => Rgba([97, 97, 97, 255]),
    }
}

/// Draw detection borders over a page raster.
#[must_use = "returns the annotated page image"]
pub fn annotate_page(page: &DynamicImage, detections: &[RawDetection]) -> RgbaImage {
    let mut canvas = page.to_rgba8();
    for det in detections {
        let color = label_color(det.label);
        let [x1, y1, x2, y2] = det.bbox;
        draw_rect(
            &mut canvas,
            x1.max(0.0) as u32,
            y1.max(0.0) as u32,
            x2.max(0.0) as u32,
            y2.max(0.0) as u32,
            color,
        );
    }
    canvas
}

fn draw_rect(canvas: &mut RgbaImage, x1: u32, y1: u32, x2: u32, y2: u32, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    let x2 = x2.min(w.saturating_sub(1));
    let y2 = y2.min(h.saturating_sub(1));
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    for t in 0..BORDER_PX {
        for x in x1..=x2 {
            if y1 + t < h {
                canvas.put_pixel(x, y1 + t, color);
            }
            if y2 >= t {
                canvas.put_pixel(x, y2 - t, color);
            }
        }
        for y in y1..=y2 {
            if x1 + t < w {
                canvas.put_pixel(x1 + t, y, color);
            }
            if x2 >= t {
                canvas.put_pixel(x2 - t, y, color);
            }
        }
    }
}
