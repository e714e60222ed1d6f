use crate::types::{Rect, YoloRow};

/// Convert a normalized YOLO box to absolute corner form for an image of
/// `width` x `height` pixels. No clamping is applied.
pub fn yolo_to_corners(cx: f64, cy: f64, w: f64, h: f64, width: f64, height: f64) -> Rect {
    let cx = cx * width;
    let cy = cy * height;
    let w = w * width;
    let h = h * height;

    Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
}

/// Convert absolute corners back to normalized `(cx, cy, w, h)`.
pub fn corners_to_yolo(rect: &Rect, width: f64, height: f64) -> (f64, f64, f64, f64) {
    let box_width = rect.xmax - rect.xmin;
    let box_height = rect.ymax - rect.ymin;
    let x_center = (rect.xmin + rect.xmax) / 2.0;
    let y_center = (rect.ymin + rect.ymax) / 2.0;

    (
        x_center / width,
        y_center / height,
        box_width / width,
        box_height / height,
    )
}

impl YoloRow {
    /// Absolute pixel corners of this row in a `width` x `height` image.
    pub fn to_pixel_rect(&self, width: usize, height: usize) -> Rect {
        yolo_to_corners(self.x, self.y, self.w, self.h, width as f64, height as f64)
    }
}

/// Format one label line, `<class> <cx> <cy> <w> <h>\n`, with the shortest
/// decimal form of each float. Whole values keep a `.0`.
pub fn format_label_line(class_id: u32, (cx, cy, w, h): (f64, f64, f64, f64)) -> String {
    format!(
        "{} {} {} {} {}\n",
        class_id,
        format_coord(cx),
        format_coord(cy),
        format_coord(w),
        format_coord(h)
    )
}

fn format_coord(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
