use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// A textual box record as produced by a label reader: the image id and the
/// five fields `class cx cy w h`.
pub type RawRecord = (String, Vec<String>);

/// One object in normalized YOLO encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
    pub image_id: String,
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl TryFrom<RawRecord> for RawBox {
    type Error = Error;

    fn try_from((image_id, fields): RawRecord) -> Result<Self> {
        if fields.len() != 5 {
            return Err(Error::InvalidRecord {
                message: format!("expected 5 fields, found {}", fields.len()),
                image_id,
            });
        }

        let class_id = match fields[0].trim().parse::<u32>() {
            Ok(class_id) => class_id,
            Err(e) => {
                return Err(Error::InvalidRecord {
                    message: format!("class '{}': {}", fields[0], e),
                    image_id,
                })
            }
        };

        let mut values = [0.0f64; 4];
        for (value, field) in values.iter_mut().zip(&fields[1..]) {
            *value = match field.trim().parse::<f64>() {
                Ok(v) => v,
                Err(e) => {
                    return Err(Error::InvalidRecord {
                        message: format!("coordinate '{}': {}", field, e),
                        image_id,
                    })
                }
            };
        }
        let [cx, cy, w, h] = values;

        Ok(RawBox {
            image_id,
            class_id,
            cx,
            cy,
            w,
            h,
        })
    }
}

/// A row of an [`ImageAnnotationTable`]: columns `c x y w h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YoloRow {
    pub c: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl From<&RawBox> for YoloRow {
    fn from(raw: &RawBox) -> Self {
        YoloRow {
            c: raw.class_id,
            x: raw.cx,
            y: raw.cy,
            w: raw.w,
            h: raw.h,
        }
    }
}

/// All boxes of one image. The `file` column is shared by every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotationTable {
    pub file: String,
    pub rows: Vec<YoloRow>,
}

impl ImageAnnotationTable {
    pub fn new(file: impl Into<String>, rows: Vec<YoloRow>) -> Self {
        Self {
            file: file.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Axis-aligned rectangle `(xmin, ymin, xmax, ymax)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rect {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build a rectangle from two opposite corners in any order.
    pub fn from_corners((x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> Self {
        Self {
            xmin: x0.min(x1),
            ymin: y0.min(y1),
            xmax: x0.max(x1),
            ymax: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Overlap with `other`, or `None` when the overlap has no area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        let xmax = self.xmax.min(other.xmax);
        let ymax = self.ymax.min(other.ymax);
        (xmax > xmin && ymax > ymin).then(|| Rect::new(xmin, ymin, xmax, ymax))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }
}

/// A row of a [`GeometryAnnotationTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryRow {
    pub geometry: Rect,
    pub c: u32,
}

/// Rectangle geometries with class labels, expressed in the frame of the
/// raster they are paired with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryAnnotationTable {
    pub rows: Vec<GeometryRow>,
}

impl GeometryAnnotationTable {
    pub fn new(rows: Vec<GeometryRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeometryRow> {
        self.rows.iter()
    }

    /// Rectangle clip: rows outside `mask` are dropped, rows straddling it are
    /// cut to the overlap. Row order is kept.
    pub fn clip(&self, mask: &Rect) -> GeometryAnnotationTable {
        let rows = self
            .rows
            .iter()
            .filter_map(|row| {
                row.geometry.intersection(mask).map(|geometry| GeometryRow {
                    geometry,
                    c: row.c,
                })
            })
            .collect();
        GeometryAnnotationTable { rows }
    }

    pub fn translate(self, dx: f64, dy: f64) -> GeometryAnnotationTable {
        let rows = self
            .rows
            .into_iter()
            .map(|row| GeometryRow {
                geometry: row.geometry.translate(dx, dy),
                c: row.c,
            })
            .collect();
        GeometryAnnotationTable { rows }
    }
}

impl<'a> IntoIterator for &'a GeometryAnnotationTable {
    type Item = &'a GeometryRow;
    type IntoIter = std::slice::Iter<'a, GeometryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A raster dimension a window size can be given for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    X,
    Y,
}

/// Chip sizes per dimension, in enumeration order: the first entry is the
/// outer loop of the window grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    dims: Vec<(Dimension, usize)>,
}

impl WindowSpec {
    /// `{x: width, y: height}`.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            dims: vec![(Dimension::X, width), (Dimension::Y, height)],
        }
    }

    /// Build from explicit `(dimension, size)` pairs. Sizes must be positive and
    /// each dimension may appear once. A dimension left out is not split.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Dimension, usize)>) -> Result<Self> {
        let mut dims: Vec<(Dimension, usize)> = Vec::new();
        for (dim, size) in pairs {
            if size == 0 {
                return Err(Error::InvalidWindow(format!(
                    "size for dimension {:?} must be positive",
                    dim
                )));
            }
            if dims.iter().any(|(d, _)| *d == dim) {
                return Err(Error::InvalidWindow(format!(
                    "dimension {:?} given more than once",
                    dim
                )));
            }
            dims.push((dim, size));
        }
        Ok(Self { dims })
    }

    pub fn size(&self, dim: Dimension) -> Option<usize> {
        self.dims.iter().find(|(d, _)| *d == dim).map(|&(_, s)| s)
    }

    pub fn dims(&self) -> &[(Dimension, usize)] {
        &self.dims
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self.dims.iter().find(|(_, size)| *size == 0) {
            Some((dim, _)) => Err(Error::InvalidWindow(format!(
                "size for dimension {:?} must be positive",
                dim
            ))),
            None => Ok(()),
        }
    }
}

// Struct to hold the paths to the output directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub images_dir: std::path::PathBuf,
    pub labels_dir: std::path::PathBuf,
}

/// Where a chip was cut from. Kept for traceability only; label files never
/// carry these coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChipOrigin {
    /// Position of the source raster in the input sequence.
    pub source_index: usize,
    /// Position of the window within its source raster.
    pub window_index: usize,
    pub col_off: usize,
    pub row_off: usize,
    /// World x/y offset of the chip's top-left corner before re-origining.
    pub x_off: f64,
    pub y_off: f64,
}

// Struct to hold persistence statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistStats {
    pub chips_received: usize,
    pub chips_written: usize,
    pub skipped_empty: usize,
    pub label_rows_written: usize,
}

impl PersistStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        log::info!("=== Chipping Summary ===");
        log::info!("Chips received: {}", self.chips_received);
        log::info!("Chips written: {}", self.chips_written);
        log::info!("Label rows written: {}", self.label_rows_written);

        if self.skipped_empty > 0 {
            log::warn!(
                "Skipped {} chips without annotations (use --keep_empty to write them)",
                self.skipped_empty
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, fields: &[&str]) -> RawRecord {
        (id.to_string(), fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn raw_box_from_record() {
        let raw = RawBox::try_from(record("a", &["3", "0.5", " 0.25", "0.1", "0.2"])).unwrap();
        assert_eq!(raw.image_id, "a");
        assert_eq!(raw.class_id, 3);
        assert_eq!(raw.cx, 0.5);
        assert_eq!(raw.cy, 0.25);
        assert_eq!(raw.w, 0.1);
        assert_eq!(raw.h, 0.2);
    }

    #[test]
    fn raw_box_rejects_bad_records() {
        assert!(matches!(
            RawBox::try_from(record("a", &["3", "0.5", "0.5", "0.1"])),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            RawBox::try_from(record("a", &["x", "0.5", "0.5", "0.1", "0.1"])),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            RawBox::try_from(record("a", &["1", "0.5", "nope", "0.1", "0.1"])),
            Err(Error::InvalidRecord { .. })
        ));
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 15.0, 5.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 0.0, 10.0, 5.0)));

        // Touching edges have no area.
        let c = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.intersection(&c), None);
        assert_eq!(a.intersection(&Rect::new(30.0, 30.0, 40.0, 40.0)), None);
    }

    #[test]
    fn rect_from_corners_orders_bounds() {
        let r = Rect::from_corners((4.0, -1.0), (2.0, -3.0));
        assert_eq!(r, Rect::new(2.0, -3.0, 4.0, -1.0));
        assert_eq!(r.center(), (3.0, -2.0));
    }

    #[test]
    fn clip_drops_outside_and_cuts_straddling() {
        let table = GeometryAnnotationTable::new(vec![
            GeometryRow {
                geometry: Rect::new(1.0, 1.0, 2.0, 2.0),
                c: 0,
            },
            GeometryRow {
                geometry: Rect::new(50.0, 50.0, 60.0, 60.0),
                c: 1,
            },
            GeometryRow {
                geometry: Rect::new(8.0, 8.0, 12.0, 12.0),
                c: 2,
            },
        ]);
        let clipped = table.clip(&Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped.rows[0].c, 0);
        assert_eq!(clipped.rows[1].c, 2);
        assert_eq!(clipped.rows[1].geometry, Rect::new(8.0, 8.0, 10.0, 10.0));
    }

    #[test]
    fn window_spec_validation() {
        assert!(WindowSpec::from_pairs([(Dimension::Y, 0)]).is_err());
        assert!(WindowSpec::from_pairs([(Dimension::X, 4), (Dimension::X, 4)]).is_err());

        let spec = WindowSpec::from_pairs([(Dimension::Y, 8), (Dimension::X, 4)]).unwrap();
        assert_eq!(spec.size(Dimension::X), Some(4));
        assert_eq!(spec.dims()[0], (Dimension::Y, 8));
        assert!(WindowSpec::new(0, 4).validate().is_err());
    }
}
