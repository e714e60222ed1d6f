//! Georeferenced raster tiles.
//!
//! A [`Raster`] is a `(band, row, col)` array together with a [`GeoTransform`]
//! mapping pixel indices to world coordinates. Rotation terms are not
//! supported; every raster in a run is assumed to share one north-up or
//! image-style frame.

use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ChipOrigin, Rect};

/// Affine pixel-to-world transform without rotation, using rasterio naming:
/// `x = a * col + c`, `y = e * row + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Pixel width.
    pub a: f64,
    /// World x of the left edge.
    pub c: f64,
    /// Pixel height, negative for north-up rasters.
    pub e: f64,
    /// World y of the top edge.
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, c: f64, e: f64, f: f64) -> Self {
        Self { a, c, e, f }
    }

    /// Pixel coordinates are world coordinates.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 1.0, 0.0)
    }

    pub fn x_offset(&self) -> f64 {
        self.c
    }

    pub fn y_offset(&self) -> f64 {
        self.f
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (self.a * col + self.c, self.e * row + self.f)
    }

    pub fn apply_inverse(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.c) / self.a, (y - self.f) / self.e)
    }

    /// World rectangle of a pixel-space rectangle.
    pub fn rect_to_world(&self, pixel: &Rect) -> Rect {
        Rect::from_corners(
            self.apply(pixel.xmin, pixel.ymin),
            self.apply(pixel.xmax, pixel.ymax),
        )
    }

    /// Pixel-space rectangle of a world rectangle.
    pub fn rect_to_pixel(&self, world: &Rect) -> Rect {
        Rect::from_corners(
            self.apply_inverse(world.xmin, world.ymin),
            self.apply_inverse(world.xmax, world.ymax),
        )
    }

    /// World bounding box of a `width` x `height` pixel grid.
    pub fn bounds_for(&self, width: usize, height: usize) -> Rect {
        self.rect_to_world(&Rect::new(0.0, 0.0, width as f64, height as f64))
    }

    /// Transform of the sub-grid whose top-left pixel is `(col_off, row_off)`.
    pub fn offset_by_pixels(&self, col_off: usize, row_off: usize) -> Self {
        let (c, f) = self.apply(col_off as f64, row_off as f64);
        Self { c, f, ..*self }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            c: self.c + dx,
            f: self.f + dy,
            ..*self
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.a == 0.0 || self.e == 0.0 || !self.a.is_finite() || !self.e.is_finite() {
            return Err(Error::InvalidRaster(format!(
                "degenerate pixel size ({}, {})",
                self.a, self.e
            )));
        }
        Ok(())
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A raster tile: band-major pixel data plus its georeferencing.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T = u8> {
    /// Pixel values with shape `(bands, height, width)`.
    pub data: Array3<T>,
    pub transform: GeoTransform,
    /// Identifier of the source image, checked against the paired table.
    pub name: Option<String>,
    /// Set by the chipper on every chip it yields.
    pub origin: Option<ChipOrigin>,
}

impl<T> Raster<T> {
    pub fn new(data: Array3<T>, transform: GeoTransform) -> Self {
        Self {
            data,
            transform,
            name: None,
            origin: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bands(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    /// `(bands, height, width)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// World bounding box.
    pub fn bounds(&self) -> Rect {
        self.transform.bounds_for(self.width(), self.height())
    }

    /// World x of each column's left edge.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.width())
            .map(|col| self.transform.apply(col as f64, 0.0).0)
            .collect()
    }

    /// World y of each row's top edge.
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.height())
            .map(|row| self.transform.apply(0.0, row as f64).1)
            .collect()
    }

    /// Shift the raster's coordinate labels by `(dx, dy)` world units.
    pub fn translate_coords(&mut self, dx: f64, dy: f64) {
        self.transform = self.transform.translated(dx, dy);
    }
}

impl<T: Clone> Raster<T> {
    /// Build from interleaved `(row, col, band)` samples, the layout image
    /// decoders produce.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        bands: usize,
        samples: Vec<T>,
    ) -> Result<Self> {
        let hwc = Array3::from_shape_vec((height, width, bands), samples)
            .map_err(|e| Error::InvalidRaster(format!("sample buffer does not match shape: {e}")))?;
        let data = hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned();
        Ok(Self::new(data, GeoTransform::identity()))
    }

    /// Samples in interleaved `(row, col, band)` order.
    pub fn to_interleaved(&self) -> Vec<T> {
        self.data.view().permuted_axes([1, 2, 0]).iter().cloned().collect()
    }

    /// Copy out the `width` x `height` window whose top-left pixel is
    /// `(col_off, row_off)`. The window must lie inside the raster.
    pub fn window(&self, col_off: usize, row_off: usize, width: usize, height: usize) -> Raster<T> {
        let data = self
            .data
            .slice(s![.., row_off..row_off + height, col_off..col_off + width])
            .to_owned();
        Raster {
            data,
            transform: self.transform.offset_by_pixels(col_off, row_off),
            name: self.name.clone(),
            origin: None,
        }
    }
}
