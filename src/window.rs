//! Window generation for chipping.

use log::debug;

use crate::error::{Error, Result};
use crate::types::{Dimension, WindowSpec};

/// A rectangular pixel window of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

/// Supplies the windows a raster is cut into.
pub trait Windower {
    /// Windows for a `width` x `height` raster, in enumeration order. Every
    /// window must lie inside the raster.
    fn windows(&self, width: usize, height: usize, spec: &WindowSpec) -> Result<Vec<Window>>;
}

/// What to do with the strip left over when a dimension is not a multiple of
/// the stride.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// Only full-size windows are produced.
    #[default]
    Drop,
    /// A final, smaller window covers the leftover strip.
    Keep,
}

/// Regular grid of windows with an optional overlap between neighbours.
///
/// The first dimension of the [`WindowSpec`] is the outer loop. A dimension
/// missing from it is taken whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridWindower {
    pub overlap: usize,
    pub remainder: RemainderPolicy,
}

impl GridWindower {
    pub fn new(overlap: usize, remainder: RemainderPolicy) -> Self {
        Self { overlap, remainder }
    }

    fn spans(&self, total: usize, size: usize) -> Vec<(usize, usize)> {
        let stride = size - self.overlap;
        let mut spans = Vec::new();
        let mut start = 0;
        while start < total {
            let end = start + size;
            if end > total {
                if self.remainder == RemainderPolicy::Keep {
                    spans.push((start, total - start));
                }
                break;
            }
            spans.push((start, size));
            if end == total {
                break;
            }
            start += stride;
        }
        spans
    }
}

impl Windower for GridWindower {
    fn windows(&self, width: usize, height: usize, spec: &WindowSpec) -> Result<Vec<Window>> {
        spec.validate()?;

        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        if let Some(&(dim, size)) = spec.dims().iter().find(|&&(_, size)| self.overlap >= size) {
            return Err(Error::InvalidWindow(format!(
                "overlap {} must be smaller than the {:?} chip size {}",
                self.overlap, dim, size
            )));
        }

        let columns = match spec.size(Dimension::X) {
            Some(size) => self.spans(width, size),
            None => vec![(0, width)],
        };
        let rows = match spec.size(Dimension::Y) {
            Some(size) => self.spans(height, size),
            None => vec![(0, height)],
        };
        let y_outer = matches!(spec.dims().first(), Some((Dimension::Y, _)));

        let mut windows = Vec::with_capacity(columns.len() * rows.len());
        if y_outer {
            for &(row_off, h) in &rows {
                for &(col_off, w) in &columns {
                    windows.push(Window { col_off, row_off, width: w, height: h });
                }
            }
        } else {
            for &(col_off, w) in &columns {
                for &(row_off, h) in &rows {
                    windows.push(Window { col_off, row_off, width: w, height: h });
                }
            }
        }

        if windows.is_empty() {
            debug!("No window of {:?} fits a {}x{} raster", spec.dims(), width, height);
        }
        Ok(windows)
    }
}
