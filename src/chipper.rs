//! Cutting rasters into chips with clipped, re-origined annotations.
//!
//! For every `(raster, table)` pair the chipper asks its [`Windower`] for the
//! window grid, then for each window:
//!
//! 1. copies the window out of the raster, keeping an offset transform,
//! 2. clips the table to the window's world bounds,
//! 3. translates both the chip's coordinate labels and the clipped geometries
//!    by the negated x/y offset of the chip transform, so the chip's top-left
//!    corner sits at `(0, 0)`.
//!
//! All chips of one raster are yielded before the next raster is pulled.

use log::debug;

use crate::capability::{Capabilities, Capability};
use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::types::{ChipOrigin, GeometryAnnotationTable, WindowSpec};
use crate::window::{GridWindower, Window, Windower};

struct Current<T> {
    raster: Raster<T>,
    table: GeometryAnnotationTable,
    source_index: usize,
    windows: std::iter::Enumerate<std::vec::IntoIter<Window>>,
}

pub struct Chipper<I, T> {
    source: I,
    spec: WindowSpec,
    windower: Box<dyn Windower>,
    current: Option<Current<T>>,
    sources_seen: usize,
}

impl<I, T> Chipper<I, T>
where
    I: Iterator<Item = Result<(Raster<T>, GeometryAnnotationTable)>>,
    T: Clone,
{
    pub fn new(source: I, spec: WindowSpec, capabilities: &Capabilities) -> Result<Self> {
        capabilities.require_all(&[Capability::Windowing, Capability::Geometry])?;
        spec.validate()?;
        Ok(Self {
            source,
            spec,
            windower: Box::new(GridWindower::default()),
            current: None,
            sources_seen: 0,
        })
    }

    /// Replace the default grid windower.
    pub fn with_windower(mut self, windower: impl Windower + 'static) -> Self {
        self.windower = Box::new(windower);
        self
    }

    fn load(&mut self, raster: Raster<T>, table: GeometryAnnotationTable) -> Result<()> {
        raster.transform.validate()?;
        let windows = self
            .windower
            .windows(raster.width(), raster.height(), &self.spec)?;
        if let Some(window) = windows.iter().find(|w| {
            w.col_off + w.width > raster.width() || w.row_off + w.height > raster.height()
        }) {
            return Err(Error::InvalidWindow(format!(
                "window {:?} exceeds the {}x{} raster {}",
                window,
                raster.width(),
                raster.height(),
                self.sources_seen
            )));
        }
        debug!(
            "Cutting {} chips from {}x{} raster {}",
            windows.len(),
            raster.width(),
            raster.height(),
            self.sources_seen
        );
        self.current = Some(Current {
            raster,
            table,
            source_index: self.sources_seen,
            windows: windows.into_iter().enumerate(),
        });
        self.sources_seen += 1;
        Ok(())
    }
}

/// Cut one window out of `raster` and express it, with the part of `table`
/// it covers, in the chip's own frame.
pub fn cut_chip<T: Clone>(
    raster: &Raster<T>,
    table: &GeometryAnnotationTable,
    window: &Window,
) -> (Raster<T>, GeometryAnnotationTable) {
    let mut chip = raster.window(window.col_off, window.row_off, window.width, window.height);
    let clipped = table.clip(&chip.bounds());

    let inv_xoff = -chip.transform.x_offset();
    let inv_yoff = -chip.transform.y_offset();
    let clipped = clipped.translate(inv_xoff, inv_yoff);
    chip.translate_coords(inv_xoff, inv_yoff);

    (chip, clipped)
}

impl<I, T> Iterator for Chipper<I, T>
where
    I: Iterator<Item = Result<(Raster<T>, GeometryAnnotationTable)>>,
    T: Clone,
{
    type Item = Result<(Raster<T>, GeometryAnnotationTable)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some((window_index, window)) = current.windows.next() {
                    let world = current
                        .raster
                        .transform
                        .offset_by_pixels(window.col_off, window.row_off);
                    let (mut chip, clipped) = cut_chip(&current.raster, &current.table, &window);
                    chip.origin = Some(ChipOrigin {
                        source_index: current.source_index,
                        window_index,
                        col_off: window.col_off,
                        row_off: window.row_off,
                        x_off: world.x_offset(),
                        y_off: world.y_offset(),
                    });
                    return Some(Ok((chip, clipped)));
                }
                self.current = None;
            }

            match self.source.next()? {
                Ok((raster, table)) => {
                    if let Err(e) = self.load(raster, table) {
                        return Some(Err(e));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
