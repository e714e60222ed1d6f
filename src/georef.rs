//! Normalized YOLO boxes to rectangle geometries in the raster's frame.

use log::{debug, warn};

use crate::capability::{Capabilities, Capability};
use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::types::{GeometryAnnotationTable, GeometryRow, ImageAnnotationTable};

/// What a pairwise stage does when its two input sequences go out of step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PairingPolicy {
    /// Fail with [`Error::PairingMismatch`] on unequal lengths or when a
    /// named raster does not match its table's `file`.
    #[default]
    Strict,
    /// Stop silently at the end of the shorter sequence, like `zip`.
    Truncate,
}

/// Pairs rasters with image annotation tables and converts every normalized
/// box into a corner rectangle in the raster's world frame.
pub struct BoxGeoreferencer<R, A> {
    rasters: R,
    tables: A,
    policy: PairingPolicy,
    pairs: usize,
    done: bool,
}

impl<R, A, T> BoxGeoreferencer<R, A>
where
    R: Iterator<Item = Result<Raster<T>>>,
    A: Iterator<Item = Result<ImageAnnotationTable>>,
{
    pub fn new(rasters: R, tables: A, capabilities: &Capabilities) -> Result<Self> {
        capabilities.require(Capability::Geometry)?;
        Ok(Self {
            rasters,
            tables,
            policy: PairingPolicy::default(),
            pairs: 0,
            done: false,
        })
    }

    pub fn with_pairing(mut self, policy: PairingPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn mismatch(&mut self, detail: String) -> Option<Result<(Raster<T>, GeometryAnnotationTable)>> {
        self.done = true;
        match self.policy {
            PairingPolicy::Strict => Some(Err(Error::PairingMismatch {
                stage: "box georeferencer",
                detail,
            })),
            PairingPolicy::Truncate => {
                warn!("Truncating after {} pairs: {}", self.pairs, detail);
                None
            }
        }
    }
}

/// Convert one table against its raster. Rows keep their order; an empty table
/// gives an empty geometry table.
pub fn georeference<T>(raster: &Raster<T>, table: &ImageAnnotationTable) -> GeometryAnnotationTable {
    let (width, height) = (raster.width(), raster.height());
    let rows = table
        .rows
        .iter()
        .map(|row| GeometryRow {
            geometry: raster
                .transform
                .rect_to_world(&row.to_pixel_rect(width, height)),
            c: row.c,
        })
        .collect();
    GeometryAnnotationTable::new(rows)
}

impl<R, A, T> Iterator for BoxGeoreferencer<R, A>
where
    R: Iterator<Item = Result<Raster<T>>>,
    A: Iterator<Item = Result<ImageAnnotationTable>>,
{
    type Item = Result<(Raster<T>, GeometryAnnotationTable)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let (raster, table) = match (self.rasters.next(), self.tables.next()) {
            (Some(Err(e)), _) | (_, Some(Err(e))) => return Some(Err(e)),
            (Some(Ok(raster)), Some(Ok(table))) => (raster, table),
            (None, None) => {
                self.done = true;
                return None;
            }
            (Some(Ok(_)), None) => {
                let detail = format!("annotation tables ran out after {} pairs", self.pairs);
                return self.mismatch(detail);
            }
            (None, Some(Ok(table))) => {
                let detail = format!(
                    "rasters ran out after {} pairs, table '{}' has no raster",
                    self.pairs, table.file
                );
                return self.mismatch(detail);
            }
        };

        if let Some(name) = raster.name.as_deref() {
            if name != table.file {
                let detail = format!(
                    "pair {} joins raster '{}' with table '{}'",
                    self.pairs, name, table.file
                );
                match self.policy {
                    PairingPolicy::Strict => return self.mismatch(detail),
                    PairingPolicy::Truncate => warn!("{}", detail),
                }
            }
        }

        self.pairs += 1;
        let geometries = georeference(&raster, &table);
        debug!(
            "Georeferenced {} boxes for '{}' ({}x{})",
            geometries.len(),
            table.file,
            raster.width(),
            raster.height()
        );
        Some(Ok((raster, geometries)))
    }
}
