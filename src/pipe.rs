//! Chaining helpers so a pipeline reads top to bottom:
//!
//! ```no_run
//! use geoyolo::{start_pipe, PersistConfig, PipeExt, WindowSpec};
//! # fn run(records: Vec<(String, Vec<String>)>, rasters: Vec<geoyolo::Raster>) -> geoyolo::Result<()> {
//! let saved = start_pipe(records)
//!     .parse_yolo()?
//!     .yolobox_to_geo(start_pipe(rasters))?
//!     .chip_image_and_label(WindowSpec::new(512, 512))?
//!     .save_image_and_label(PersistConfig::new("out"))?;
//! for item in saved {
//!     item?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::capability::Capabilities;
use crate::chipper::Chipper;
use crate::error::Result;
use crate::georef::BoxGeoreferencer;
use crate::parser::AnnotationParser;
use crate::persist::{PersistConfig, Persister};
use crate::raster::Raster;
use crate::types::{GeometryAnnotationTable, ImageAnnotationTable, RawRecord, WindowSpec};

/// Wrap plain items so they can feed a pipeline stage.
pub fn start_pipe<I>(iterable: I) -> std::iter::Map<I::IntoIter, fn(I::Item) -> Result<I::Item>>
where
    I: IntoIterator,
{
    iterable.into_iter().map(Ok as fn(I::Item) -> Result<I::Item>)
}

/// Stage constructors as iterator methods, built with the detected
/// capabilities.
pub trait PipeExt: Iterator + Sized {
    fn parse_yolo(self) -> Result<AnnotationParser<Self>>
    where
        Self: Iterator<Item = Result<RawRecord>>,
    {
        AnnotationParser::new(self, &Capabilities::detect())
    }

    /// Pair these annotation tables with `images`, in order.
    fn yolobox_to_geo<R, T>(self, images: R) -> Result<BoxGeoreferencer<R, Self>>
    where
        Self: Iterator<Item = Result<ImageAnnotationTable>>,
        R: Iterator<Item = Result<Raster<T>>>,
    {
        BoxGeoreferencer::new(images, self, &Capabilities::detect())
    }

    fn chip_image_and_label<T>(self, spec: WindowSpec) -> Result<Chipper<Self, T>>
    where
        Self: Iterator<Item = Result<(Raster<T>, GeometryAnnotationTable)>>,
        T: Clone,
    {
        Chipper::new(self, spec, &Capabilities::detect())
    }

    fn save_image_and_label(self, config: PersistConfig) -> Result<Persister<Self, u8>>
    where
        Self: Iterator<Item = Result<(Raster<u8>, GeometryAnnotationTable)>>,
    {
        Persister::new(self, config, &Capabilities::detect())
    }
}

impl<I: Iterator> PipeExt for I {}
