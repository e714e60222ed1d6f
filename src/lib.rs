//! Raster chipping for YOLO object-detection datasets
//!
//! This library turns images (or georeferenced rasters) with YOLO box labels
//! into fixed-size chips whose labels are clipped and re-expressed in each
//! chip's own pixel frame. The work is split into four lazy stages:
//!
//! 1. [`AnnotationParser`] groups textual box records into one table per image,
//! 2. [`BoxGeoreferencer`] turns normalized boxes into rectangles in the raster frame,
//! 3. [`Chipper`] cuts each raster into windows and clips the rectangles to them,
//! 4. [`Persister`] writes `images/` and `labels/` with contiguous sequence numbers.

pub mod capability;
pub mod chipper;
pub mod config;
pub mod conversion;
pub mod error;
pub mod georef;
pub mod io;
pub mod parser;
pub mod persist;
pub mod pipe;
pub mod raster;
pub mod types;
pub mod utils;
pub mod window;

// Re-export commonly used types and functions
pub use capability::{Capabilities, Capability};
pub use chipper::Chipper;
pub use config::Args;
pub use error::{Error, Result};
pub use georef::{BoxGeoreferencer, PairingPolicy};
pub use io::{label_ids, read_label_dir, setup_output_directories};
pub use parser::AnnotationParser;
pub use persist::{PersistConfig, Persister, RasterEncoder};
pub use pipe::{start_pipe, PipeExt};
pub use raster::{GeoTransform, Raster};
pub use types::{
    ChipOrigin, Dimension, GeometryAnnotationTable, GeometryRow, ImageAnnotationTable, RawBox,
    Rect, WindowSpec, YoloRow,
};
pub use window::{GridWindower, RemainderPolicy, Window, Windower};

#[cfg(feature = "image")]
pub use io::{load_raster, load_rasters};
#[cfg(feature = "image")]
pub use persist::ImageEncoder;
