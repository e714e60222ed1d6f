//! Writing chips and their labels to a YOLO dataset layout.
//!
//! ```text
//! <output>/
//!   images/0000000.<ext>, 0000001.<ext>, ...
//!   labels/0000000.txt,  0000001.txt,  ...
//! ```

use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::capability::{Capabilities, Capability};
use crate::conversion::{corners_to_yolo, format_label_line};
use crate::error::{Error, Result};
use crate::io::setup_output_directories;
use crate::raster::Raster;
use crate::types::{ChipOrigin, GeometryAnnotationTable, OutputDirs, PersistStats};

/// Writes a raster to an image file.
pub trait RasterEncoder<T> {
    fn encode(&self, raster: &Raster<T>, path: &Path) -> Result<()>;
}

/// Encoder backed by the `image` crate; the format follows the file extension.
#[cfg(feature = "image")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEncoder;

#[cfg(feature = "image")]
impl RasterEncoder<u8> for ImageEncoder {
    fn encode(&self, raster: &Raster<u8>, path: &Path) -> Result<()> {
        use image::ColorType;

        let color = match raster.bands() {
            1 => ColorType::L8,
            2 => ColorType::La8,
            3 => ColorType::Rgb8,
            4 => ColorType::Rgba8,
            n => {
                return Err(Error::Encode {
                    path: path.to_path_buf(),
                    message: format!("cannot encode a raster with {} bands", n),
                })
            }
        };

        image::save_buffer(
            path,
            &raster.to_interleaved(),
            raster.width() as u32,
            raster.height() as u32,
            color,
        )
        .map_err(|e| Error::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Options of the persistence stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    pub output_dir: PathBuf,
    /// Drop chips without annotations instead of writing an empty label file.
    pub skip_empty: bool,
    /// Image file extension, with or without the leading dot.
    pub img_ext: String,
    /// Write `manifest.json` with the origin of every written chip.
    pub manifest: bool,
}

impl PersistConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            skip_empty: true,
            img_ext: "png".to_string(),
            manifest: false,
        }
    }

    pub fn skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    pub fn img_ext(mut self, img_ext: impl Into<String>) -> Self {
        self.img_ext = img_ext.into();
        self
    }

    pub fn manifest(mut self, manifest: bool) -> Self {
        self.manifest = manifest;
        self
    }

    fn extension(&self) -> &str {
        self.img_ext.trim_start_matches('.')
    }
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    id: String,
    name: Option<String>,
    width: usize,
    height: usize,
    labels: usize,
    origin: Option<ChipOrigin>,
}

/// Zero-padded 7-digit name of the `seq`-th written chip.
pub fn sequence_name(seq: usize) -> String {
    format!("{:07}", seq)
}

/// Write the YOLO label file of one chip. Geometries are read in the chip's
/// local frame and normalized by the chip's pixel size.
pub fn write_yolo_labels<T>(
    raster: &Raster<T>,
    table: &GeometryAnnotationTable,
    path: &Path,
) -> Result<()> {
    let width = raster.width() as f64;
    let height = raster.height() as f64;

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for row in table {
        let pixel = raster.transform.rect_to_pixel(&row.geometry);
        let line = format_label_line(row.c, corners_to_yolo(&pixel, width, height));
        writer
            .write_all(line.as_bytes())
            .map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Persists `(chip, table)` pairs and re-yields them unchanged.
///
/// Output directories are created when the stage is built. Sequence numbers
/// start at 0 and advance only for written pairs.
pub struct Persister<I, T> {
    source: I,
    config: PersistConfig,
    encoder: Box<dyn RasterEncoder<T>>,
    dirs: OutputDirs,
    next_seq: usize,
    stats: PersistStats,
    manifest: Vec<ManifestEntry>,
    finished: bool,
}

impl<I> Persister<I, u8>
where
    I: Iterator<Item = Result<(Raster<u8>, GeometryAnnotationTable)>>,
{
    /// Build with the default `image`-crate encoder.
    pub fn new(source: I, config: PersistConfig, capabilities: &Capabilities) -> Result<Self> {
        capabilities.require(Capability::RasterEncoding)?;

        #[cfg(feature = "image")]
        {
            Self::with_encoder(source, config, ImageEncoder)
        }
        #[cfg(not(feature = "image"))]
        {
            let _ = (source, config);
            Err(Capability::RasterEncoding.missing())
        }
    }
}

impl<I, T> Persister<I, T>
where
    I: Iterator<Item = Result<(Raster<T>, GeometryAnnotationTable)>>,
{
    /// Build with a caller-supplied encoder.
    pub fn with_encoder(
        source: I,
        config: PersistConfig,
        encoder: impl RasterEncoder<T> + 'static,
    ) -> Result<Self> {
        let dirs = setup_output_directories(&config.output_dir)?;
        info!("Writing chips to {}", config.output_dir.display());
        Ok(Self {
            source,
            config,
            encoder: Box::new(encoder),
            dirs,
            next_seq: 0,
            stats: PersistStats::new(),
            manifest: Vec::new(),
            finished: false,
        })
    }

    pub fn stats(&self) -> &PersistStats {
        &self.stats
    }

    pub fn output_dirs(&self) -> &OutputDirs {
        &self.dirs
    }

    /// Returns `false` when the pair was skipped.
    fn persist(&mut self, raster: &Raster<T>, table: &GeometryAnnotationTable) -> Result<bool> {
        self.stats.chips_received += 1;
        if table.is_empty() && self.config.skip_empty {
            self.stats.skipped_empty += 1;
            debug!("Skipping chip without annotations");
            return Ok(false);
        }

        let id = sequence_name(self.next_seq);
        let image_path = self
            .dirs
            .images_dir
            .join(format!("{}.{}", id, self.config.extension()));
        let label_path = self.dirs.labels_dir.join(format!("{}.txt", id));

        self.encoder.encode(raster, &image_path)?;
        write_yolo_labels(raster, table, &label_path)?;

        self.stats.chips_written += 1;
        self.stats.label_rows_written += table.len();
        if self.config.manifest {
            self.manifest.push(ManifestEntry {
                id,
                name: raster.name.clone(),
                width: raster.width(),
                height: raster.height(),
                labels: table.len(),
                origin: raster.origin,
            });
        }
        self.next_seq += 1;
        Ok(true)
    }

    fn write_manifest(&self) -> Result<()> {
        let path = self.config.output_dir.join("manifest.json");
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.manifest)?;
        writer.flush().map_err(|e| Error::io(&path, e))?;
        info!("Wrote manifest with {} chips", self.manifest.len());
        Ok(())
    }
}

impl<I, T> Iterator for Persister<I, T>
where
    I: Iterator<Item = Result<(Raster<T>, GeometryAnnotationTable)>>,
{
    type Item = Result<(Raster<T>, GeometryAnnotationTable)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.source.next() {
                Some(Ok((raster, table))) => match self.persist(&raster, &table) {
                    Ok(true) => return Some(Ok((raster, table))),
                    Ok(false) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.finished = true;
                    if self.config.manifest {
                        if let Err(e) = self.write_manifest() {
                            return Some(Err(e));
                        }
                    }
                    return None;
                }
            }
        }
    }
}
