use glob::glob;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{get_image_extensions_set, OutputDirs, RawRecord, IMG_FORMATS};
use crate::utils::create_output_directory;

#[cfg(feature = "image")]
use crate::raster::Raster;

/// Set up the `images/` and `labels/` directories under `output`. Existing
/// directories and files are kept.
pub fn setup_output_directories(output: &Path) -> Result<OutputDirs> {
    let images_dir = create_output_directory(&output.join("images"))?;
    let labels_dir = create_output_directory(&output.join("labels"))?;
    Ok(OutputDirs {
        images_dir,
        labels_dir,
    })
}

fn label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.txt", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut label_files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| {
            Error::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            )
        })?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable label path: {}", e);
                None
            }
        })
        .filter(|path| path.file_stem().is_some())
        .collect();
    label_files.sort();
    Ok(label_files)
}

fn image_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Image ids of every `*.txt` file of `dir`, sorted by path, including files
/// without any box.
pub fn label_ids(dir: &Path) -> Result<Vec<String>> {
    Ok(label_files(dir)?.iter().map(|path| image_id(path)).collect())
}

/// Read every `*.txt` file of `dir` (sorted by path) into textual box records.
/// The file stem is the image id; blank lines are skipped.
pub fn read_label_dir(dir: &Path) -> Result<Vec<RawRecord>> {
    let label_files = label_files(dir)?;

    let mut records = Vec::new();
    for path in &label_files {
        records.extend(parse_label_text(&image_id(path), &read_file(path)?));
    }

    debug!(
        "Read {} box records from {} label files",
        records.len(),
        label_files.len()
    );
    Ok(records)
}

/// Split YOLO label text into `(image_id, fields)` records.
pub fn parse_label_text(image_id: &str, text: &str) -> Vec<RawRecord> {
    text.lines()
        .map(str::split_whitespace)
        .map(|fields| fields.map(str::to_string).collect::<Vec<_>>())
        .filter(|fields| !fields.is_empty())
        .map(|fields| (image_id.to_string(), fields))
        .collect()
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Find the image whose stem is `image_id`, trying the supported extensions in
/// order.
pub fn find_image(images_dir: &Path, image_id: &str) -> Option<PathBuf> {
    IMG_FORMATS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_uppercase()])
        .map(|ext| images_dir.join(format!("{}.{}", image_id, ext)))
        .find(|path| path.is_file())
}

/// Whether `path` carries one of the supported image extensions.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| get_image_extensions_set().contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Decode an image into a raster with an identity transform, keeping its
/// channel count for 8-bit gray, gray-alpha, RGB and RGBA images.
#[cfg(feature = "image")]
pub fn load_raster(path: &Path) -> Result<Raster<u8>> {
    use image::DynamicImage;

    if !is_image_file(path) {
        warn!("Unrecognised image extension: {}", path.display());
    }

    let decoded = image::open(path).map_err(|e| Error::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);
    let (bands, samples) = match decoded {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other => (3, other.into_rgb8().into_raw()),
    };

    let mut raster = Raster::from_interleaved(width, height, bands, samples)?;
    if let Some(stem) = path.file_stem() {
        raster = raster.with_name(stem.to_string_lossy());
    }
    Ok(raster)
}

/// Lazily load the image of each id from `images_dir`, in the given order.
#[cfg(feature = "image")]
pub fn load_rasters<'a>(
    images_dir: &'a Path,
    image_ids: impl IntoIterator<Item = String> + 'a,
) -> impl Iterator<Item = Result<Raster<u8>>> + 'a {
    image_ids.into_iter().map(move |id| {
        let path = find_image(images_dir, &id).ok_or_else(|| {
            Error::io(
                images_dir.join(&id),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no image for '{}' in {}", id, images_dir.display()),
                ),
            )
        })?;
        debug!("Loading {}", path.display());
        load_raster(&path)
    })
}
