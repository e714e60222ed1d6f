use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

use crate::georef::PairingPolicy;
use crate::persist::PersistConfig;
use crate::types::WindowSpec;
use crate::window::{GridWindower, RemainderPolicy};

/// Command-line arguments for chipping images and YOLO labels into a tiled dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory containing YOLO label files, one `<image id>.txt` per image
    #[arg(short = 'l', long = "labels_dir")]
    pub labels_dir: PathBuf,

    /// Directory containing the images named after the label files
    #[arg(short = 'i', long = "images_dir")]
    pub images_dir: PathBuf,

    /// Output directory for the chipped dataset
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: PathBuf,

    /// Chip width in pixels
    #[arg(long = "chip_width", default_value_t = 512, value_parser = validate_chip_size)]
    pub chip_width: usize,

    /// Chip height in pixels
    #[arg(long = "chip_height", default_value_t = 512, value_parser = validate_chip_size)]
    pub chip_height: usize,

    /// Pixels shared by neighbouring chips
    #[arg(long = "overlap", default_value_t = 0)]
    pub overlap: usize,

    /// What to do with the strip left at the right and bottom edges
    #[arg(long = "remainder", value_enum, default_value = "drop")]
    pub remainder: Remainder,

    /// Also write chips that contain no annotations
    #[arg(long = "keep_empty")]
    pub keep_empty: bool,

    /// Extension (and format) of the written chip images
    #[arg(long = "img_ext", default_value = "png")]
    pub img_ext: String,

    /// Stop at the shorter of the image and label sequences instead of failing
    #[arg(long = "truncate_pairs")]
    pub truncate_pairs: bool,

    /// Write manifest.json recording where every chip was cut from
    #[arg(long = "manifest")]
    pub manifest: bool,
}

// Enumeration for the edge remainder policy
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Remainder {
    Drop,
    Keep,
}

impl Args {
    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(self.chip_width, self.chip_height)
    }

    pub fn windower(&self) -> GridWindower {
        let remainder = match self.remainder {
            Remainder::Drop => RemainderPolicy::Drop,
            Remainder::Keep => RemainderPolicy::Keep,
        };
        GridWindower::new(self.overlap, remainder)
    }

    pub fn pairing(&self) -> PairingPolicy {
        if self.truncate_pairs {
            PairingPolicy::Truncate
        } else {
            PairingPolicy::Strict
        }
    }

    pub fn persist_config(&self) -> PersistConfig {
        PersistConfig::new(&self.output_dir)
            .skip_empty(!self.keep_empty)
            .img_ext(self.img_ext.clone())
            .manifest(self.manifest)
    }
}

// Validate that the chip size is a positive integer
fn validate_chip_size(s: &str) -> Result<usize, String> {
    match usize::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("SIZE must be a positive integer".to_string()),
    }
}
