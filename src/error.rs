use std::path::PathBuf;

use thiserror::Error;

use crate::capability::Capability;

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a pipeline stage can surface at construction or pull time.
#[derive(Debug, Error)]
pub enum Error {
    /// A stage was built without a collaborator it depends on.
    #[error("{capability} is required to use this stage. {hint}")]
    MissingCapability {
        capability: Capability,
        hint: &'static str,
    },

    /// The raster and annotation sequences of a pairwise stage went out of step.
    #[error("{stage}: raster and annotation sequences are not aligned ({detail})")]
    PairingMismatch { stage: &'static str, detail: String },

    /// A textual box record could not be coerced into a raw box.
    #[error("invalid box record for image '{image_id}': {message}")]
    InvalidRecord { image_id: String, message: String },

    /// The window spec or windowing options are unusable.
    #[error("invalid window spec: {0}")]
    InvalidWindow(String),

    /// Raster data or georeferencing is unusable.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The raster encoder rejected a chip.
    #[error("failed to encode raster to {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },

    #[error("failed to write manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
