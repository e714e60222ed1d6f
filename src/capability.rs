//! Declared collaborator capabilities.
//!
//! Each pipeline stage names the collaborators it needs and checks them once,
//! when the stage is built. A missing capability is reported as
//! [`Error::MissingCapability`] before any item is pulled.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// A collaborator a pipeline stage may depend on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Capability {
    /// Grouping of textual records into per-image tables.
    Tabular,
    /// Rectangle geometries and rectangle clipping.
    Geometry,
    /// Slicing a raster into rectangular windows.
    Windowing,
    /// Encoding a raster into an image file.
    RasterEncoding,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Tabular => "tabular grouping",
            Capability::Geometry => "rectangle geometry",
            Capability::Windowing => "raster windowing",
            Capability::RasterEncoding => "raster encoding",
        }
    }

    /// How to make the capability available.
    pub fn hint(&self) -> &'static str {
        match self {
            Capability::RasterEncoding => {
                "Please build geoyolo with the `image` feature (enabled by default) \
                 or pass your own encoder with `Persister::with_encoder`."
            }
            _ => "It is part of the geoyolo core and must not be removed from the capability set.",
        }
    }

    pub(crate) fn missing(self) -> Error {
        Error::MissingCapability {
            capability: self,
            hint: self.hint(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of collaborators available to a pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    available: BTreeSet<Capability>,
}

impl Capabilities {
    /// Capabilities compiled into this build.
    pub fn detect() -> Self {
        let mut available = BTreeSet::from([
            Capability::Tabular,
            Capability::Geometry,
            Capability::Windowing,
        ]);
        if cfg!(feature = "image") {
            available.insert(Capability::RasterEncoding);
        }
        Self { available }
    }

    pub fn none() -> Self {
        Self {
            available: BTreeSet::new(),
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.available.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.available.remove(&capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.available.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(capability.missing())
        }
    }

    /// Check several capabilities, failing on the first missing one.
    pub fn require_all(&self, capabilities: &[Capability]) -> Result<()> {
        capabilities.iter().try_for_each(|&c| self.require(c))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}
