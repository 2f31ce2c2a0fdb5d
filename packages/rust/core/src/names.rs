//! Collision-safe names for scratch rasters.
//!
//! Scenario runs share one mapset, so scratch names must never collide
//! across concurrently executing runs. Each generated name combines the
//! caller's prefix, the process id, and a process-wide monotonic
//! sequence number.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use runoff_shared::{Result, RunoffError};

/// Process-wide sequence shared by every allocator, so two runs in the
/// same process can never mint the same name.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Allocates scratch raster names for a single scenario run.
#[derive(Debug, Default)]
pub struct NameAllocator {
    issued: HashSet<String>,
}

impl NameAllocator {
    /// Fresh allocator for one run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a name of the form `<prefix>_<pid>_<seq>`.
    ///
    /// The duplicate check is defensive: with a monotonic sequence it
    /// cannot trip unless the sequence itself is broken.
    pub fn generate(&mut self, prefix: &str) -> Result<String> {
        if prefix.is_empty() {
            return Err(RunoffError::invalid_argument(
                "scratch raster prefix must not be empty",
            ));
        }

        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("{prefix}_{pid}_{seq}", pid = std::process::id());

        if !self.issued.insert(name.clone()) {
            return Err(RunoffError::NameCollision { name });
        }

        Ok(name)
    }
}
