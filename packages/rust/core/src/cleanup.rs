//! Guaranteed removal of scratch rasters.
//!
//! Each scenario run owns one [`CleanupRegistry`]. A scratch raster is
//! registered *before* the tool that populates it runs, so a failure
//! mid-write still leaves no name behind. Entries are released in
//! reverse registration order; a failed removal becomes a warning and
//! never aborts the remaining entries. The `Drop` impl releases
//! anything still registered, so an unwinding pipeline body cannot leak
//! rasters.

use tracing::{debug, warn};

use runoff_shared::Result;

type RemovalAction = Box<dyn FnOnce() -> Result<()> + Send>;

/// One scratch raster together with the capability that removes it.
struct CleanupEntry {
    name: String,
    remove: RemovalAction,
}

/// Per-run registry of scratch rasters awaiting removal.
#[derive(Default)]
pub struct CleanupRegistry {
    entries: Vec<CleanupEntry>,
}

impl CleanupRegistry {
    /// Empty registry for one run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster for removal at teardown. Call this before the
    /// raster is populated.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        remove: impl FnOnce() -> Result<()> + Send + 'static,
    ) {
        let name = name.into();
        debug!(raster = %name, "registered scratch raster for cleanup");
        self.entries.push(CleanupEntry {
            name,
            remove: Box::new(remove),
        });
    }

    /// Number of rasters still awaiting removal.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Remove every registered raster, newest first. Returns one warning
    /// per failed removal; calling this again is a no-op.
    pub fn run_all(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        while let Some(entry) = self.entries.pop() {
            if let Err(e) = (entry.remove)() {
                warn!(raster = %entry.name, error = %e, "scratch raster removal failed");
                warnings.push(format!("failed to remove scratch raster `{}`: {e}", entry.name));
            } else {
                debug!(raster = %entry.name, "removed scratch raster");
            }
        }

        warnings
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                pending = self.entries.len(),
                "cleanup registry dropped with pending entries, releasing now"
            );
            self.run_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use runoff_shared::RunoffError;

    use super::*;

    fn recording_registry() -> (CleanupRegistry, Arc<Mutex<Vec<String>>>) {
        (CleanupRegistry::new(), Arc::new(Mutex::new(Vec::new())))
    }

    fn record(log: &Arc<Mutex<Vec<String>>>, name: &str) -> impl FnOnce() -> Result<()> + Send + use<> {
        let log = Arc::clone(log);
        let name = name.to_string();
        move || {
            log.lock().expect("lock").push(name);
            Ok(())
        }
    }

    #[test]
    fn entries_release_in_reverse_order() {
        let (mut registry, log) = recording_registry();
        registry.register("dx_1_0", record(&log, "dx_1_0"));
        registry.register("dy_1_1", record(&log, "dy_1_1"));
        registry.register("depth_1_2", record(&log, "depth_1_2"));

        let warnings = registry.run_all();
        assert!(warnings.is_empty());
        assert_eq!(
            *log.lock().expect("lock"),
            vec!["depth_1_2", "dy_1_1", "dx_1_0"]
        );
    }

    #[test]
    fn run_all_is_idempotent() {
        let (mut registry, log) = recording_registry();
        registry.register("dx_1_0", record(&log, "dx_1_0"));

        registry.run_all();
        let warnings = registry.run_all();

        assert!(warnings.is_empty());
        assert_eq!(log.lock().expect("lock").len(), 1);
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn failed_removal_warns_but_continues() {
        let (mut registry, log) = recording_registry();
        registry.register("dx_1_0", record(&log, "dx_1_0"));
        registry.register("dy_1_1", || {
            Err(RunoffError::tool("g.remove", Some(1), "mapset locked"))
        });

        let warnings = registry.run_all();

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("dy_1_1"));
        // The failing entry must not stop the older one from releasing.
        assert_eq!(*log.lock().expect("lock"), vec!["dx_1_0"]);
    }

    #[test]
    fn drop_releases_pending_entries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut registry = CleanupRegistry::new();
            registry.register("dx_1_0", record(&log, "dx_1_0"));
            registry.register("dy_1_1", record(&log, "dy_1_1"));
            // Dropped without run_all, as an unwinding run would.
        }
        assert_eq!(*log.lock().expect("lock"), vec!["dy_1_1", "dx_1_0"]);
    }

    #[test]
    fn drop_after_run_all_does_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut registry = CleanupRegistry::new();
            registry.register("dx_1_0", record(&log, "dx_1_0"));
            registry.run_all();
        }
        assert_eq!(log.lock().expect("lock").len(), 1);
    }
}
