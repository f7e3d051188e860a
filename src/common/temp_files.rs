//! Intermediate-file tracking with cleanup on every exit path.

use std::path::PathBuf;

use log::debug;

/// Ordered ledger of the intermediate files produced while driving one
/// input through the pipeline.
///
/// Stages register names as they produce them; `flush` deletes everything
/// once the next input begins (and once more after linking). `Drop` also
/// flushes, so fatal paths that unwind via `?` cannot leak intermediates.
pub struct TempFileLedger {
    names: Vec<PathBuf>,
    /// When true (`-X`), flush forgets the names without deleting them.
    keep: bool,
}

impl TempFileLedger {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            keep: false,
        }
    }

    /// Retain intermediates instead of deleting them at flush time.
    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }

    /// Register an intermediate name for deletion at the next flush.
    pub fn register(&mut self, name: impl Into<PathBuf>) {
        let name = name.into();
        debug!("temp: {}", name.display());
        self.names.push(name);
    }

    /// Names currently awaiting the next flush.
    pub fn pending(&self) -> &[PathBuf] {
        &self.names
    }

    /// Delete every registered name (unless retention was requested) and
    /// reset the ledger for the next input file.
    pub fn flush(&mut self) {
        for name in self.names.drain(..) {
            if !self.keep {
                // The stage that was going to produce the file may have
                // failed before creating it; a missing file is fine here.
                let _ = std::fs::remove_file(&name);
            }
        }
    }
}

impl Default for TempFileLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempFileLedger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_file(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cc9995_ledger_{}_{}", tag, std::process::id()));
        fs::write(&path, "x").unwrap();
        path
    }

    #[test]
    fn flush_deletes_registered_files() {
        let path = scratch_file("del");
        let mut ledger = TempFileLedger::new();
        ledger.register(path.clone());
        ledger.flush();
        assert!(!path.exists());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn keep_retains_files_across_flush() {
        let path = scratch_file("keep");
        let mut ledger = TempFileLedger::new();
        ledger.set_keep(true);
        ledger.register(path.clone());
        ledger.flush();
        assert!(path.exists());
        assert!(ledger.pending().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn drop_flushes_remaining_names() {
        let path = scratch_file("drop");
        {
            let mut ledger = TempFileLedger::new();
            ledger.register(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn missing_files_are_ignored() {
        let mut ledger = TempFileLedger::new();
        ledger.register("/nonexistent/never-created.s");
        ledger.flush();
        assert!(ledger.pending().is_empty());
    }
}
