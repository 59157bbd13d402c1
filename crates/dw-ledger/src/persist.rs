use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dw_store::FsDurableStore;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::ProvenanceLedger;
use crate::snapshot::LedgerExport;

/// On-disk home of a ledger.
///
/// ```text
/// <root>/ledger.json   latest export
/// <root>/objects/      filesystem durable store
/// ```
#[derive(Debug)]
pub struct LedgerDir {
    root: PathBuf,
    save_lock: Mutex<()>,
}

impl LedgerDir {
    pub const LEDGER_FILE: &'static str = "ledger.json";
    pub const OBJECTS_DIR: &'static str = "objects";

    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(Self::LEDGER_FILE)
    }

    pub fn objects_path(&self) -> PathBuf {
        self.root.join(Self::OBJECTS_DIR)
    }

    /// Open the ledger kept here, creating the layout on first use.
    pub fn open(&self, config: LedgerConfig) -> LedgerResult<ProvenanceLedger> {
        let store = FsDurableStore::open(self.objects_path())
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let ledger = ProvenanceLedger::new(config, Arc::new(store))?;
        if let Some(export) = self.load()? {
            let report = ledger.import(export)?;
            tracing::debug!(
                root = %self.root.display(),
                records = report.record_count,
                "ledger loaded"
            );
        }
        Ok(ledger)
    }

    /// Read the saved export, if any.
    pub fn load(&self) -> LedgerResult<Option<LedgerExport>> {
        let raw = match std::fs::read_to_string(self.ledger_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LedgerError::Persistence(e.to_string())),
        };
        LedgerExport::from_json(&raw)
            .map(Some)
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Write the ledger's current export, replacing the previous one.
    ///
    /// Saves are serialized and the export is taken under the same lock,
    /// so the file on disk never goes back to an older snapshot.
    pub fn save(&self, ledger: &ProvenanceLedger) -> LedgerResult<()> {
        let _guard = self.save_lock.lock().expect("lock poisoned");
        let json = ledger
            .export()?
            .to_json_pretty()
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        std::fs::create_dir_all(&self.root).map_err(persistence)?;
        let mut staging = tempfile::NamedTempFile::new_in(&self.root).map_err(persistence)?;
        staging.write_all(json.as_bytes()).map_err(persistence)?;
        staging.as_file().sync_all().map_err(persistence)?;
        staging
            .persist(self.ledger_path())
            .map_err(|e| persistence(e.error))?;
        Ok(())
    }
}

fn persistence(e: std::io::Error) -> LedgerError {
    LedgerError::Persistence(e.to_string())
}
