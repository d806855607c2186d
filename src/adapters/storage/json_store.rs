use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::application::ports::RecordStorePort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::FrameRecord;

pub const RECORDS_FILE_NAME: &str = "track_records.json";

/// Fichero JSON plano, sobrescrito en cada punto de parada.
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// JSON con sangría de 4 espacios.
pub fn to_pretty_json(records: &[FrameRecord]) -> DomainResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    records
        .serialize(&mut ser)
        .map_err(|e| DomainError::OperationFailed(format!("serializando registro: {e}")))?;
    Ok(out)
}

impl RecordStorePort for JsonRecordStore {
    fn persist(&self, records: &[FrameRecord]) -> DomainResult<()> {
        let bytes = to_pretty_json(records)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| DomainError::OperationFailed(format!("creando {}: {e}", parent.display())))?;
        }
        // Escritura atómica: fichero temporal + rename.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .map_err(|e| DomainError::OperationFailed(format!("escribiendo {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| DomainError::OperationFailed(format!("renombrando a {}: {e}", self.path.display())))?;
        tracing::debug!("Registro escrito en {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }

    fn load(&self) -> DomainResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::OperationFailed(format!("leyendo {}: {e}", self.path.display()))),
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}
