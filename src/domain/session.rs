use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{DomainError, DomainResult};
use super::record::FrameRecord;

/// Acumulador de la sesión: lista ordenada de registros por frame.
#[derive(Debug, Default, Clone)]
pub struct SessionLog {
    records: Vec<FrameRecord>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Los números de frame deben ser estrictamente crecientes dentro de la sesión.
    pub fn append(&mut self, record: FrameRecord) -> DomainResult<()> {
        if let Some(last) = self.records.last() {
            if record.frame <= last.frame {
                return Err(DomainError::InvalidInput(format!(
                    "frame {} no es posterior al último registrado ({})",
                    record.frame, last.frame
                )));
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<FrameRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Registro compartido entre el driver activo (escritor) y la API (lectores).
#[derive(Debug, Clone, Default)]
pub struct SharedLog(Arc<Mutex<SessionLog>>);

impl SharedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> DomainResult<MutexGuard<'_, SessionLog>> {
        self.0
            .lock()
            .map_err(|_| DomainError::OperationFailed("lock del registro de sesión envenenado".into()))
    }

    pub fn snapshot(&self) -> DomainResult<Vec<FrameRecord>> {
        Ok(self.lock()?.snapshot())
    }
}
