use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path vacío".into()));
        }
        let path = Path::new(&model.onnx_path);
        if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            return Err(DomainError::InvalidInput(format!("{} no es un modelo .onnx", model.onnx_path)));
        }
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| DomainError::OperationFailed(format!("comprobando {}: {e}", model.onnx_path)))?;
        if !exists {
            return Err(DomainError::NotFound(format!("modelo no encontrado: {}", model.onnx_path)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(path: &str) -> ModelId {
        ModelId { name: "yolov8m".into(), onnx_path: path.into() }
    }

    #[tokio::test]
    async fn rejects_empty_and_foreign_paths() {
        let cat = OnnxModelCatalog::new();
        assert!(matches!(cat.validate_model(&model(" ")).await, Err(DomainError::InvalidInput(_))));
        assert!(matches!(cat.validate_model(&model("yolov8m.pt")).await, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn reports_missing_model_file() {
        let cat = OnnxModelCatalog::new();
        let res = cat.validate_model(&model("/definitely/missing/yolov8m.onnx")).await;
        assert!(matches!(res, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn accepts_existing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolov8m.onnx");
        std::fs::write(&path, b"onnx").unwrap();
        let cat = OnnxModelCatalog::new();
        assert!(cat.validate_model(&model(path.to_str().unwrap())).await.is_ok());
    }
}
