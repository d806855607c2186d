use std::sync::Arc;

use crate::application::services::SessionService;
use crate::domain::model::ModelId;

/// Datos de configuración que el dashboard muestra al cargar.
#[derive(Debug, Clone)]
pub struct DashboardInfo {
    pub model: ModelId,
    pub records_file: String,
    pub default_camera_index: u32,
    pub ip_camera_placeholder: String,
}

/// Estado compartido para los manejadores HTTP de Axum.
#[derive(Clone)]
pub struct HttpState {
    /// Orquestador de sesiones (foto, vídeo, webcam).
    pub session: Arc<SessionService>,
    pub info: Arc<DashboardInfo>,
}
