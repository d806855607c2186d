use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use serde_json::json;
use tracing::{info, warn};

use crate::adapters::http::state::HttpState;
use crate::adapters::storage::RECORDS_FILE_NAME;
use crate::application::dto::{
    ConfigResponse, ErrorResponse, OkResponse, PhotoResponse, SessionResponse, SetConfidenceRequest,
};
use crate::domain::errors::DomainError;
use crate::domain::model::ConfidenceThreshold;
use crate::domain::source::CameraSelection;

/// Error de dominio traducido a respuesta HTTP.
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::OperationFailed(_) | DomainError::StreamInterrupted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("{}", self.0);
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub async fn get_config(State(st): State<HttpState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        confidence: st.session.confidence(),
        confidence_options: ConfidenceThreshold::options(),
        model: st.info.model.clone(),
        records_file: st.info.records_file.clone(),
        default_camera_index: st.info.default_camera_index,
        ip_camera_placeholder: st.info.ip_camera_placeholder.clone(),
    })
}

pub async fn set_confidence(
    State(st): State<HttpState>,
    Json(req): Json<SetConfidenceRequest>,
) -> ApiResult<impl IntoResponse> {
    let threshold = st.session.set_confidence(req.value)?;
    Ok(Json(json!({ "ok": true, "confidence": threshold.value() })))
}

pub async fn upload_photo(State(st): State<HttpState>, body: Bytes) -> ApiResult<Json<PhotoResponse>> {
    info!("Foto recibida ({} bytes)", body.len());
    let photo = st.session.process_photo(body.to_vec()).await?;
    let processed = photo.processed;

    Ok(Json(PhotoResponse {
        frame: processed.frame_number,
        width: processed.image.width(),
        height: processed.image.height(),
        infer_ms: processed.infer_ms,
        objects: processed.objects,
        image: BASE64_STANDARD.encode(&photo.jpeg),
        records: photo.records,
    }))
}

pub async fn upload_video(State(st): State<HttpState>, body: Bytes) -> ApiResult<Json<OkResponse>> {
    info!("Vídeo recibido ({} bytes)", body.len());
    st.session.start_video(body.to_vec()).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn start_webcam(
    State(st): State<HttpState>,
    Json(camera): Json<CameraSelection>,
) -> ApiResult<Json<OkResponse>> {
    st.session.start_webcam(camera).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn stop_webcam(State(st): State<HttpState>) -> ApiResult<impl IntoResponse> {
    let stopped = st.session.stop_webcam().await?;
    Ok(Json(json!({ "ok": true, "stopped": stopped })))
}

pub async fn get_session(State(st): State<HttpState>) -> ApiResult<Json<SessionResponse>> {
    let download_available = st.session.download_available()?;
    Ok(Json(SessionResponse { status: st.session.status(), download_available }))
}

pub async fn download_records(State(st): State<HttpState>) -> ApiResult<Response> {
    let Some(bytes) = st.session.download()? else {
        return Err(DomainError::NotFound("no hay registro de seguimiento que descargar".into()).into());
    };
    let disposition = format!("attachment; filename=\"{RECORDS_FILE_NAME}\"");
    Ok((
        [(header::CONTENT_TYPE, "application/json".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DomainError::SourceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::OperationFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::StreamInterrupted("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
