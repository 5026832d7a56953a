//! Licence lookup endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use fftt_common::{LookupError, PlayerRecord};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /licence/:licence_id
///
/// One signed registry call, then the record as JSON:
/// `{licence, nom, prenom, club, classement, points, categorie}`.
pub async fn get_licence(
    State(state): State<AppState>,
    Path(licence_id): Path<String>,
) -> ApiResult<Json<PlayerRecord>> {
    let licence_id = licence_id.trim();
    if licence_id.is_empty() {
        return Err(ApiError::BadRequest("licence number is empty".to_string()));
    }

    match state.registry.lookup_licence(licence_id).await {
        Ok(record) => Ok(Json(record)),
        Err(err @ LookupError::NotFound { .. }) => {
            info!(licence = %licence_id, "Licence not found in registry");
            Err(err.into())
        }
        Err(err) => {
            warn!(licence = %licence_id, error = %err, "Registry lookup failed");
            Err(err.into())
        }
    }
}
