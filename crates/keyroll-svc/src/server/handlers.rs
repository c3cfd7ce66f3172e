//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, HealthResponse, PayloadKind, ProfileInfo, ProfilesResponse, RollResponse,
    SealRequest, SealResponse, StoredColumns, StoredRequest, UnsealResponse,
};
use common::ServiceError;
use keyroll::{
    JsonCodec, KeyProfileRegistry, PayloadCodec, SealError, SealedValue, StoredSealedValue,
    StringCodec,
};
use serde_json::Value;
use tracing::warn;

use super::state::AppState;

/// A [`ServiceError`] rendered as a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<SealError> for ApiError {
    fn from(e: SealError) -> Self {
        Self(match e {
            SealError::KeyProfileNotFound(name) => ServiceError::KeyProfileNotFound(name),
            SealError::Decryption(_) => ServiceError::DecryptionFailure,
            SealError::Codec(e) => ServiceError::BadRequest(e.to_string()),
            SealError::Encryption(e) => ServiceError::EncryptionFailure(e.to_string()),
            SealError::InvalidKey(name) => {
                ServiceError::Internal(format!("unusable key for profile '{name}'"))
            }
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// `POST /seal` — encrypt a value under the appropriate key profile.
///
/// Without `stored` the value is sealed under the default profile. With
/// `stored` it stays on the stored profile unless that profile is being rolled.
pub async fn seal(
    State(state): State<AppState>,
    Json(req): Json<SealRequest>,
) -> Result<Json<SealResponse>, ApiError> {
    ensure_default(&state.registry)?;
    let stored = req.stored.map(to_core).unwrap_or_default();

    let sealed = match req.kind {
        PayloadKind::String => {
            let Value::String(text) = req.value else {
                return Err(ApiError(ServiceError::BadRequest(
                    "value must be a JSON string when kind is \"string\"".into(),
                )));
            };
            seal_with(&state.registry, StringCodec, text, stored)?
        }
        PayloadKind::Json => {
            seal_with(&state.registry, JsonCodec::<Value>::new(), req.value, stored)?
        }
    };

    Ok(Json(SealResponse {
        stored: from_core(sealed),
    }))
}

/// `POST /unseal` — decrypt stored columns back to the plaintext value.
pub async fn unseal(
    State(state): State<AppState>,
    Json(req): Json<StoredRequest>,
) -> Result<Json<UnsealResponse>, ApiError> {
    ensure_default(&state.registry)?;
    let stored = to_core(req.stored);
    let registry = state.registry.clone();

    let value = match req.kind {
        PayloadKind::String => SealedValue::from_stored(registry, StringCodec, stored)
            .into_value()?
            .map(Value::String),
        PayloadKind::Json => {
            SealedValue::from_stored(registry, JsonCodec::<Value>::new(), stored).into_value()?
        }
    };

    Ok(Json(UnsealResponse {
        value: value.unwrap_or(Value::Null),
    }))
}

/// `POST /roll` — move a value off a profile that is being rolled.
///
/// Values under any other profile are returned unchanged with `rolled: false`.
pub async fn roll(
    State(state): State<AppState>,
    Json(req): Json<StoredRequest>,
) -> Result<Json<RollResponse>, ApiError> {
    ensure_default(&state.registry)?;
    let stored = to_core(req.stored);

    let (stored, rolled) = match req.kind {
        PayloadKind::String => roll_with(&state.registry, StringCodec, stored)?,
        PayloadKind::Json => roll_with(&state.registry, JsonCodec::<Value>::new(), stored)?,
    };

    Ok(Json(RollResponse {
        stored: from_core(stored),
        rolled,
    }))
}

/// `GET /profiles` — list configured key profiles without key material.
pub async fn profiles(State(state): State<AppState>) -> Json<ProfilesResponse> {
    let default = state.registry.default_name();
    let profiles = state
        .registry
        .profiles()
        .iter()
        .map(|p| ProfileInfo {
            name: p.name().to_owned(),
            rolled: p.should_be_rolled(),
            fingerprint: p.fingerprint(),
            is_default: default.as_deref() == Some(p.name()),
        })
        .collect();
    Json(ProfilesResponse { profiles })
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when a default key profile is available.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let default_profile = state.registry.default_name();
    let profiles_loaded = state.registry.len();

    let (status_code, status_str) = if state.registry.try_default_profile().is_some() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        profiles_loaded,
        default_profile,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Sealing helpers
// ---------------------------------------------------------------------------

/// Sealing and unsealing of unnamed values resolve the default profile, which
/// must exist.
fn ensure_default(registry: &KeyProfileRegistry) -> Result<(), ApiError> {
    if registry.try_default_profile().is_none() {
        return Err(ApiError(ServiceError::Unavailable(
            "no default key profile configured".into(),
        )));
    }
    Ok(())
}

fn seal_with<C: PayloadCodec>(
    registry: &KeyProfileRegistry,
    codec: C,
    value: C::Value,
    stored: StoredSealedValue,
) -> Result<StoredSealedValue, SealError> {
    let mut sealed = SealedValue::from_stored(registry.clone(), codec, stored);
    sealed.set_value(value);
    sealed.seal()?;
    Ok(sealed.stored())
}

fn roll_with<C: PayloadCodec>(
    registry: &KeyProfileRegistry,
    codec: C,
    stored: StoredSealedValue,
) -> Result<(StoredSealedValue, bool), SealError> {
    let mut sealed = SealedValue::from_stored(registry.clone(), codec, stored);
    let rolled = sealed.roll()?;
    Ok((sealed.stored(), rolled))
}

fn to_core(columns: StoredColumns) -> StoredSealedValue {
    StoredSealedValue {
        cipher_text: columns.cipher_text,
        key_profile: columns.key_profile,
    }
}

fn from_core(stored: StoredSealedValue) -> StoredColumns {
    StoredColumns {
        cipher_text: stored.cipher_text,
        key_profile: stored.key_profile,
    }
}
