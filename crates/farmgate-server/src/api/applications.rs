//! Farmer-onboarding intake.
//!
//! The submission is stored whether or not the address geocodes: a missing
//! coordinate pair only means the listing will wait for the nightly
//! backfill once approved. The webhook notification fires after the row is
//! safely persisted and is never awaited.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use farmgate_core::{Coordinates, ListingKind};
use farmgate_db::NewApplication;
use farmgate_search::Geocoder;

use crate::middleware::RequestId;
use crate::notify::ApplicationNotice;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ApplicationBody {
    name: String,
    /// Record-type identifier (`"farm"`) or storefront label
    /// (`"Family Farms"`); both are accepted.
    kind: String,
    contact_name: String,
    email: String,
    phone: Option<String>,
    address: String,
    bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ApplicationReceipt {
    id: Uuid,
    status: String,
    /// The display address the geocoder matched, echoed back so the
    /// applicant can spot a mis-resolved address. `None` when geocoding
    /// failed or found nothing.
    canonical_address: Option<String>,
}

pub(super) async fn submit_application(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ApplicationBody>,
) -> Result<(StatusCode, Json<ApiResponse<ApplicationReceipt>>), ApiError> {
    let application = validate(&req_id.0, body)?;

    // One geocode attempt through the retry path; failure is non-fatal.
    let location = match state.geocoder.geocode(&application.address).await {
        Ok(coords) => coords,
        Err(e) => {
            tracing::warn!(error = %e, "application address geocode failed; storing without coordinates");
            None
        }
    };
    let canonical_address = match location {
        Some(coords) => lookup_canonical_address(&state, coords).await,
        None => None,
    };

    let application = NewApplication {
        location,
        ..application
    };
    let row = farmgate_db::insert_application(&state.pool, &application)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(application_id = %row.id, name = %row.name, "onboarding application received");

    if let Some(notify) = &state.notify {
        notify.send_application_notice(ApplicationNotice {
            application_id: row.id,
            name: row.name.clone(),
            kind: row.kind.clone(),
            email: row.email.clone(),
            geocoded: row.latitude.is_some(),
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ApplicationReceipt {
                id: row.id,
                status: row.status,
                canonical_address,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

async fn lookup_canonical_address(state: &AppState, coords: Coordinates) -> Option<String> {
    match state.geocoder.reverse(coords).await {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "reverse geocode failed; no canonical address echoed");
            None
        }
    }
}

fn validate(request_id: &str, body: ApplicationBody) -> Result<NewApplication, ApiError> {
    let invalid = |message: &str| {
        ApiError::new(request_id.to_owned(), "validation_error", message)
    };

    let name = non_blank(&body.name).ok_or_else(|| invalid("name must not be blank"))?;
    let contact_name =
        non_blank(&body.contact_name).ok_or_else(|| invalid("contact_name must not be blank"))?;
    let address = non_blank(&body.address).ok_or_else(|| invalid("address must not be blank"))?;
    let email = non_blank(&body.email)
        .filter(|e| e.contains('@'))
        .ok_or_else(|| invalid("email must be a valid address"))?;
    let kind = ListingKind::from_record_type(&body.kind)
        .or_else(|| ListingKind::from_label(&body.kind))
        .ok_or_else(|| invalid("kind must be farm, stall, or stall-only"))?;

    Ok(NewApplication {
        name,
        kind,
        contact_name,
        email,
        phone: body.phone.as_deref().and_then(non_blank),
        address,
        bio: body.bio.as_deref().and_then(non_blank),
        location: None,
    })
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
