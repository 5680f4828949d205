//! Database operations for farmer-onboarding `applications`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use farmgate_core::{Coordinates, ListingKind};

use crate::DbError;

/// A validated onboarding application, ready to persist.
///
/// `location` is the geocoded coordinate pair when the supplied address
/// resolved; a failed geocode stores the application without one.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub kind: ListingKind,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub bio: Option<String>,
    pub location: Option<Coordinates>,
}

/// A row from the `applications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub bio: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Persist a new onboarding application with status `pending`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_application(
    pool: &PgPool,
    application: &NewApplication,
) -> Result<ApplicationRow, DbError> {
    let row = sqlx::query_as(
        "INSERT INTO applications \
             (name, kind, contact_name, email, phone, address, bio, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, name, kind, contact_name, email, phone, address, bio, \
                   latitude, longitude, status, created_at",
    )
    .bind(&application.name)
    .bind(application.kind.as_str())
    .bind(&application.contact_name)
    .bind(&application.email)
    .bind(&application.phone)
    .bind(&application.address)
    .bind(&application.bio)
    .bind(application.location.map(Coordinates::lat))
    .bind(application.location.map(Coordinates::lon))
    .fetch_one(pool)
    .await?;

    Ok(row)
}
