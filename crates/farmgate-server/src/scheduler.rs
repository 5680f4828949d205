//! Background job scheduler.
//!
//! One job is registered at server startup: a nightly geocode backfill
//! that resolves coordinates for listings carrying an address but no
//! stored location. Per-listing failures are logged and skipped; the job
//! never aborts the batch.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use farmgate_geocode::GeocodeClient;
use farmgate_search::Geocoder;

// 03:00 every day, server-local time. Nominatim's usage policy favors
// off-peak bulk lookups.
const BACKFILL_SCHEDULE: &str = "0 0 3 * * *";
const BACKFILL_BATCH_LIMIT: i64 = 200;

/// Builds and starts the background job scheduler with the nightly geocode
/// backfill registered.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all scheduled
/// jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised or
/// started.
pub async fn build_scheduler(
    pool: PgPool,
    geocoder: Arc<GeocodeClient>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(BACKFILL_SCHEDULE, move |_id, _scheduler| {
        let pool = pool.clone();
        let geocoder = Arc::clone(&geocoder);
        Box::pin(async move {
            match run_geocode_backfill(&pool, geocoder.as_ref(), BACKFILL_BATCH_LIMIT).await {
                Ok(summary) => {
                    tracing::info!(
                        resolved = summary.resolved,
                        skipped = summary.skipped,
                        "nightly geocode backfill finished"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "nightly geocode backfill failed");
                }
            }
        })
    })?;
    scheduler.add(job).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

#[derive(Debug, Default)]
pub struct BackfillSummary {
    pub resolved: usize,
    pub skipped: usize,
}

/// Resolves coordinates for up to `limit` unlocated listings.
///
/// Lookups run sequentially: the nightly batch has no latency budget and
/// a polite request rate matters more than throughput here.
///
/// # Errors
///
/// Returns [`farmgate_db::DbError`] if the work queue cannot be read; a
/// failed lookup or update only skips that listing.
pub async fn run_geocode_backfill(
    pool: &PgPool,
    geocoder: &impl Geocoder,
    limit: i64,
) -> Result<BackfillSummary, farmgate_db::DbError> {
    let queue = farmgate_db::list_unlocated_listings(pool, limit).await?;
    let mut summary = BackfillSummary::default();

    for row in queue {
        let Some(address) = row.address.as_deref() else {
            summary.skipped += 1;
            continue;
        };

        let coords = match geocoder.geocode(address).await {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                tracing::debug!(listing_id = %row.id, "address did not resolve; skipping");
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(listing_id = %row.id, error = %e, "geocode failed; skipping listing");
                summary.skipped += 1;
                continue;
            }
        };

        match farmgate_db::update_listing_location(pool, row.id, coords).await {
            Ok(()) => summary.resolved += 1,
            Err(e) => {
                tracing::warn!(listing_id = %row.id, error = %e, "location update failed; skipping listing");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}
