use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::PersistMode;
use crate::dashboard::Dashboard;
use crate::submission::models::{
    ApplicationId, ApplicationRecord, SubmissionOutcome, SubmissionRoute, UploadedDocument,
};
use crate::submission::persister::{persist, PersistenceError};

/// Delivers a normalized submission to exactly one destination.
///
/// The dashboard is preferred when its health check passes; a 2xx from its
/// ingestion endpoint ends the submission. Any dashboard failure hands the
/// record to the local store instead, whose error (if any) is returned.
pub async fn submit(
    dashboard: &dyn Dashboard,
    pool: &SqlitePool,
    mode: PersistMode,
    record: &ApplicationRecord,
    document: &UploadedDocument,
) -> Result<SubmissionOutcome, PersistenceError> {
    match dashboard.health().await {
        Ok(()) => match dashboard.submit_application(record, document).await {
            Ok(receipt) => {
                info!("Application forwarded to dashboard");
                return Ok(SubmissionOutcome {
                    application_id: receipt.application_id,
                    route: SubmissionRoute::Remote,
                });
            }
            Err(e) => warn!("Dashboard rejected or failed submission, saving locally: {e}"),
        },
        Err(e) => warn!("Dashboard health check failed, saving locally: {e}"),
    }

    let row_id = persist(pool, mode, record).await?;
    Ok(SubmissionOutcome {
        application_id: Some(ApplicationId::Numeric(row_id)),
        route: SubmissionRoute::Local,
    })
}
