// src/services/status_normalizer.rs

use crate::{
    db::RequestRepository,
    models::{request::Request, workflow::RequestStatus},
    services::workflow_catalog,
};

/// The status `request` should carry, if it differs from the stored one.
/// REJECTED and CANCELLED are never reconciled.
pub fn reconcile(request: &Request) -> Option<RequestStatus> {
    if request.status.is_absorbing() {
        return None;
    }
    let derived = workflow_catalog::status_for(request.request_type, request.current_step)?;
    (derived != request.status).then_some(derived)
}

/// Self-heals the denormalized `status` column on read.
#[derive(Clone)]
pub struct StatusNormalizer {
    repo: RequestRepository,
    pool: sqlx::SqlitePool,
}

impl StatusNormalizer {
    pub fn new(repo: RequestRepository, pool: sqlx::SqlitePool) -> Self {
        Self { repo, pool }
    }

    /// Returns the request with its corrected status. The write-back is best
    /// effort; the caller sees the corrected value either way.
    pub async fn normalize(&self, mut request: Request) -> Request {
        let Some(corrected) = reconcile(&request) else {
            return request;
        };

        match self
            .repo
            .correct_status(&self.pool, request.id, request.current_step, request.status, corrected)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    request_id = request.id,
                    from = %request.status,
                    to = %corrected,
                    step = %request.current_step,
                    "status drift corrected"
                );
            }
            Ok(false) => {
                tracing::debug!(request_id = request.id, "row changed before status correction, skipped");
            }
            Err(e) => {
                tracing::warn!(request_id = request.id, error = %e, "failed to persist status correction");
            }
        }

        request.status = corrected;
        request
    }

    pub async fn normalize_all(&self, requests: Vec<Request>) -> Vec<Request> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.normalize(request).await);
        }
        out
    }
}
