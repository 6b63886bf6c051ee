use crate::claim::{Claim, ClaimStatus};

/// A unit of pipeline work covering exactly one admitted claim.
#[derive(Debug, Clone)]
pub struct ClaimJob {
    /// Unique identifier for this enqueued run (not the claim id; the same
    /// claim can be re-admitted and processed again under a fresh job id).
    pub id: String,
    pub claim_id: String,
    pub owner_id: String,
    /// Where the claim document lives: an http(s) URL or a local path.
    pub document_ref: String,
}

impl ClaimJob {
    pub fn new(claim_id: &str, owner_id: &str, document_ref: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            claim_id: claim_id.to_string(),
            owner_id: owner_id.to_string(),
            document_ref: document_ref.to_string(),
        }
    }

    pub fn for_claim(claim: &Claim) -> Self {
        Self::new(&claim.id, &claim.owner_id, &claim.document_ref)
    }
}

/// What the queue learns about a finished run.
///
/// A failed claim is still a finished job: its terminal status was stored
/// and published, so `status` is `Some(Failed)`. A `status` of `None`
/// means the run aborted before it could record anything and the claim
/// row may still read `queued` or `processing`.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub claim_id: String,
    pub success: bool,
    /// Terminal status persisted for the claim, when one was recorded.
    pub status: Option<ClaimStatus>,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn completed(job: &ClaimJob) -> Self {
        Self {
            job_id: job.id.clone(),
            claim_id: job.claim_id.clone(),
            success: true,
            status: Some(ClaimStatus::Completed),
            error: None,
        }
    }

    pub fn failed(job: &ClaimJob, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            claim_id: job.claim_id.clone(),
            success: false,
            status: Some(ClaimStatus::Failed),
            error: Some(error),
        }
    }

    /// The run aborted before it could persist a terminal status.
    pub fn unrecorded(job: &ClaimJob, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            claim_id: job.claim_id.clone(),
            success: false,
            status: None,
            error: Some(error),
        }
    }
}
