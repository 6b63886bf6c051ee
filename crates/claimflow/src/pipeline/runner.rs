use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use crate::claim::ClaimStatus;
use crate::config::WorkerSettings;
use crate::db::{claim_repo, Database};
use crate::extract::FieldExtractor;
use crate::fetch::DocumentFetcher;
use crate::notify::UpdatePublisher;
use crate::ocr::{OcrEngine, TextRecognizer};
use crate::queue::job::{ClaimJob, JobOutcome};
use crate::raster::{PageRasterizer, Rasterizer};

use super::context::ClaimContext;
use super::error::PipelineError;

/// Runs the fetch, rasterize, recognize and extract stages for one
/// claim, persisting transitions and publishing the terminal state.
pub struct ClaimPipeline {
    db: Database,
    publisher: UpdatePublisher,
    fetcher: DocumentFetcher,
    rasterizer: Box<dyn PageRasterizer>,
    recognizer: Box<dyn TextRecognizer>,
    extractor: FieldExtractor,
    temp_dir: PathBuf,
}

impl ClaimPipeline {
    /// Production constructor, builds all stages from settings.
    pub fn from_settings(
        settings: &WorkerSettings,
        db: Database,
        publisher: UpdatePublisher,
    ) -> Self {
        Self::with_stages(
            db,
            publisher,
            Box::new(Rasterizer::new(settings.ocr_dpi)),
            Box::new(OcrEngine::new(&settings.ocr_languages)),
            settings.temp_dir.clone(),
        )
    }

    /// Constructor with injectable rasterizer and recognizer stages.
    pub fn with_stages(
        db: Database,
        publisher: UpdatePublisher,
        rasterizer: Box<dyn PageRasterizer>,
        recognizer: Box<dyn TextRecognizer>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            publisher,
            fetcher: DocumentFetcher::new(),
            rasterizer,
            recognizer,
            extractor: FieldExtractor::new(),
            temp_dir,
        }
    }

    /// Runs the full pipeline for a single claim job.
    ///
    /// Every persisted transition is followed by a published update, so
    /// subscribers see the claim enter processing and then reach its
    /// terminal state. Stage failures are terminal for the claim: the
    /// failed status is persisted and published, and the outcome
    /// reports the failure. Only persistence errors surface as `Err`,
    /// and temp files are removed on every path out of here.
    pub fn run(&self, job: &ClaimJob) -> Result<JobOutcome, PipelineError> {
        let _pipeline_span = info_span!("claim",
            job_id = %job.id,
            claim_id = %job.claim_id,
        )
        .entered();

        // Mark processing before any stage work. If even this write
        // fails there is nothing to clean up or publish yet.
        claim_repo::update_status(&self.db, &job.claim_id, ClaimStatus::Processing, Utc::now())?;
        info!("Claim {} processing", job.claim_id);
        self.publisher.publish(&job.claim_id);

        let mut ctx = ClaimContext::new(job.clone());
        let staged = self.run_stages(&mut ctx);

        let outcome = match staged {
            Ok(()) => self.finish_completed(&mut ctx),
            Err(e) => self.finish_failed(&ctx, e),
        };

        ctx.cleanup();
        outcome
    }

    fn run_stages(&self, ctx: &mut ClaimContext) -> Result<(), PipelineError> {
        {
            let _step = info_span!("fetch").entered();
            self.step_fetch(ctx)?;
        }
        {
            let _step = info_span!("rasterize").entered();
            self.step_rasterize(ctx)?;
        }
        {
            let _step = info_span!("recognize").entered();
            self.step_recognize(ctx)?;
        }
        {
            let _step = info_span!("extract").entered();
            self.step_extract(ctx);
        }
        Ok(())
    }

    fn finish_completed(&self, ctx: &mut ClaimContext) -> Result<JobOutcome, PipelineError> {
        let text = ctx.text.take().expect("text set in recognize step");
        let fields = ctx.fields.take().expect("fields set in extract step");

        claim_repo::store_result(&self.db, &ctx.job.claim_id, &text, &fields, Utc::now())?;
        info!("Claim {} completed", ctx.job.claim_id);

        self.publisher.publish(&ctx.job.claim_id);
        Ok(JobOutcome::completed(&ctx.job))
    }

    fn finish_failed(
        &self,
        ctx: &ClaimContext,
        error: PipelineError,
    ) -> Result<JobOutcome, PipelineError> {
        warn!(
            "Claim {} failed in {} stage: {}",
            ctx.job.claim_id,
            error.stage(),
            error
        );

        claim_repo::update_status(&self.db, &ctx.job.claim_id, ClaimStatus::Failed, Utc::now())?;
        self.publisher.publish(&ctx.job.claim_id);
        Ok(JobOutcome::failed(&ctx.job, error.to_string()))
    }

    fn step_fetch(&self, ctx: &mut ClaimContext) -> Result<(), PipelineError> {
        let dest = self.temp_dir.join(format!(
            "claim-{}-{}.pdf",
            ctx.job.claim_id,
            Utc::now().timestamp_millis()
        ));
        // Register before fetching so a partial download still gets removed.
        ctx.document_path = Some(dest.clone());
        self.fetcher.fetch(&ctx.job.document_ref, &dest)?;
        Ok(())
    }

    fn step_rasterize(&self, ctx: &mut ClaimContext) -> Result<(), PipelineError> {
        let document = ctx
            .document_path
            .as_ref()
            .expect("document_path set in fetch step");
        let prefix = self.temp_dir.join(format!(
            "claim-image-{}-{}",
            ctx.job.claim_id,
            Utc::now().timestamp_millis()
        ));

        let image = self.rasterizer.rasterize_first_page(document, &prefix)?;
        ctx.image_path = Some(image);
        Ok(())
    }

    fn step_recognize(&self, ctx: &mut ClaimContext) -> Result<(), PipelineError> {
        let image = ctx
            .image_path
            .as_ref()
            .expect("image_path set in rasterize step");

        let text = self.recognizer.recognize(image)?;
        debug!(
            "Claim {} recognized {} chars from first page",
            ctx.job.claim_id,
            text.len()
        );
        ctx.text = Some(text);
        Ok(())
    }

    fn step_extract(&self, ctx: &mut ClaimContext) {
        let text = ctx.text.as_ref().expect("text set in recognize step");
        ctx.fields = Some(self.extractor.extract(text));
    }
}
