//! Pipeline orchestrator.
//!
//! Drives one item through download → transcribe → summarize → categorize.
//! Every transition commits the durable record before broadcasting, so a
//! reader polling the record never observes a broadcast it cannot
//! corroborate. Each run is a fire-and-forget tokio task whose registry
//! handle is removed exactly once, on every exit path including panics.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use vidnote_media::{media_key, MediaError, MediaFetcher};
use vidnote_models::{step, ItemId, ItemRecord, ItemStatus};
use vidnote_store::{RecordStore, StoreError};

use crate::categorize;
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::summarize;

/// Fixed progress checkpoints. These numbers are contractual: clients render
/// a single global progress bar from them.
pub const PROGRESS_QUEUED: u8 = 0;
pub const PROGRESS_DOWNLOAD_START: u8 = 5;
pub const PROGRESS_DOWNLOAD_DONE: u8 = 15;
pub const PROGRESS_TRANSCRIBE_START: u8 = 35;
pub const PROGRESS_SUMMARIZE_START: u8 = 65;
pub const PROGRESS_SUMMARY_DONE: u8 = 75;
pub const PROGRESS_CATEGORIZE_START: u8 = 85;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Outcome of submitting one URL.
#[derive(Debug)]
pub enum Submission {
    /// URL already known; no new run was started.
    Existing(ItemRecord),
    /// New record created and a run spawned for it.
    Started(ItemRecord),
}

impl Submission {
    pub fn record(&self) -> &ItemRecord {
        match self {
            Submission::Existing(record) | Submission::Started(record) => record,
        }
    }
}

/// Submit one URL.
///
/// Returns immediately: for a new URL this creates the durable record,
/// registers the in-memory handle, publishes the queued snapshot, and spawns
/// the run without waiting on any stage. A known URL returns its existing
/// record and never starts a second run, whatever state that record is in.
/// Unusable URLs are skipped (`None`).
pub async fn submit(ctx: &Arc<PipelineContext>, url: &str) -> PipelineResult<Option<Submission>> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }

    let key = match media_key(url) {
        Ok(key) => key,
        Err(e) => {
            warn!(url = %url, error = %e, "skipping unusable URL");
            return Ok(None);
        }
    };

    if let Some(existing) = ctx.store.find_item_by_url(url).await? {
        return Ok(Some(Submission::Existing(existing)));
    }

    // A previously cached metadata sidecar gives the record a real title up
    // front; otherwise a placeholder until the download stage resolves it.
    let (title, thumbnail) = match ctx.artifacts.load_metadata(&key).await {
        Some(metadata) => (metadata.title, metadata.thumbnail),
        None => ("Processing...".to_string(), String::new()),
    };

    let record = ItemRecord::new(url, key, title, thumbnail);

    if let Err(e) = ctx.store.insert_item(record.clone()).await {
        return match e {
            // Lost a submission race for the same URL; hand back the winner.
            StoreError::Conflict(_) => Ok(ctx
                .store
                .find_item_by_url(url)
                .await?
                .map(Submission::Existing)),
            other => Err(other.into()),
        };
    }

    metrics::counter!("vidnote_items_submitted_total").increment(1);

    // Register before the task spawns so no event can outrun a subscriber.
    ctx.registry.register(&record.id).await;
    ctx.registry
        .set_status(
            &record.id,
            ItemStatus::Queued,
            Some(step::QUEUED),
            Some(PROGRESS_QUEUED),
        )
        .await;

    spawn_run(Arc::clone(ctx), record.id.clone());

    Ok(Some(Submission::Started(record)))
}

/// Spawn the run task for an item.
///
/// The registry handle is removed in a finalizer that executes on success,
/// on failure, and on panic.
pub fn spawn_run(ctx: Arc<PipelineContext>, item_id: ItemId) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(item_id = %item_id, "starting pipeline run");

        let outcome = AssertUnwindSafe(run_item(&ctx, &item_id)).catch_unwind().await;

        match outcome {
            Ok(Ok(())) => {
                metrics::counter!("vidnote_runs_completed_total").increment(1);
                info!(item_id = %item_id, "pipeline run complete");
            }
            Ok(Err(e)) => {
                metrics::counter!("vidnote_runs_failed_total").increment(1);
                error!(item_id = %item_id, error = %e, "pipeline run failed");
                fail_item(&ctx, &item_id, &e.to_string()).await;
            }
            Err(_) => {
                metrics::counter!("vidnote_runs_failed_total").increment(1);
                error!(item_id = %item_id, "pipeline run panicked");
                fail_item(&ctx, &item_id, "processing task failed unexpectedly").await;
            }
        }

        ctx.registry.remove(&item_id).await;
    })
}

/// Run the stage sequence for one item to completion or first unrecoverable
/// failure.
async fn run_item(ctx: &Arc<PipelineContext>, item_id: &ItemId) -> PipelineResult<()> {
    let mut record = ctx
        .store
        .get_item(item_id)
        .await?
        .ok_or_else(|| PipelineError::MissingItem(item_id.clone()))?;

    // Stage 1: download
    record.set_progress(
        ItemStatus::Processing,
        step::DOWNLOADING,
        PROGRESS_DOWNLOAD_START,
    );
    commit(ctx, &record).await?;

    let audio_path = ctx.artifacts.audio_path(&record.media_key);
    let metadata_path = ctx.artifacts.metadata_path(&record.media_key);

    let metadata = ctx
        .fetcher
        .fetch(&record.source_url, &audio_path, &metadata_path)
        .await
        .map_err(|e| PipelineError::Download(download_cause(e)))?;

    // Persist real metadata now, even though later stages may still fail: a
    // partially-processed item shows its actual title rather than a
    // placeholder.
    record.title = metadata.title.clone();
    record.thumbnail_url = metadata.thumbnail.clone();
    record.set_progress(
        ItemStatus::Processing,
        step::DOWNLOADING,
        PROGRESS_DOWNLOAD_DONE,
    );
    commit(ctx, &record).await?;

    // Stage 2: transcribe
    record.set_progress(
        ItemStatus::Processing,
        step::TRANSCRIBING,
        PROGRESS_TRANSCRIBE_START,
    );
    commit(ctx, &record).await?;

    let transcription = match ctx
        .transcriber()
        .transcribe(&record.media_key, &audio_path)
        .await
    {
        Ok(transcription) => transcription,
        Err(e) => {
            if e.triggers_cache_cleanup() {
                cleanup_poisoned_cache(ctx, &record.media_key).await;
            }
            return Err(e.into());
        }
    };

    record.transcript_path = Some(
        ctx.artifacts
            .transcription_path(&record.media_key)
            .to_string_lossy()
            .into_owned(),
    );

    // Stage 3: summarize
    record.set_progress(
        ItemStatus::Processing,
        step::SUMMARIZING,
        PROGRESS_SUMMARIZE_START,
    );
    commit(ctx, &record).await?;

    let summary =
        summarize::summarize(ctx.generator.as_ref(), &transcription.text, &record.title).await;
    record.summary = Some(summary.clone());
    record.set_progress(
        ItemStatus::Processing,
        step::SUMMARIZING,
        PROGRESS_SUMMARY_DONE,
    );
    commit(ctx, &record).await?;

    // Stage 4: categorize. Non-fatal: an item is done even without a
    // category.
    record.set_progress(
        ItemStatus::Processing,
        step::CATEGORIZING,
        PROGRESS_CATEGORIZE_START,
    );
    commit(ctx, &record).await?;

    match categorize::auto_categorize(&ctx.store, ctx.generator.as_ref(), &record.title, &summary)
        .await
    {
        Ok(Some(category)) => {
            info!(item_id = %record.id, category = %category.name, "category assigned");
            record.category_id = Some(category.id);
        }
        Ok(None) => {}
        Err(e) => {
            warn!(
                item_id = %record.id,
                error = %e,
                "categorization failed, completing without category"
            );
        }
    }

    record.complete();
    commit(ctx, &record).await?;

    Ok(())
}

/// Underlying cause of a fetch failure, without the wrapper's own prefix.
fn download_cause(e: MediaError) -> String {
    match e {
        MediaError::DownloadFailed { message } | MediaError::MetadataFailed { message } => message,
        other => other.to_string(),
    }
}

/// Update the durable record, then broadcast the matching snapshot.
async fn commit(ctx: &PipelineContext, record: &ItemRecord) -> PipelineResult<()> {
    ctx.store.update_item(record.clone()).await?;
    ctx.registry
        .set_status(
            &record.id,
            record.status,
            Some(&record.current_step),
            Some(record.progress),
        )
        .await;
    Ok(())
}

/// Delete the poisoned audio blob and fetch-metadata sidecar so the next
/// submission re-downloads from scratch. Scoped strictly to this item's
/// media key; the transcription sidecar is left alone.
async fn cleanup_poisoned_cache(ctx: &PipelineContext, media_key: &str) {
    warn!(media_key = %media_key, "removing poisoned audio cache");
    if let Err(e) = ctx.artifacts.remove_audio(media_key).await {
        warn!(media_key = %media_key, error = %e, "failed to remove cached audio");
    }
    if let Err(e) = ctx.artifacts.remove_metadata(media_key).await {
        warn!(media_key = %media_key, error = %e, "failed to remove metadata sidecar");
    }
}

/// Record a terminal failure: durable record first, then the broadcast.
async fn fail_item(ctx: &PipelineContext, item_id: &ItemId, message: &str) {
    match ctx.store.get_item(item_id).await {
        Ok(Some(mut record)) => {
            record.fail(message);
            if let Err(e) = ctx.store.update_item(record).await {
                error!(item_id = %item_id, error = %e, "failed to persist error state");
            }
        }
        Ok(None) => {
            warn!(item_id = %item_id, "record vanished before error could be persisted");
        }
        Err(e) => {
            error!(item_id = %item_id, error = %e, "failed to load record for error state");
        }
    }

    ctx.registry
        .set_status(item_id, ItemStatus::Error, Some(step::ERROR), Some(0))
        .await;
}
