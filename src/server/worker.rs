//! Background processing of one submitted download.

use crate::config::QualityConfig;
use crate::core::batch::{AutoContinue, BatchRunner, PassObserver, RetryPolicy};
use crate::core::descriptor::{classify, Descriptor, MediaType};
use crate::core::dispatch::Outcome;
use crate::core::registry::{TaskRegistry, TaskStatus};
use crate::server::state::AppState;
use std::sync::Arc;
use tracing::{info, warn};

/// Mirrors batch progress into a task: 50% at the start, up to 90% at the
/// last item.
struct TaskObserver {
    registry: Arc<TaskRegistry>,
    task_id: String,
}

impl PassObserver for TaskObserver {
    fn item_started(&mut self, index: usize, total: usize, _url: &str, _descriptor: &Descriptor) {
        let progress = 50 + (index * 40 / total.max(1)) as u8;
        self.registry.update(
            &self.task_id,
            TaskStatus::Processing,
            progress,
            format!("Downloading item {} of {}", index + 1, total),
        );
    }

    fn item_finished(&mut self, _index: usize, _total: usize, url: &str, outcome: &Outcome) {
        if let Outcome::Failed(reason) = outcome {
            warn!(task_id = %self.task_id, url, reason = %reason, "artist item failed");
        }
    }
}

/// Runs one task to completion. Never retried.
pub async fn process_task(state: AppState, task_id: String, url: String, quality: QualityConfig) {
    let registry = state.registry.clone();
    let _permit = match state.workers.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            registry.update(&task_id, TaskStatus::Failed, 0, "Server is shutting down");
            return;
        }
    };

    registry.update(&task_id, TaskStatus::Processing, 10, "Starting download...");

    let token = match state.services.tokens.token().await {
        Ok(token) => token,
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "token acquisition failed");
            registry.update(&task_id, TaskStatus::Failed, 10, "Failed to get authorization token");
            return;
        }
    };
    registry.update(&task_id, TaskStatus::Processing, 20, "Token obtained, analyzing content...");

    let descriptor = classify(&url);
    let (status, message) = if descriptor.media_type == MediaType::Artist {
        registry.update(&task_id, TaskStatus::Processing, 30, "Processing artist...");
        run_artist(&state, &task_id, &url, &token, &quality).await
    } else {
        registry.update(
            &task_id,
            TaskStatus::Processing,
            30,
            format!("Downloading {}...", descriptor.media_type.label().to_lowercase()),
        );
        let router = state
            .services
            .router(&state.config, &state.config.artist_folder_format);
        let outcome = router.dispatch(&descriptor, &token, &quality).await;
        terminal_for(&outcome)
    };

    info!(task_id = %task_id, ?status, message = %message, "task finished");
    let progress = if status == TaskStatus::Completed { 100 } else { 0 };
    registry.update(&task_id, status, progress, message);
}

async fn run_artist(
    state: &AppState,
    task_id: &str,
    url: &str,
    token: &str,
    quality: &QualityConfig,
) -> (TaskStatus, String) {
    let expansion = match state.services.expander(&state.config).expand(url, token).await {
        Ok(expansion) => expansion,
        Err(e) => return (TaskStatus::Failed, e.to_string()),
    };
    if expansion.urls.is_empty() {
        return (TaskStatus::Failed, "No albums found for this artist".to_string());
    }

    let total = expansion.urls.len();
    state.registry.update(
        task_id,
        TaskStatus::Processing,
        50,
        format!("Downloading {total} items..."),
    );

    let router = state.services.router(&state.config, &expansion.folder_format);
    let runner = BatchRunner::new(&router, token, quality, RetryPolicy::single_pass());
    let mut observer = TaskObserver {
        registry: state.registry.clone(),
        task_id: task_id.to_string(),
    };
    let report = runner
        .run(&expansion.urls, &mut observer, &mut AutoContinue)
        .await;

    match report.failed.first() {
        None if report.counter.warnings() > 0 => (
            TaskStatus::Completed,
            format!(
                "Downloaded {} items by {} with {} warnings",
                report.counter.success,
                expansion.artist_name,
                report.counter.warnings()
            ),
        ),
        None => (
            TaskStatus::Completed,
            format!("Downloaded {} items by {}", report.counter.success, expansion.artist_name),
        ),
        Some((_, reason)) => (
            TaskStatus::Failed,
            format!("{} of {} items failed: {}", report.failed.len(), total, reason),
        ),
    }
}

/// Final task state for a single dispatch.
pub fn terminal_for(outcome: &Outcome) -> (TaskStatus, String) {
    match outcome {
        Outcome::Success => (TaskStatus::Completed, "Download completed successfully".to_string()),
        Outcome::SkippedPrecondition(reason) => (TaskStatus::Completed, format!("Skipped: {reason}")),
        Outcome::Unavailable(reason) => (
            TaskStatus::Completed,
            format!("Completed with warnings: unavailable: {reason}"),
        ),
        Outcome::NotSong(reason) => (
            TaskStatus::Completed,
            format!("Completed with warnings: not a song: {reason}"),
        ),
        Outcome::Failed(reason) => (TaskStatus::Failed, format!("Download failed: {reason}")),
    }
}
