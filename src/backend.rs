use crate::app::{BackendEvent, BackendTask, FailedRequest, Mutation};
use crate::domain::{BackendError, BackendResult, ListingSource};
use crate::infra::BackendGateway;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Runs backend tasks one at a time, in the order they were issued, so a
/// mutation is always visible to a refresh issued after it.
pub(crate) async fn worker_loop(
    gateway: Arc<dyn BackendGateway>,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        let event = run_task(&gateway, task).await;
        if event_tx.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("backend worker stopped");
}

async fn run_task(gateway: &Arc<dyn BackendGateway>, task: BackendTask) -> BackendEvent {
    match task {
        BackendTask::Refresh { seq, source, focus } => {
            let g = Arc::clone(gateway);
            let result = run_blocking(move || {
                let path = g.current_path()?;
                let entries = match source {
                    ListingSource::Files => g.files()?,
                    ListingSource::Marked => g.marked_files()?,
                };
                Ok((path, entries))
            })
            .await;
            match result {
                Ok((path, entries)) => BackendEvent::Refreshed {
                    seq,
                    focus,
                    path,
                    entries,
                },
                Err(error) => BackendEvent::Failed {
                    request: FailedRequest::Listing { seq },
                    error,
                },
            }
        }
        BackendTask::LoadPreview {
            seq,
            index,
            source,
            commit,
            listing_seq,
        } => {
            let g = Arc::clone(gateway);
            let result = run_blocking(move || match source {
                ListingSource::Files => g.preview(index),
                ListingSource::Marked => g.marked_preview(index),
            })
            .await;
            match result {
                Ok(preview) => BackendEvent::PreviewLoaded {
                    seq,
                    index,
                    commit,
                    listing_seq,
                    preview,
                },
                Err(error) => BackendEvent::Failed {
                    request: FailedRequest::Preview { seq },
                    error,
                },
            }
        }
        BackendTask::Mutate(mutation) => {
            let g = Arc::clone(gateway);
            let m = mutation.clone();
            let result = run_blocking(move || apply_mutation(g.as_ref(), &m)).await;
            match result {
                Ok(()) => BackendEvent::Mutated(mutation),
                Err(error) => BackendEvent::Failed {
                    request: FailedRequest::Mutation(mutation),
                    error,
                },
            }
        }
    }
}

fn apply_mutation(gateway: &dyn BackendGateway, mutation: &Mutation) -> BackendResult<()> {
    match mutation {
        Mutation::Mark { index } => gateway.mark_file(*index),
        Mutation::Descend { index } => gateway.go_to_directory(*index),
        Mutation::Parent => gateway.go_to_parent(),
        Mutation::Path { path } => gateway.go_to_path(path),
        Mutation::Filter { pattern } => gateway.filter_files_by_regex(pattern),
        Mutation::Copy { destination } => gateway.copy_marked(destination),
    }
}

async fn run_blocking<T, F>(f: F) -> BackendResult<T>
where
    F: FnOnce() -> BackendResult<T> + Send + 'static,
    T: Send + 'static,
{
    flatten_join(tokio::task::spawn_blocking(f).await)
}

fn flatten_join<T>(res: Result<BackendResult<T>, tokio::task::JoinError>) -> BackendResult<T> {
    match res {
        Ok(result) => result,
        Err(err) => Err(BackendError::BackendUnavailable(format!(
            "backend call aborted: {err}"
        ))),
    }
}
