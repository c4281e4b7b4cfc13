use crate::actions::{
    activate, ascend, begin_search, cancel_search, clear_filter, commit_search, enter_marked_view,
    exit_to_normal, move_selection, refresh, search_backspace, search_input, select_and_preview,
    send_task, submit_prompt, toggle_mark,
};
use crate::app::{
    App, BackendEvent, BackendTask, FailedRequest, Mutation, PromptKind, RefreshFocus,
    RenderInstruction,
};
use crate::domain::{BackendError, PreviewResult};
use crate::input::{Command, route_key};
use anyhow::Result;
use crossterm::event::KeyEvent;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn handle_backend_event(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    event: BackendEvent,
) -> Result<()> {
    app.request_finished();

    match event {
        BackendEvent::Refreshed {
            seq,
            focus,
            path,
            entries,
        } => {
            if !app.is_current_listing(seq) {
                tracing::debug!(seq, "discarding stale listing");
                return Ok(());
            }
            app.apply_listing(path, entries, focus);
            if app.entries().is_empty() {
                app.emit(RenderInstruction::ClearPreview);
                return Ok(());
            }
            let index = app.selected_index();
            select_and_preview(app, task_tx, index, false)?;
        }
        BackendEvent::PreviewLoaded {
            seq,
            index,
            commit,
            listing_seq,
            preview,
        } => {
            if !app.is_current_preview(seq) {
                tracing::debug!(seq, index, "discarding stale preview");
                return Ok(());
            }
            let descend = commit
                && preview == PreviewResult::DirectoryMarker
                && app.mode().supports_descent()
                && app.is_current_listing(listing_seq);
            if descend {
                return send_task(app, task_tx, BackendTask::Mutate(Mutation::Descend { index }));
            }
            app.emit(RenderInstruction::RenderPreview(preview));
            if commit && app.selection_mut().set(index) {
                app.emit(RenderInstruction::SetSelection(index));
            }
        }
        BackendEvent::Mutated(mutation) => handle_mutation_ack(app, task_tx, mutation)?,
        BackendEvent::Failed { request, error } => handle_failure(app, task_tx, request, error)?,
    }

    Ok(())
}

fn handle_mutation_ack(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    mutation: Mutation,
) -> Result<()> {
    if mutation.holds_lock() {
        app.release_lock();
    }

    match mutation {
        Mutation::Mark { index } => {
            tracing::debug!(index, "mark acknowledged");
            Ok(())
        }
        Mutation::Descend { .. } | Mutation::Parent => {
            app.set_requested_filter(String::new());
            refresh(app, task_tx, RefreshFocus::Reset)
        }
        Mutation::Path { path } => {
            tracing::info!(path = %path.display(), "jumped to directory");
            app.set_requested_filter(String::new());
            refresh(app, task_tx, RefreshFocus::Reset)
        }
        Mutation::Filter { pattern } => {
            tracing::debug!(%pattern, "filter applied");
            refresh(app, task_tx, RefreshFocus::Reset)
        }
        Mutation::Copy { destination } => {
            tracing::info!(destination = %destination.display(), "copy finished");
            refresh(app, task_tx, RefreshFocus::Keep)
        }
    }
}

fn handle_failure(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: FailedRequest,
    error: BackendError,
) -> Result<()> {
    match request {
        FailedRequest::Listing { seq } => {
            if !app.is_current_listing(seq) {
                tracing::debug!(seq, %error, "discarding stale listing failure");
                return Ok(());
            }
            // The last good listing stays on screen. No refresh here, it would fail the same way.
            tracing::warn!(%error, "refresh failed");
            app.show_error(error.to_string());
            Ok(())
        }
        FailedRequest::Preview { seq } => {
            if !app.is_current_preview(seq) {
                tracing::debug!(seq, %error, "discarding stale preview failure");
                return Ok(());
            }
            tracing::warn!(%error, "preview failed");
            if let BackendError::MalformedResponse(message) = error {
                app.emit(RenderInstruction::RenderPreview(PreviewResult::text(message)));
                return Ok(());
            }
            let not_found = matches!(error, BackendError::NotFound(_));
            app.show_error(error.to_string());
            if not_found {
                refresh(app, task_tx, RefreshFocus::Keep)?;
            }
            Ok(())
        }
        FailedRequest::Mutation(mutation) => {
            if mutation.holds_lock() {
                app.release_lock();
            }
            tracing::warn!(operation = mutation.label(), %error, "backend mutation failed");
            app.show_error(error.to_string());

            let reconcile = matches!(mutation, Mutation::Mark { .. })
                || matches!(error, BackendError::NotFound(_));
            if reconcile {
                refresh(app, task_tx, RefreshFocus::Keep)?;
            }
            Ok(())
        }
    }
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let command = route_key(key, app.route_context());
    dispatch(app, task_tx, command)
}

pub(crate) fn dispatch(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Ignore => {}
        Command::Quit => app.should_quit = true,
        Command::MoveUp => move_selection(app, task_tx, -1)?,
        Command::MoveDown => move_selection(app, task_tx, 1)?,
        Command::Activate => activate(app, task_tx)?,
        Command::Ascend => ascend(app, task_tx)?,
        Command::ToggleMark => toggle_mark(app, task_tx)?,
        Command::EnterMarkedView => enter_marked_view(app, task_tx)?,
        Command::ExitToNormal => exit_to_normal(app, task_tx)?,
        Command::BeginSearch => begin_search(app)?,
        Command::SearchInput(c) => search_input(app, task_tx, c)?,
        Command::SearchBackspace => search_backspace(app, task_tx)?,
        Command::CommitSearch => commit_search(app)?,
        Command::CancelSearch => cancel_search(app, task_tx)?,
        Command::ClearFilter => clear_filter(app, task_tx)?,
        Command::Refresh => refresh(app, task_tx, RefreshFocus::Keep)?,
        Command::OpenPathPrompt => app.open_prompt(PromptKind::GoToPath),
        Command::OpenCopyPrompt => app.open_prompt(PromptKind::CopyDestination),
        Command::PromptInput(c) => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.value.push(c);
            }
        }
        Command::PromptBackspace => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.value.pop();
            }
        }
        Command::PromptSubmit => submit_prompt(app, task_tx)?,
        Command::PromptCancel => {
            app.close_prompt();
        }
    }
    Ok(())
}
