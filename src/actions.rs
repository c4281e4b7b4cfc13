use crate::app::{App, BackendTask, Mutation, PromptKind, RefreshFocus, RenderInstruction};
use crate::mode::{ModeError, ModeKind, SessionMode};
use crate::search::SearchOutcome;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn send_task(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: BackendTask,
) -> Result<()> {
    app.request_started();
    tracing::debug!(?task, "issuing backend task");
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))
}

/// Fetches the current path and the listing of the active mode.
pub(crate) fn refresh(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    focus: RefreshFocus,
) -> Result<()> {
    let seq = app.next_listing_seq();
    let source = app.mode().listing_source();
    send_task(app, task_tx, BackendTask::Refresh { seq, source, focus })
}

/// `commit` separates cursor movement (preview only) from activation, which
/// may descend when the preview turns out to be a directory.
pub(crate) fn select_and_preview(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    index: usize,
    commit: bool,
) -> Result<()> {
    let seq = app.next_preview_seq();
    let listing_seq = app.listing_seq();
    let source = app.mode().listing_source();
    send_task(
        app,
        task_tx,
        BackendTask::LoadPreview {
            seq,
            index,
            source,
            commit,
            listing_seq,
        },
    )
}

pub(crate) fn move_selection(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    delta: isize,
) -> Result<()> {
    if !app.selection_mut().move_by(delta) {
        return Ok(());
    }
    let index = app.selected_index();
    app.emit(RenderInstruction::SetSelection(index));
    select_and_preview(app, task_tx, index, false)
}

pub(crate) fn activate(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    if app.entries().is_empty() {
        return Ok(());
    }
    let index = app.selected_index();
    select_and_preview(app, task_tx, index, true)
}

/// Flips the mark locally right away; the next refresh brings the backend's view.
pub(crate) fn toggle_mark(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    if app.mode().kind() != ModeKind::Normal {
        return Ok(());
    }
    let Some(index) = app.toggle_selected_mark() else {
        return Ok(());
    };
    send_task(app, task_tx, BackendTask::Mutate(Mutation::Mark { index }))
}

pub(crate) fn ascend(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    match app.mode().kind() {
        ModeKind::MarkedView => {
            app.mode.exit_to_normal();
            refresh(app, task_tx, RefreshFocus::Reset)
        }
        ModeKind::Search => {
            app.mode.exit_to_normal();
            refresh(app, task_tx, RefreshFocus::Keep)
        }
        ModeKind::Normal => send_task(app, task_tx, BackendTask::Mutate(Mutation::Parent)),
    }
}

pub(crate) fn enter_marked_view(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match app.mode.enter_marked_view() {
        Ok(true) => refresh(app, task_tx, RefreshFocus::Reset),
        Ok(false) => Ok(()),
        Err(err) => report_mode_error(app, err),
    }
}

pub(crate) fn exit_to_normal(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    if app.mode().kind() == ModeKind::Normal {
        return Ok(());
    }
    app.mode.exit_to_normal();
    refresh(app, task_tx, RefreshFocus::Reset)
}

pub(crate) fn begin_search(app: &mut App) -> Result<()> {
    match app.mode.begin_search() {
        Ok(_) => Ok(()),
        Err(err) => report_mode_error(app, err),
    }
}

pub(crate) fn search_input(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    c: char,
) -> Result<()> {
    let Some(search) = app.mode.search_mut() else {
        return Ok(());
    };
    let pattern = search.append_char(c).to_string();
    request_filter(app, task_tx, pattern)
}

pub(crate) fn search_backspace(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let Some(pattern) = app
        .mode
        .search_mut()
        .and_then(|search| search.backspace().map(str::to_string))
    else {
        return Ok(());
    };
    request_filter(app, task_tx, pattern)
}

/// Leaves Search with the backend filter in place.
pub(crate) fn commit_search(app: &mut App) -> Result<()> {
    match app.mode.exit_to_normal() {
        SessionMode::Search(search) => {
            if let SearchOutcome::Keep(pattern) = search.commit() {
                tracing::debug!(%pattern, "search committed");
            }
        }
        other => app.mode = other,
    }
    Ok(())
}

pub(crate) fn cancel_search(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    match app.mode.exit_to_normal() {
        SessionMode::Search(mut search) => {
            if search.cancel() == SearchOutcome::Reset && !app.requested_filter().is_empty() {
                request_filter(app, task_tx, String::new())
            } else {
                Ok(())
            }
        }
        other => {
            app.mode = other;
            Ok(())
        }
    }
}

/// Drops a committed filter while browsing.
pub(crate) fn clear_filter(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    if app.mode().kind() != ModeKind::Normal || app.requested_filter().is_empty() {
        return Ok(());
    }
    request_filter(app, task_tx, String::new())
}

fn request_filter(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    pattern: String,
) -> Result<()> {
    app.set_requested_filter(pattern.clone());
    send_task(app, task_tx, BackendTask::Mutate(Mutation::Filter { pattern }))
}

pub(crate) fn go_to_path(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    path: PathBuf,
) -> Result<()> {
    send_locked(app, task_tx, Mutation::Path { path })
}

pub(crate) fn begin_copy(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    destination: PathBuf,
) -> Result<()> {
    send_locked(app, task_tx, Mutation::Copy { destination })
}

/// Issues a long-running mutation under the operation lock. The lock is
/// released by the completion handler, on success and on failure alike.
fn send_locked(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    mutation: Mutation,
) -> Result<()> {
    if !app.acquire_lock() {
        app.show_error(format!(
            "cannot start {}: another operation is still running",
            mutation.label()
        ));
        return Ok(());
    }
    tracing::info!(operation = mutation.label(), "starting locked operation");
    if let Err(err) = send_task(app, task_tx, BackendTask::Mutate(mutation)) {
        app.release_lock();
        return Err(err);
    }
    Ok(())
}

pub(crate) fn submit_prompt(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let Some(prompt) = app.close_prompt() else {
        return Ok(());
    };
    let Some(path) = resolve_prompt_path(app.current_path(), &prompt.value) else {
        return Ok(());
    };
    match prompt.kind {
        PromptKind::GoToPath => go_to_path(app, task_tx, path),
        PromptKind::CopyDestination => begin_copy(app, task_tx, path),
    }
}

/// `~` expands to the home directory; relative input is taken from `current`.
pub(crate) fn resolve_prompt_path(current: &str, input: &str) -> Option<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    let path = Path::new(input);
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        Some(Path::new(current).join(path))
    }
}

fn report_mode_error(app: &mut App, err: ModeError) -> Result<()> {
    tracing::debug!(%err, "rejected mode transition");
    app.show_error(err.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, ListingSource};
    use crate::lock::OperationLock;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn app_with(names: &[&str]) -> App {
        let mut app = App::new(OperationLock::default());
        let entries = names.iter().map(|name| Entry::new(*name)).collect();
        app.apply_listing("/work".to_string(), entries, RefreshFocus::Reset);
        app.take_renders();
        app
    }

    fn drain(rx: &mut UnboundedReceiver<BackendTask>) -> Vec<BackendTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    #[test]
    fn move_at_bounds_issues_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a", "b"]);

        move_selection(&mut app, &tx, -1).expect("move");
        assert!(drain(&mut rx).is_empty());
        assert_eq!(app.selected_index(), 0);

        move_selection(&mut app, &tx, 1).expect("move");
        move_selection(&mut app, &tx, 1).expect("move");
        assert_eq!(app.selected_index(), 1);
        assert_eq!(drain(&mut rx).len(), 1);
        assert_eq!(app.take_renders(), vec![RenderInstruction::SetSelection(1)]);
    }

    #[test]
    fn move_previews_without_commit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a", "b"]);
        move_selection(&mut app, &tx, 1).expect("move");
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::LoadPreview {
                seq: 1,
                index: 1,
                source: ListingSource::Files,
                commit: false,
                listing_seq: 0,
            }]
        );
    }

    #[test]
    fn toggle_mark_flips_only_selected_entry() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a.txt", "b.txt"]);

        toggle_mark(&mut app, &tx).expect("mark");

        assert_eq!(app.selected_index(), 0);
        assert!(app.entries()[0].marked);
        assert!(!app.entries()[1].marked);
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Mutate(Mutation::Mark { index: 0 })]
        );
    }

    #[test]
    fn toggle_mark_is_ignored_outside_normal_mode() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a.txt"]);
        app.mode = SessionMode::MarkedView;
        toggle_mark(&mut app, &tx).expect("mark");
        assert!(drain(&mut rx).is_empty());
        assert!(!app.entries()[0].marked);
    }

    #[test]
    fn typing_issues_full_pattern_per_char() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["foo", "bar"]);
        begin_search(&mut app).expect("search");
        search_input(&mut app, &tx, 'f').expect("input");
        search_input(&mut app, &tx, 'o').expect("input");
        assert_eq!(
            drain(&mut rx),
            vec![
                BackendTask::Mutate(Mutation::Filter {
                    pattern: "f".to_string()
                }),
                BackendTask::Mutate(Mutation::Filter {
                    pattern: "fo".to_string()
                }),
            ]
        );
        assert_eq!(app.requested_filter(), "fo");

        search_backspace(&mut app, &tx).expect("backspace");
        search_backspace(&mut app, &tx).expect("backspace");
        search_backspace(&mut app, &tx).expect("backspace");
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(app.requested_filter(), "");
    }

    #[test]
    fn empty_search_round_trip_issues_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a", "b"]);

        begin_search(&mut app).expect("search");
        cancel_search(&mut app, &tx).expect("cancel");
        begin_search(&mut app).expect("search");
        commit_search(&mut app).expect("commit");

        assert!(drain(&mut rx).is_empty());
        assert!(app.take_renders().is_empty());
        assert_eq!(app.mode().kind(), ModeKind::Normal);
    }

    #[test]
    fn cancel_resets_requested_filter() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);
        begin_search(&mut app).expect("search");
        search_input(&mut app, &tx, 'a').expect("input");
        drain(&mut rx);

        cancel_search(&mut app, &tx).expect("cancel");
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Mutate(Mutation::Filter {
                pattern: String::new()
            })]
        );
        assert_eq!(app.mode().kind(), ModeKind::Normal);
    }

    #[test]
    fn commit_keeps_filter_and_clear_filter_drops_it() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);
        begin_search(&mut app).expect("search");
        search_input(&mut app, &tx, 'a').expect("input");
        commit_search(&mut app).expect("commit");
        drain(&mut rx);
        assert_eq!(app.requested_filter(), "a");

        clear_filter(&mut app, &tx).expect("clear");
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Mutate(Mutation::Filter {
                pattern: String::new()
            })]
        );
        clear_filter(&mut app, &tx).expect("clear");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn marked_view_rejects_search_with_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);
        enter_marked_view(&mut app, &tx).expect("marked");
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Refresh {
                seq: 1,
                source: ListingSource::Marked,
                focus: RefreshFocus::Reset,
            }]
        );

        begin_search(&mut app).expect("search");
        assert_eq!(app.mode().kind(), ModeKind::MarkedView);
        assert_eq!(
            app.take_renders(),
            vec![RenderInstruction::ShowError(
                "cannot switch from MARKED to SEARCH mode".to_string()
            )]
        );
    }

    #[test]
    fn ascend_depends_on_mode() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);

        ascend(&mut app, &tx).expect("parent");
        assert_eq!(drain(&mut rx), vec![BackendTask::Mutate(Mutation::Parent)]);

        app.mode = SessionMode::MarkedView;
        ascend(&mut app, &tx).expect("exit marked");
        assert_eq!(app.mode().kind(), ModeKind::Normal);
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Refresh {
                seq: 1,
                source: ListingSource::Files,
                focus: RefreshFocus::Reset,
            }]
        );

        begin_search(&mut app).expect("search");
        ascend(&mut app, &tx).expect("exit search");
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Refresh {
                seq: 2,
                source: ListingSource::Files,
                focus: RefreshFocus::Keep,
            }]
        );
    }

    #[test]
    fn locked_operation_rejects_second_start() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);

        begin_copy(&mut app, &tx, PathBuf::from("/dest")).expect("copy");
        assert!(app.is_locked());
        go_to_path(&mut app, &tx, PathBuf::from("/elsewhere")).expect("path");

        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Mutate(Mutation::Copy {
                destination: PathBuf::from("/dest")
            })]
        );
        assert!(matches!(
            app.take_renders().as_slice(),
            [RenderInstruction::ShowError(_)]
        ));
    }

    #[test]
    fn failed_dispatch_releases_lock() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let lock = OperationLock::default();
        let mut app = App::new(lock.clone());
        assert!(begin_copy(&mut app, &tx, PathBuf::from("/dest")).is_err());
        assert_eq!(lock.held_count(), 0);
    }

    #[test]
    fn prompt_paths_resolve_against_current_directory() {
        assert_eq!(
            resolve_prompt_path("/work", "sub/dir"),
            Some(PathBuf::from("/work/sub/dir"))
        );
        assert_eq!(
            resolve_prompt_path("/work", " /abs "),
            Some(PathBuf::from("/abs"))
        );
        assert_eq!(resolve_prompt_path("/work", "   "), None);
    }

    #[test]
    fn submit_prompt_starts_copy() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app_with(&["a"]);
        app.open_prompt(PromptKind::CopyDestination);
        if let Some(prompt) = app.prompt.as_mut() {
            prompt.value.push_str("backup");
        }
        submit_prompt(&mut app, &tx).expect("submit");
        assert!(app.prompt.is_none());
        assert_eq!(
            drain(&mut rx),
            vec![BackendTask::Mutate(Mutation::Copy {
                destination: PathBuf::from("/work/backup")
            })]
        );
    }
}
