use crate::domain::{BackendError, BackendResult, Entry, PreviewResult};
use crate::preview::load_preview;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// RPC surface of the file-system service driven by the session controller.
///
/// Indices always refer to the listing the service would return right now
/// (`files` for the plain calls, `marked_files` for the marked ones).
pub trait BackendGateway: Send + Sync {
    fn current_path(&self) -> BackendResult<String>;
    fn files(&self) -> BackendResult<Vec<Entry>>;
    fn marked_files(&self) -> BackendResult<Vec<Entry>>;
    fn preview(&self, index: usize) -> BackendResult<PreviewResult>;
    fn marked_preview(&self, index: usize) -> BackendResult<PreviewResult>;
    fn mark_file(&self, index: usize) -> BackendResult<()>;
    fn go_to_directory(&self, index: usize) -> BackendResult<()>;
    fn go_to_parent(&self) -> BackendResult<()>;
    fn go_to_path(&self, path: &Path) -> BackendResult<()>;
    /// An empty pattern clears the filter.
    fn filter_files_by_regex(&self, pattern: &str) -> BackendResult<()>;
    fn copy_marked(&self, destination: &Path) -> BackendResult<()>;
}

#[derive(Debug)]
struct LocalState {
    cwd: PathBuf,
    marked: BTreeSet<PathBuf>,
    filter: Option<Regex>,
}

/// Serves the gateway from the local file system.
#[derive(Debug)]
pub struct LocalBackend {
    state: Mutex<LocalState>,
    show_hidden: bool,
    preview_max_bytes: usize,
}

impl LocalBackend {
    pub fn new(start_dir: PathBuf, show_hidden: bool, preview_max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(LocalState {
                cwd: start_dir,
                marked: BTreeSet::new(),
                filter: None,
            }),
            show_hidden,
            preview_max_bytes,
        }
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, LocalState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::BackendUnavailable("backend state poisoned".to_string()))
    }

    fn listed_paths(&self, state: &LocalState) -> BackendResult<Vec<(PathBuf, bool)>> {
        let read_dir = fs::read_dir(&state.cwd).map_err(|err| io_error(err, &state.cwd))?;

        let mut paths = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|err| io_error(err, &state.cwd))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !self.show_hidden && name.starts_with('.') {
                continue;
            }
            if let Some(filter) = &state.filter
                && !filter.is_match(&name)
            {
                continue;
            }
            let path = entry.path();
            let is_dir = path.is_dir();
            paths.push((path, is_dir));
        }

        paths.sort_by(|(a, a_dir), (b, b_dir)| {
            b_dir
                .cmp(a_dir)
                .then_with(|| sort_key(a).cmp(&sort_key(b)))
        });
        Ok(paths)
    }

    fn path_at(&self, state: &LocalState, index: usize) -> BackendResult<PathBuf> {
        self.listed_paths(state)?
            .into_iter()
            .nth(index)
            .map(|(path, _)| path)
            .ok_or_else(|| stale_index(index))
    }

    fn marked_path_at(state: &LocalState, index: usize) -> BackendResult<PathBuf> {
        state
            .marked
            .iter()
            .nth(index)
            .cloned()
            .ok_or_else(|| stale_index(index))
    }

    fn change_dir(state: &mut LocalState, dir: PathBuf) {
        tracing::debug!(from = %state.cwd.display(), to = %dir.display(), "changing directory");
        state.cwd = dir;
        state.filter = None;
    }
}

impl BackendGateway for LocalBackend {
    fn current_path(&self) -> BackendResult<String> {
        Ok(self.lock()?.cwd.display().to_string())
    }

    fn files(&self) -> BackendResult<Vec<Entry>> {
        let state = self.lock()?;
        let entries = self
            .listed_paths(&state)?
            .into_iter()
            .map(|(path, is_dir)| Entry {
                name: display_name(&path, is_dir),
                marked: state.marked.contains(&path),
            })
            .collect();
        Ok(entries)
    }

    fn marked_files(&self) -> BackendResult<Vec<Entry>> {
        let state = self.lock()?;
        Ok(state
            .marked
            .iter()
            .map(|path| {
                let mut name = path.display().to_string();
                if path.is_dir() {
                    name.push('/');
                }
                Entry { name, marked: true }
            })
            .collect())
    }

    fn preview(&self, index: usize) -> BackendResult<PreviewResult> {
        let path = {
            let state = self.lock()?;
            self.path_at(&state, index)?
        };
        load_preview(&path, self.preview_max_bytes)
    }

    fn marked_preview(&self, index: usize) -> BackendResult<PreviewResult> {
        let path = {
            let state = self.lock()?;
            Self::marked_path_at(&state, index)?
        };
        load_preview(&path, self.preview_max_bytes)
    }

    fn mark_file(&self, index: usize) -> BackendResult<()> {
        let mut state = self.lock()?;
        let path = self.path_at(&state, index)?;
        if !state.marked.remove(&path) {
            state.marked.insert(path);
        }
        Ok(())
    }

    fn go_to_directory(&self, index: usize) -> BackendResult<()> {
        let mut state = self.lock()?;
        let path = self.path_at(&state, index)?;
        if !path.is_dir() {
            return Err(BackendError::NotFound(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        Self::change_dir(&mut state, path);
        Ok(())
    }

    fn go_to_parent(&self) -> BackendResult<()> {
        let mut state = self.lock()?;
        if let Some(parent) = state.cwd.parent().map(Path::to_path_buf) {
            Self::change_dir(&mut state, parent);
        }
        Ok(())
    }

    fn go_to_path(&self, path: &Path) -> BackendResult<()> {
        if !path.is_absolute() {
            return Err(BackendError::NotFound(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        let resolved = fs::canonicalize(path).map_err(|err| io_error(err, path))?;
        if !resolved.is_dir() {
            return Err(BackendError::NotFound(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        let mut state = self.lock()?;
        Self::change_dir(&mut state, resolved);
        Ok(())
    }

    fn filter_files_by_regex(&self, pattern: &str) -> BackendResult<()> {
        let filter = if pattern.is_empty() {
            None
        } else {
            Some(
                Regex::new(pattern)
                    .map_err(|err| BackendError::InvalidPattern(err.to_string()))?,
            )
        };
        self.lock()?.filter = filter;
        Ok(())
    }

    fn copy_marked(&self, destination: &Path) -> BackendResult<()> {
        let marked: Vec<PathBuf> = self.lock()?.marked.iter().cloned().collect();
        if !destination.is_dir() {
            return Err(BackendError::NotFound(format!(
                "destination is not a directory: {}",
                destination.display()
            )));
        }

        let destination =
            fs::canonicalize(destination).map_err(|err| io_error(err, destination))?;
        for source in &marked {
            let source = fs::canonicalize(source).map_err(|err| io_error(err, source))?;
            if source.is_dir() && destination.starts_with(&source) {
                return Err(BackendError::PermissionDenied(format!(
                    "cannot copy {} into itself",
                    source.display()
                )));
            }
        }

        for source in &marked {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = unused_path(&destination.join(name));
            copy_recursive(source, &target).map_err(|err| io_error(err, source))?;
        }

        tracing::info!(
            count = marked.len(),
            destination = %destination.display(),
            "copied marked entries"
        );
        self.lock()?.marked.clear();
        Ok(())
    }
}

pub(crate) fn io_error(err: io::Error, path: &Path) -> BackendError {
    let message = format!("{}: {err}", path.display());
    match err.kind() {
        io::ErrorKind::NotFound => BackendError::NotFound(message),
        io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(message),
        _ => BackendError::BackendUnavailable(message),
    }
}

fn stale_index(index: usize) -> BackendError {
    BackendError::NotFound(format!("no entry at index {index}"))
}

fn display_name(path: &Path, is_dir: bool) -> String {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    if is_dir {
        name.push('/');
    }
    name
}

fn sort_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// `notes.txt` becomes `notes_1.txt`, `notes_2.txt`, ... until nothing exists there.
fn unused_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|counter| parent.join(format!("{stem}_{counter}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn copy_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PreviewKind;
    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};

    fn fixture() -> (TempDir, LocalBackend) {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.txt"), "alpha").expect("write a");
        fs::create_dir(dir.path().join("b")).expect("mkdir b");
        fs::write(dir.path().join("b").join("inner.txt"), "inner").expect("write inner");
        fs::write(dir.path().join("C.md"), "# c").expect("write c");
        fs::write(dir.path().join(".hidden"), "h").expect("write hidden");
        let backend = LocalBackend::new(dir.path().to_path_buf(), false, 1024);
        (dir, backend)
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn listing_puts_directories_first_and_skips_hidden() {
        let (_dir, backend) = fixture();
        let files = backend.files().expect("files");
        assert_eq!(names(&files), vec!["b/", "a.txt", "C.md"]);
    }

    #[test]
    fn hidden_entries_are_listed_when_enabled() {
        let (dir, _) = fixture();
        let backend = LocalBackend::new(dir.path().to_path_buf(), true, 1024);
        let files = backend.files().expect("files");
        assert!(files.iter().any(|e| e.name == ".hidden"));
    }

    #[test]
    fn descend_and_ascend_move_the_cursor() {
        let (dir, backend) = fixture();
        backend.go_to_directory(0).expect("descend");
        assert_eq!(
            backend.current_path().expect("path"),
            dir.path().join("b").display().to_string()
        );
        assert_eq!(names(&backend.files().expect("files")), vec!["inner.txt"]);

        backend.go_to_parent().expect("parent");
        assert_eq!(
            backend.current_path().expect("path"),
            dir.path().display().to_string()
        );
    }

    #[test]
    fn descending_into_a_file_is_not_found() {
        let (_dir, backend) = fixture();
        let err = backend.go_to_directory(1).expect_err("file");
        assert!(matches!(err, BackendError::NotFound(_)));
        assert!(matches!(
            backend.go_to_directory(99),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn mark_toggles_and_shows_in_marked_listing() {
        let (dir, backend) = fixture();
        backend.mark_file(1).expect("mark");
        let files = backend.files().expect("files");
        assert!(files[1].marked);
        assert!(!files[0].marked);

        let marked = backend.marked_files().expect("marked");
        assert_eq!(
            names(&marked),
            vec![dir.path().join("a.txt").display().to_string().as_str()]
        );
        assert_eq!(
            backend.marked_preview(0).expect("marked preview"),
            PreviewResult::text("alpha")
        );

        backend.mark_file(1).expect("unmark");
        assert!(backend.marked_files().expect("marked").is_empty());
    }

    #[test]
    fn regex_filter_applies_and_clears() {
        let (_dir, backend) = fixture();
        backend.filter_files_by_regex(r"\.txt$").expect("filter");
        assert_eq!(names(&backend.files().expect("files")), vec!["a.txt"]);
        assert_eq!(
            backend.preview(0).expect("preview"),
            PreviewResult::text("alpha")
        );

        backend.filter_files_by_regex("").expect("clear");
        assert_eq!(backend.files().expect("files").len(), 3);
    }

    #[test]
    fn invalid_regex_is_reported() {
        let (_dir, backend) = fixture();
        let err = backend.filter_files_by_regex("a(").expect_err("invalid");
        assert!(matches!(err, BackendError::InvalidPattern(_)));
        assert_eq!(backend.files().expect("files").len(), 3);
    }

    #[test]
    fn changing_directory_clears_filter() {
        let (_dir, backend) = fixture();
        backend.filter_files_by_regex("b").expect("filter");
        backend.go_to_directory(0).expect("descend");
        assert_eq!(names(&backend.files().expect("files")), vec!["inner.txt"]);
    }

    #[test]
    fn go_to_path_requires_absolute_directory() {
        let (dir, backend) = fixture();
        assert!(matches!(
            backend.go_to_path(Path::new("relative")),
            Err(BackendError::NotFound(_))
        ));
        assert!(backend.go_to_path(&dir.path().join("a.txt")).is_err());
        backend.go_to_path(&dir.path().join("b")).expect("jump");
        assert_eq!(names(&backend.files().expect("files")), vec!["inner.txt"]);
    }

    #[test]
    fn preview_distinguishes_directories_and_text() {
        let (_dir, backend) = fixture();
        assert_eq!(
            backend.preview(0).expect("dir"),
            PreviewResult::DirectoryMarker
        );
        assert_eq!(
            backend.preview(2).expect("text"),
            PreviewResult::FileContent {
                kind: PreviewKind::Text,
                payload: "# c".to_string(),
            }
        );
    }

    #[test]
    fn copy_marked_copies_files_and_directories() {
        let (dir, backend) = fixture();
        let dest = tempdir().expect("dest");
        backend.mark_file(0).expect("mark dir");
        backend.mark_file(1).expect("mark file");

        backend.copy_marked(dest.path()).expect("copy");

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).expect("copied file"),
            "alpha"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("b").join("inner.txt")).expect("copied dir"),
            "inner"
        );
        assert!(backend.marked_files().expect("marked").is_empty());
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn copy_into_current_directory_keeps_original() {
        let (dir, backend) = fixture();
        backend.mark_file(1).expect("mark a.txt");

        backend.copy_marked(dir.path()).expect("copy");

        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).expect("original"),
            "alpha"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("a_1.txt")).expect("copy"),
            "alpha"
        );
    }

    #[test]
    fn repeated_copies_pick_fresh_names() {
        let (dir, backend) = fixture();
        let dest = tempdir().expect("dest");
        fs::write(dest.path().join("a.txt"), "existing").expect("write existing");
        fs::write(dest.path().join("a_1.txt"), "existing").expect("write existing");
        backend.mark_file(1).expect("mark a.txt");

        backend.copy_marked(dest.path()).expect("copy");

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).expect("untouched"),
            "existing"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("a_2.txt")).expect("copy"),
            "alpha"
        );
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn copying_directory_into_itself_is_rejected() {
        let (dir, backend) = fixture();
        backend.mark_file(0).expect("mark b");

        for destination in [dir.path().join("b"), dir.path().join("b").join("nested")] {
            fs::create_dir_all(&destination).expect("mkdir");
            let err = backend.copy_marked(&destination).expect_err("self copy");
            assert!(matches!(err, BackendError::PermissionDenied(_)));
        }

        assert!(!dir.path().join("b").join("b").exists());
        assert!(!dir.path().join("b").join("nested").join("b").exists());
        assert_eq!(backend.marked_files().expect("marked").len(), 1);
    }

    #[test]
    fn copy_to_missing_destination_fails_and_keeps_marks() {
        let (dir, backend) = fixture();
        backend.mark_file(1).expect("mark");
        let err = backend
            .copy_marked(&dir.path().join("nowhere"))
            .expect_err("missing destination");
        assert!(matches!(err, BackendError::NotFound(_)));
        assert_eq!(backend.marked_files().expect("marked").len(), 1);
    }

    #[test]
    fn io_errors_map_to_taxonomy() {
        let path = Path::new("/x");
        assert!(matches!(
            io_error(io::Error::from(io::ErrorKind::NotFound), path),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            io_error(io::Error::from(io::ErrorKind::PermissionDenied), path),
            BackendError::PermissionDenied(_)
        ));
        assert!(matches!(
            io_error(io::Error::other("boom"), path),
            BackendError::BackendUnavailable(_)
        ));
    }
}
