use crate::domain::{BackendError, Entry, ListingSource, PreviewResult};
use crate::input::RouteContext;
use crate::lock::{OperationGuard, OperationLock};
use crate::mode::SessionMode;
use crate::selection::SelectionTracker;
use std::path::PathBuf;

/// Where the selection lands once a refreshed listing arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFocus {
    /// Start over at index 0.
    Reset,
    /// Keep the prior index, clamped into the new listing.
    Keep,
}

/// Backend calls that change backend state and answer with a plain acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Mark { index: usize },
    Descend { index: usize },
    Parent,
    Path { path: PathBuf },
    Filter { pattern: String },
    Copy { destination: PathBuf },
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Mark { .. } => "mark",
            Mutation::Descend { .. } => "open",
            Mutation::Parent => "parent",
            Mutation::Path { .. } => "go to path",
            Mutation::Filter { .. } => "filter",
            Mutation::Copy { .. } => "copy",
        }
    }

    /// Mutations issued under the [`OperationLock`].
    pub fn holds_lock(&self) -> bool {
        matches!(self, Mutation::Path { .. } | Mutation::Copy { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTask {
    Refresh {
        seq: u64,
        source: ListingSource,
        focus: RefreshFocus,
    },
    LoadPreview {
        seq: u64,
        index: usize,
        source: ListingSource,
        commit: bool,
        listing_seq: u64,
    },
    Mutate(Mutation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedRequest {
    Listing { seq: u64 },
    Preview { seq: u64 },
    Mutation(Mutation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Refreshed {
        seq: u64,
        focus: RefreshFocus,
        path: String,
        entries: Vec<Entry>,
    },
    PreviewLoaded {
        seq: u64,
        index: usize,
        commit: bool,
        listing_seq: u64,
        preview: PreviewResult,
    },
    Mutated(Mutation),
    Failed {
        request: FailedRequest,
        error: BackendError,
    },
}

/// Instructions for the rendering side. It owns all visual state and never
/// talks to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    ReplaceListing(Vec<Entry>),
    SetSelection(usize),
    RenderPreview(PreviewResult),
    ClearPreview,
    ShowError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GoToPath,
    CopyDestination,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            PromptKind::GoToPath => "Go to directory",
            PromptKind::CopyDestination => "Copy marked entries to",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub value: String,
}

/// The session aggregate. Only the navigation operations in
/// [`crate::actions`] and the completion handlers in [`crate::handlers`]
/// mutate it.
pub struct App {
    current_path: String,
    entries: Vec<Entry>,
    selection: SelectionTracker,
    pub(crate) mode: SessionMode,
    requested_filter: String,
    lock: OperationLock,
    lock_guard: Option<OperationGuard>,
    listing_seq: u64,
    preview_seq: u64,
    in_flight: usize,
    renders: Vec<RenderInstruction>,
    pub prompt: Option<Prompt>,
    pub should_quit: bool,
}

impl App {
    pub fn new(lock: OperationLock) -> Self {
        Self {
            current_path: String::new(),
            entries: Vec::new(),
            selection: SelectionTracker::default(),
            mode: SessionMode::Normal,
            requested_filter: String::new(),
            lock,
            lock_guard: None,
            listing_seq: 0,
            preview_seq: 0,
            in_flight: 0,
            renders: Vec::new(),
            prompt: None,
            should_quit: false,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selection.index()
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn requested_filter(&self) -> &str {
        &self.requested_filter
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    pub fn route_context(&self) -> RouteContext {
        RouteContext {
            mode: self.mode.kind(),
            prompt_open: self.prompt.is_some(),
            locked: self.is_locked(),
        }
    }

    pub(crate) fn selection_mut(&mut self) -> &mut SelectionTracker {
        &mut self.selection
    }

    pub(crate) fn set_requested_filter(&mut self, pattern: String) {
        self.requested_filter = pattern;
    }

    pub(crate) fn next_listing_seq(&mut self) -> u64 {
        self.listing_seq = self.listing_seq.wrapping_add(1);
        self.listing_seq
    }

    pub(crate) fn next_preview_seq(&mut self) -> u64 {
        self.preview_seq = self.preview_seq.wrapping_add(1);
        self.preview_seq
    }

    pub(crate) fn listing_seq(&self) -> u64 {
        self.listing_seq
    }

    pub(crate) fn is_current_listing(&self, seq: u64) -> bool {
        seq == self.listing_seq
    }

    pub(crate) fn is_current_preview(&self, seq: u64) -> bool {
        seq == self.preview_seq
    }

    pub(crate) fn request_started(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn request_finished(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Takes the operation lock for the lifetime of one long-running request.
    pub(crate) fn acquire_lock(&mut self) -> bool {
        match self.lock.try_acquire() {
            Some(guard) => {
                self.lock_guard = Some(guard);
                true
            }
            None => false,
        }
    }

    pub(crate) fn release_lock(&mut self) {
        self.lock_guard = None;
    }

    pub(crate) fn emit(&mut self, instruction: RenderInstruction) {
        self.renders.push(instruction);
    }

    pub fn take_renders(&mut self) -> Vec<RenderInstruction> {
        std::mem::take(&mut self.renders)
    }

    pub(crate) fn apply_listing(&mut self, path: String, entries: Vec<Entry>, focus: RefreshFocus) {
        self.current_path = path;
        self.entries = entries;
        if focus == RefreshFocus::Reset {
            self.selection = SelectionTracker::default();
        }
        self.selection.clamp_to(self.entries.len());

        self.emit(RenderInstruction::ReplaceListing(self.entries.clone()));
        if !self.selection.is_empty() {
            self.emit(RenderInstruction::SetSelection(self.selection.index()));
        }
    }

    /// Flips the local mark flag of the selected entry ahead of the backend's answer.
    pub(crate) fn toggle_selected_mark(&mut self) -> Option<usize> {
        let index = self.selection.index();
        let entry = self.entries.get_mut(index)?;
        entry.marked = !entry.marked;
        self.emit(RenderInstruction::ReplaceListing(self.entries.clone()));
        Some(index)
    }

    pub(crate) fn show_error(&mut self, message: impl Into<String>) {
        self.emit(RenderInstruction::ShowError(message.into()));
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let mut value = self.current_path.clone();
        if !value.is_empty() && !value.ends_with(std::path::MAIN_SEPARATOR) {
            value.push(std::path::MAIN_SEPARATOR);
        }
        self.prompt = Some(Prompt { kind, value });
    }

    pub fn close_prompt(&mut self) -> Option<Prompt> {
        self.prompt.take()
    }
}
