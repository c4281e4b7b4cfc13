//! Session modes and the legal transitions between them.
//!
//! ```text
//! Normal --enter marked view--> MarkedView --exit / parent--> Normal
//! Normal --begin search-------> Search     --commit / cancel-> Normal
//! ```
//!
//! There is no edge between `MarkedView` and `Search`; asking for one is
//! reported as [`ModeError::IllegalTransition`] and leaves the mode unchanged.

use crate::domain::ListingSource;
use crate::search::SearchSession;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionMode {
    #[default]
    Normal,
    MarkedView,
    Search(SearchSession),
}

/// Payload-free tag of [`SessionMode`], used by the input router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Normal,
    MarkedView,
    Search,
}

impl ModeKind {
    pub fn label(self) -> &'static str {
        match self {
            ModeKind::Normal => "NORMAL",
            ModeKind::MarkedView => "MARKED",
            ModeKind::Search => "SEARCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("cannot switch from {} to {} mode", .from.label(), .to.label())]
    IllegalTransition { from: ModeKind, to: ModeKind },
}

impl SessionMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            SessionMode::Normal => ModeKind::Normal,
            SessionMode::MarkedView => ModeKind::MarkedView,
            SessionMode::Search(_) => ModeKind::Search,
        }
    }

    pub fn listing_source(&self) -> ListingSource {
        match self {
            SessionMode::MarkedView => ListingSource::Marked,
            SessionMode::Normal | SessionMode::Search(_) => ListingSource::Files,
        }
    }

    /// MarkedView is a projection and cannot be descended into.
    pub fn supports_descent(&self) -> bool {
        matches!(self, SessionMode::Normal)
    }

    pub fn search_mut(&mut self) -> Option<&mut SearchSession> {
        match self {
            SessionMode::Search(search) => Some(search),
            _ => None,
        }
    }

    /// Returns `Ok(true)` when the mode changed, `Ok(false)` when already there.
    pub fn enter_marked_view(&mut self) -> Result<bool, ModeError> {
        match self {
            SessionMode::Normal => {
                *self = SessionMode::MarkedView;
                Ok(true)
            }
            SessionMode::MarkedView => Ok(false),
            SessionMode::Search(_) => Err(ModeError::IllegalTransition {
                from: ModeKind::Search,
                to: ModeKind::MarkedView,
            }),
        }
    }

    pub fn begin_search(&mut self) -> Result<bool, ModeError> {
        match self {
            SessionMode::Normal => {
                *self = SessionMode::Search(SearchSession::default());
                Ok(true)
            }
            SessionMode::Search(_) => Ok(false),
            SessionMode::MarkedView => Err(ModeError::IllegalTransition {
                from: ModeKind::MarkedView,
                to: ModeKind::Search,
            }),
        }
    }

    /// Switches back to `Normal` and hands out the mode that was left.
    pub fn exit_to_normal(&mut self) -> SessionMode {
        std::mem::take(self)
    }
}
