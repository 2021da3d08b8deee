//! Call-tree construction.
//!
//! Both fragment encodings build the same [`ThreadTrees`] output through the
//! [`TreeBuilder`] trait. The sample builder merges temporally contiguous
//! samples of the same frame; the event builder replays enter/exit events
//! against per-thread open-frame stacks.

pub mod event;
pub mod sample;

use crate::fragment::Fragment;
use crate::frame::{all_application, ApplicationPredicate};
use crate::nodetree::ThreadTrees;
use crate::utils::config::MAX_STACK_DEPTH;
use crate::utils::error::BuildError;

/// Options shared by both builders
pub struct BuildOptions<'a> {
    /// Only build this thread when set
    pub active_thread_id: Option<&'a str>,

    /// Frames deeper than this are dropped (event builder only)
    pub max_depth: usize,

    /// Classifies frames without an explicit in-app flag
    pub is_application: &'a ApplicationPredicate,
}

impl Default for BuildOptions<'_> {
    fn default() -> Self {
        Self {
            active_thread_id: None,
            max_depth: MAX_STACK_DEPTH,
            is_application: &all_application,
        }
    }
}

impl<'a> BuildOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_thread(mut self, thread_id: Option<&'a str>) -> Self {
        self.active_thread_id = thread_id;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_predicate(mut self, predicate: &'a ApplicationPredicate) -> Self {
        self.is_application = predicate;
        self
    }

    fn includes_thread(&self, thread_id: &str) -> bool {
        self.active_thread_id.map_or(true, |active| active == thread_id)
    }
}

/// Anything that can be turned into per-thread call trees
pub trait TreeBuilder {
    /// Build one call tree per thread
    ///
    /// # Errors
    /// * `BuildError::InvalidStackId` - a sample references a missing stack
    /// * `BuildError::InvalidFrameId` - a stack references a missing frame
    fn call_trees(&self, options: &BuildOptions<'_>) -> Result<ThreadTrees, BuildError>;
}

impl TreeBuilder for Fragment {
    fn call_trees(&self, options: &BuildOptions<'_>) -> Result<ThreadTrees, BuildError> {
        match self {
            Fragment::Sample(fragment) => fragment.call_trees(options),
            Fragment::Event(fragment) => fragment.call_trees(options),
        }
    }
}
