//! Copy-edit a text selection with an LLM.
//!
//! The selection is split into paragraph-aligned chunks, every chunk is edited
//! concurrently, and the results are joined into an annotated view (for
//! review) and a clean text (for applying). Accepting the review replaces
//! the selection in one undoable step; anything else leaves it untouched.

pub mod edit;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod review;
pub mod text;

pub use edit::{EditResult, ReassembledDocument};
pub use error::{ApplyError, ChunkFailure, ChunkProcessingError, Result, SanityError};
pub use host::{HostEditor, Position, TextBuffer};
pub use pipeline::{CheckOptions, CheckReport, SanityCheck};
pub use review::{ReviewDecision, ReviewOutcome, Reviewer};
