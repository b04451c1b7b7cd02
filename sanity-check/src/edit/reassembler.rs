//! Joins per-chunk results back into one document.

use super::{EditResult, ReassembledDocument};
use crate::text::PARAGRAPH_SEPARATOR;

/// Join the annotated and clean renderings of ordered chunk results.
///
/// Both renderings are built from the same records, so they always cover the
/// same chunks in the same order.
pub fn reassemble(results: &[EditResult]) -> ReassembledDocument {
    let mut annotated = Vec::with_capacity(results.len());
    let mut clean = Vec::with_capacity(results.len());

    for result in results {
        annotated.push(result.annotated.as_str());
        clean.push(result.clean.as_str());
    }

    ReassembledDocument {
        annotated: annotated.join(PARAGRAPH_SEPARATOR),
        clean: clean.join(PARAGRAPH_SEPARATOR),
    }
}
