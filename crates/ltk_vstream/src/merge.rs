//! Coalescing of untouched source regions.
//!
//! Every binding costs at least one seek and one read on its backing file when it is
//! served. Runs of untouched original data are laid out back to back, so collapsing
//! them turns many small reads into one large read.

use crate::binding::SourceOffsetBinding;

/// Merge runs of adjacent mergeable bindings.
///
/// Bindings are ordered by destination start. A mergeable binding joins the current
/// run when it starts where the run ends in the destination *and* continues the same
/// backing file at the next source byte. Non-mergeable bindings end the current run
/// and pass through unchanged. Running the pass on its own output changes nothing.
pub fn merge_bindings(mut bindings: Vec<SourceOffsetBinding>) -> Vec<SourceOffsetBinding> {
    if bindings.len() < 2 {
        return bindings;
    }
    bindings.sort_by_key(|binding| binding.dest.start);

    let mut merged = Vec::with_capacity(bindings.len());
    let mut candidate: Option<SourceOffsetBinding> = None;

    for binding in bindings {
        if !binding.mergeable {
            merged.extend(candidate.take());
            merged.push(binding);
            continue;
        }

        let absorbed = candidate
            .as_mut()
            .is_some_and(|current| current.try_absorb(&binding));
        if !absorbed {
            merged.extend(candidate.replace(binding));
        }
    }
    merged.extend(candidate);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BackingFile, ByteSource};
    use std::sync::Arc;

    fn region(
        origin: &Arc<BackingFile>,
        offset: u64,
        length: u64,
        dest: u64,
    ) -> SourceOffsetBinding {
        SourceOffsetBinding::mergeable(
            ByteSource::file_region(origin.clone(), offset, length),
            dest,
        )
    }

    fn layout(bindings: &[SourceOffsetBinding]) -> Vec<(u64, u64, bool)> {
        bindings
            .iter()
            .map(|b| (b.dest.start, b.dest.length, b.mergeable))
            .collect()
    }

    #[test]
    fn test_merge_empty_and_single() {
        assert!(merge_bindings(Vec::new()).is_empty());

        let origin = BackingFile::new("orig.afs");
        let single = merge_bindings(vec![region(&origin, 64, 32, 0)]);
        assert_eq!(layout(&single), vec![(0, 32, true)]);
    }

    #[test]
    fn test_merge_contiguous_run() {
        let origin = BackingFile::new("orig.afs");
        let merged = merge_bindings(vec![
            region(&origin, 32, 16, 16),
            region(&origin, 16, 16, 0),
            region(&origin, 48, 16, 32),
        ]);
        assert_eq!(layout(&merged), vec![(0, 48, true)]);
        match merged[0].source() {
            ByteSource::FileRegion { offset, length, .. } => {
                assert_eq!((*offset, *length), (16, 48));
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_non_mergeable_breaks_run() {
        let origin = BackingFile::new("orig.afs");
        let merged = merge_bindings(vec![
            region(&origin, 0, 16, 0),
            SourceOffsetBinding::new(ByteSource::zeroes(16), 16),
            region(&origin, 16, 16, 32),
            region(&origin, 32, 16, 48),
        ]);
        assert_eq!(
            layout(&merged),
            vec![(0, 16, true), (16, 16, false), (32, 32, true)]
        );
    }

    #[test]
    fn test_merge_rejects_cross_origin() {
        let a = BackingFile::new("a.afs");
        let b = BackingFile::new("b.afs");
        let merged = merge_bindings(vec![region(&a, 0, 16, 0), region(&b, 16, 16, 16)]);
        assert_eq!(layout(&merged), vec![(0, 16, true), (16, 16, true)]);
    }

    #[test]
    fn test_merge_rejects_source_gap() {
        let origin = BackingFile::new("orig.afs");
        // Destination-adjacent, but the middle of the source was skipped (replaced slot).
        let merged = merge_bindings(vec![region(&origin, 0, 16, 0), region(&origin, 32, 16, 16)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let origin = BackingFile::new("orig.afs");
        let once = merge_bindings(vec![
            region(&origin, 0, 16, 0),
            region(&origin, 16, 16, 16),
            SourceOffsetBinding::new(ByteSource::zeroes(8), 32),
            region(&origin, 64, 16, 40),
            region(&origin, 80, 16, 56),
        ]);
        let twice = merge_bindings(once.clone());
        assert_eq!(layout(&once), layout(&twice));
        assert_eq!(layout(&once), vec![(0, 32, true), (32, 8, false), (40, 32, true)]);
    }
}
