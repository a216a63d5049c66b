//! Logical index mapper - pure visibility and primary-index math.
//!
//! Operates on geometry snapshots, never on live instances, so every rule is
//! unit-testable:
//! - a slide `[offset, offset + size)` is visible iff it overlaps the scroll
//!   viewport `[translate, translate + viewport)` with strict inequality on
//!   both bounds (half-open intersection)
//! - the primary slide is the one whose interval start is closest to the
//!   current translate, ties broken by the lowest logical index
//! - computations run over logical indices, not raw slide order, so
//!   wrap-around duplicates collapse to one identity

use std::collections::BTreeSet;

use crate::types::LogicalIndex;

/// Geometry of one slide along the active axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideGeom {
    pub logical: LogicalIndex,
    pub offset: f64,
    pub size: f64,
}

/// Point-in-time geometry of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub slides: Vec<SlideGeom>,
    pub translate: f64,
    pub viewport: f64,
}

/// Sorted set of distinct logical indices currently visible.
pub fn visible_set(snapshot: &Snapshot) -> BTreeSet<LogicalIndex> {
    let start = snapshot.translate;
    let end = snapshot.translate + snapshot.viewport;
    snapshot
        .slides
        .iter()
        .filter(|slide| slide.offset < end && slide.offset + slide.size > start)
        .map(|slide| slide.logical)
        .collect()
}

/// Logical index of the slide whose interval start is closest to the current
/// translate. Ties go to the lowest logical index. `None` when the snapshot
/// holds no slides.
///
/// Wrap-around instances bypass this in favor of the engine's real index;
/// see [`Instance::primary_logical`](crate::relation::Instance::primary_logical).
pub fn primary_index(snapshot: &Snapshot) -> Option<LogicalIndex> {
    let mut best: Option<(f64, LogicalIndex)> = None;
    for slide in &snapshot.slides {
        let distance = (slide.offset - snapshot.translate).abs();
        let closer = match best {
            None => true,
            Some((best_distance, best_logical)) => {
                distance < best_distance
                    || (distance == best_distance && slide.logical < best_logical)
            }
        };
        if closer {
            best = Some((distance, slide.logical));
        }
    }
    best.map(|(_, logical)| logical)
}

/// Position of the first slide carrying `logical`, or `None`.
pub fn resolve_logical(logicals: &[LogicalIndex], logical: LogicalIndex) -> Option<usize> {
    logicals.iter().position(|&l| l == logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(slides: &[(LogicalIndex, f64, f64)], translate: f64, viewport: f64) -> Snapshot {
        Snapshot {
            slides: slides
                .iter()
                .map(|&(logical, offset, size)| SlideGeom {
                    logical,
                    offset,
                    size,
                })
                .collect(),
            translate,
            viewport,
        }
    }

    #[test]
    fn test_visible_set_basic_overlap() {
        // Three 100-wide slides, viewport shows [50, 150).
        let snap = snapshot(&[(0, 0.0, 100.0), (1, 100.0, 100.0), (2, 200.0, 100.0)], 50.0, 100.0);
        let visible: Vec<_> = visible_set(&snap).into_iter().collect();
        assert_eq!(visible, vec![0, 1]);
    }

    #[test]
    fn test_visible_set_strict_bounds() {
        // Slide ending exactly at the viewport start is not visible, nor is
        // one starting exactly at the viewport end.
        let snap = snapshot(&[(0, 0.0, 100.0), (1, 200.0, 100.0)], 100.0, 100.0);
        assert!(visible_set(&snap).is_empty());
    }

    #[test]
    fn test_visible_set_dedupes_wraparound_copies() {
        // Two copies of logical 0 in view.
        let snap = snapshot(&[(0, 0.0, 50.0), (1, 50.0, 50.0), (0, 100.0, 50.0)], 0.0, 150.0);
        let visible: Vec<_> = visible_set(&snap).into_iter().collect();
        assert_eq!(visible, vec![0, 1]);
    }

    #[test]
    fn test_visible_set_sorted() {
        let snap = snapshot(&[(3, 0.0, 50.0), (1, 50.0, 50.0), (2, 100.0, 50.0)], 0.0, 150.0);
        let visible: Vec<_> = visible_set(&snap).into_iter().collect();
        assert_eq!(visible, vec![1, 2, 3]);
    }

    #[test]
    fn test_primary_nearest_interval_start() {
        let snap = snapshot(&[(0, 0.0, 100.0), (1, 100.0, 100.0), (2, 200.0, 100.0)], 130.0, 100.0);
        assert_eq!(primary_index(&snap), Some(1));
    }

    #[test]
    fn test_primary_tie_breaks_to_lowest_logical() {
        // Logical 2 and 0 both sit 50 away from the translate.
        let snap = snapshot(&[(2, 0.0, 50.0), (0, 100.0, 50.0)], 50.0, 100.0);
        assert_eq!(primary_index(&snap), Some(0));
    }

    #[test]
    fn test_primary_empty_snapshot() {
        let snap = snapshot(&[], 0.0, 100.0);
        assert_eq!(primary_index(&snap), None);
    }

    #[test]
    fn test_resolve_logical_first_match() {
        assert_eq!(resolve_logical(&[5, 3, 4, 3], 3), Some(1));
        assert_eq!(resolve_logical(&[5, 3, 4], 9), None);
        assert_eq!(resolve_logical(&[], 0), None);
    }
}
