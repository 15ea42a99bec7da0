// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure raw-to-target page mapping for the three scanning layouts.
//
// A folded sheet scanned open presents its pages in reversed, rotated
// order relative to reading order; the double-folded mapping undoes that.
// Nothing here touches the filesystem or spawns processes — the resolver
// is a pure function over (layout, raw index).

use crate::types::{Layout, RawPageId, TargetPageId};

/// Rotation the cleanup tool must apply before splitting a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerotation {
    None,
    /// +90° clockwise.
    Cw90,
    /// −90° counter-clockwise.
    Ccw90,
}

impl Prerotation {
    /// Signed degree value for the cleanup tool's option.
    pub fn degrees(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Ccw90 => -90,
        }
    }
}

/// One side of a capture placed into the final page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Final reading-order position this side becomes.
    pub target: TargetPageId,
    /// Rotation required before the split step.
    pub prerotate: Prerotation,
}

/// Map raw capture `p` to the target page(s) it produces.
///
/// The order of the returned placements matches the order of the side
/// images the cleanup tool emits (`-1` first, `-2` second).
pub fn resolve(layout: Layout, p: RawPageId) -> Vec<Placement> {
    debug_assert!(p.0 >= 1, "raw page indices are 1-based");
    match layout {
        Layout::Single => vec![Placement {
            target: TargetPageId(p.0),
            prerotate: Prerotation::None,
        }],

        Layout::Double => vec![
            Placement {
                target: TargetPageId(2 * p.0 - 1),
                prerotate: Prerotation::None,
            },
            Placement {
                target: TargetPageId(2 * p.0),
                prerotate: Prerotation::None,
            },
        ],

        Layout::DoubleFolded => {
            // Two captures cover one folded sheet of four logical pages.
            // The sheet's base offset advances by 4 per capture pair.
            let base = 4 * ((p.0 - 1) / 2);
            if p.0 % 2 == 1 {
                vec![
                    Placement {
                        target: TargetPageId(base + 4),
                        prerotate: Prerotation::Cw90,
                    },
                    Placement {
                        target: TargetPageId(base + 1),
                        prerotate: Prerotation::Cw90,
                    },
                ]
            } else {
                vec![
                    Placement {
                        target: TargetPageId(base + 2),
                        prerotate: Prerotation::Ccw90,
                    },
                    Placement {
                        target: TargetPageId(base + 3),
                        prerotate: Prerotation::Ccw90,
                    },
                ]
            }
        }
    }
}

/// Total target pages produced by `raw_pages` captures under `layout`.
pub fn target_count(layout: Layout, raw_pages: u32) -> u32 {
    raw_pages * layout.sides_per_capture()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn targets(layout: Layout, p: u32) -> Vec<u32> {
        resolve(layout, RawPageId(p))
            .into_iter()
            .map(|pl| pl.target.0)
            .collect()
    }

    #[test]
    fn single_is_identity() {
        for p in 1..=6 {
            let placements = resolve(Layout::Single, RawPageId(p));
            assert_eq!(placements.len(), 1);
            assert_eq!(placements[0].target, TargetPageId(p));
            assert_eq!(placements[0].prerotate, Prerotation::None);
        }
    }

    #[test]
    fn double_splits_into_adjacent_pairs() {
        assert_eq!(targets(Layout::Double, 1), vec![1, 2]);
        assert_eq!(targets(Layout::Double, 2), vec![3, 4]);
        assert_eq!(targets(Layout::Double, 8), vec![15, 16]);
    }

    #[test]
    fn double_folded_parity_vectors() {
        // Canonical vectors for the folded-sheet reordering.
        assert_eq!(targets(Layout::DoubleFolded, 1), vec![4, 1]);
        assert_eq!(targets(Layout::DoubleFolded, 2), vec![2, 3]);
        assert_eq!(targets(Layout::DoubleFolded, 3), vec![8, 5]);
        assert_eq!(targets(Layout::DoubleFolded, 4), vec![6, 7]);
    }

    #[test]
    fn double_folded_rotation_by_parity() {
        for p in [1u32, 3, 5, 17] {
            for pl in resolve(Layout::DoubleFolded, RawPageId(p)) {
                assert_eq!(pl.prerotate, Prerotation::Cw90);
            }
        }
        for p in [2u32, 4, 6, 18] {
            for pl in resolve(Layout::DoubleFolded, RawPageId(p)) {
                assert_eq!(pl.prerotate, Prerotation::Ccw90);
            }
        }
    }

    #[test]
    fn resolver_is_deterministic() {
        for layout in [Layout::Single, Layout::Double, Layout::DoubleFolded] {
            for p in 1..=12 {
                assert_eq!(
                    resolve(layout, RawPageId(p)),
                    resolve(layout, RawPageId(p))
                );
            }
        }
    }

    #[test]
    fn targets_are_dense_with_no_duplicates() {
        // Over p = 1..N, the produced targets must be exactly {1..M}.
        for (layout, n) in [
            (Layout::Single, 7u32),
            (Layout::Double, 8),
            (Layout::DoubleFolded, 10),
        ] {
            let mut seen = BTreeSet::new();
            for p in 1..=n {
                for t in targets(layout, p) {
                    assert!(seen.insert(t), "duplicate target {t} under {layout:?}");
                }
            }
            let expected = target_count(layout, n);
            assert_eq!(seen.len() as u32, expected);
            assert_eq!(*seen.first().unwrap(), 1);
            assert_eq!(*seen.last().unwrap(), expected);
        }
    }
}
