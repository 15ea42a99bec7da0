// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document planning: assign every surviving raw capture its target
// page(s) and partition the target space into per-document ranges.
//
// Planning happens once, after scanning and before any worker runs, so
// page workers and document assemblers coordinate through typed indices
// instead of re-parsing file names.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ScanJob;
use crate::error::{Result, ScanwerkError};
use crate::layout::{self, Placement};
use crate::types::{Count, DocumentRange, RawPageId, TargetPageId};

/// One raw capture with the target placements resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub raw: RawPageId,
    /// In side-emission order (`-1` first, `-2` second).
    pub placements: Vec<Placement>,
}

/// The full fan-out plan: every page worker's assignment plus the
/// document ranges that partition the combined target space.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub pages: Vec<PagePlan>,
    pub documents: Vec<DocumentRange>,
}

impl DocumentPlan {
    /// Build the plan from the raw captures actually present on disk.
    ///
    /// With blank-page removal the raw sequence may have gaps; survivors
    /// are renumbered densely within their document before layout
    /// resolution, so target indices stay contiguous and the affected
    /// document simply shrinks.
    pub fn build(present: &[RawPageId], job: &ScanJob) -> Result<DocumentPlan> {
        if present.is_empty() {
            return Err(ScanwerkError::Scan("the scanner produced no pages".into()));
        }
        debug_assert!(present.windows(2).all(|w| w[0] < w[1]));

        let groups = group_by_document(present, job)?;
        let total_docs = groups.len() as u32;

        let mut pages = Vec::with_capacity(present.len());
        let mut documents = Vec::with_capacity(groups.len());
        let mut offset = 0u32;

        for (doc_index, survivors) in groups.iter().enumerate() {
            let doc_index = doc_index as u32;
            let count = layout::target_count(job.layout, survivors.len() as u32);

            for (local, raw) in survivors.iter().enumerate() {
                let local_id = RawPageId(local as u32 + 1);
                let placements = layout::resolve(job.layout, local_id)
                    .into_iter()
                    .map(|pl| Placement {
                        target: TargetPageId(pl.target.0 + offset),
                        prerotate: pl.prerotate,
                    })
                    .collect();
                pages.push(PagePlan {
                    raw: *raw,
                    placements,
                });
            }

            documents.push(DocumentRange {
                index: doc_index,
                start: TargetPageId(offset + 1),
                end: TargetPageId(offset + 1 + count),
                output: job.output.path_for(doc_index, total_docs),
            });
            offset += count;
        }

        debug!(
            raw_pages = pages.len(),
            target_pages = offset,
            documents = documents.len(),
            "document plan built"
        );
        Ok(DocumentPlan { pages, documents })
    }

    /// Total number of target pages across all documents.
    pub fn target_count(&self) -> u32 {
        self.documents.last().map(|d| d.end.0 - 1).unwrap_or(0)
    }
}

/// Split the surviving captures into per-document groups, in document
/// order, each group ascending by raw index.
fn group_by_document(present: &[RawPageId], job: &ScanJob) -> Result<Vec<Vec<RawPageId>>> {
    let per_doc = match job.pages {
        // Unbounded pages: validation already pinned this to one document.
        Count::Unbounded => return Ok(vec![present.to_vec()]),
        Count::Bounded(p) => p,
    };

    let mut groups: BTreeMap<u32, Vec<RawPageId>> = BTreeMap::new();
    for raw in present {
        groups.entry((raw.0 - 1) / per_doc).or_default().push(*raw);
    }

    match job.documents {
        Count::Bounded(expected) => {
            if let Some((&beyond, _)) = groups.range(expected..).next() {
                let first_extra = groups[&beyond][0];
                return Err(ScanwerkError::UnexpectedPage(first_extra.0));
            }
            let mut out = Vec::with_capacity(expected as usize);
            for doc in 0..expected {
                match groups.remove(&doc) {
                    Some(survivors) => {
                        check_complete(&survivors, per_doc, job)?;
                        out.push(survivors);
                    }
                    None => return Err(ScanwerkError::EmptyDocument(doc + 1)),
                }
            }
            Ok(out)
        }
        Count::Unbounded => {
            // Document keys must be contiguous from zero; a hole means a
            // whole document vanished mid-batch.
            let last = *groups.keys().next_back().unwrap_or(&0);
            let mut out = Vec::with_capacity(groups.len());
            for doc in 0..=last {
                match groups.remove(&doc) {
                    Some(survivors) => {
                        check_complete(&survivors, per_doc, job)?;
                        out.push(survivors);
                    }
                    None => return Err(ScanwerkError::EmptyDocument(doc + 1)),
                }
            }
            Ok(out)
        }
    }
}

/// Without blank removal every document must arrive complete.
fn check_complete(survivors: &[RawPageId], per_doc: u32, job: &ScanJob) -> Result<()> {
    if !job.remove_blanks && survivors.len() as u32 != per_doc {
        return Err(ScanwerkError::IncompleteDocument {
            got: survivors.len(),
            per_doc,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobOverlay, ScanJob};
    use crate::types::{Layout, OutputTarget};
    use std::path::PathBuf;

    fn job(pages: Count, documents: Count, layout: Layout) -> ScanJob {
        let mut job = ScanJob::resolve(
            JobOverlay {
                pages: Some(pages),
                documents: Some(documents),
                layout: Some(layout),
                ..Default::default()
            },
            OutputTarget::SingleFile(PathBuf::from("/out/scan.pdf")),
            false,
        );
        job.remove_blanks = false;
        job
    }

    fn raws(ids: &[u32]) -> Vec<RawPageId> {
        ids.iter().copied().map(RawPageId).collect()
    }

    #[test]
    fn four_page_single_document_round_trip() {
        let plan = DocumentPlan::build(
            &raws(&[1, 2, 3, 4]),
            &job(Count::Bounded(4), Count::Bounded(1), Layout::Single),
        )
        .unwrap();

        let targets: Vec<u32> = plan
            .pages
            .iter()
            .flat_map(|p| p.placements.iter().map(|pl| pl.target.0))
            .collect();
        assert_eq!(targets, vec![1, 2, 3, 4]);

        assert_eq!(plan.documents.len(), 1);
        let doc = &plan.documents[0];
        assert_eq!((doc.start.0, doc.end.0), (1, 5));
        assert_eq!(doc.output, PathBuf::from("/out/scan.pdf"));
    }

    #[test]
    fn eight_double_pages_yield_sixteen_targets() {
        let plan = DocumentPlan::build(
            &raws(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &job(Count::Bounded(8), Count::Bounded(1), Layout::Double),
        )
        .unwrap();

        let mut targets: Vec<u32> = plan
            .pages
            .iter()
            .flat_map(|p| p.placements.iter().map(|pl| pl.target.0))
            .collect();
        targets.sort_unstable();
        assert_eq!(targets, (1..=16).collect::<Vec<_>>());
        assert_eq!(plan.documents[0].page_count(), 16);
    }

    #[test]
    fn document_ranges_partition_the_target_space() {
        // 3 documents of 4 single pages: ranges [1,5), [5,9), [9,13).
        let plan = DocumentPlan::build(
            &raws(&(1..=12).collect::<Vec<_>>()),
            &job(Count::Bounded(4), Count::Bounded(3), Layout::Single),
        )
        .unwrap();

        assert_eq!(plan.documents.len(), 3);
        for (d, doc) in plan.documents.iter().enumerate() {
            let d = d as u32;
            assert_eq!(doc.start.0, 4 * d + 1);
            assert_eq!(doc.end.0, 4 * d + 5);
        }

        // Pairwise disjoint, union covers [1, 12].
        let mut covered: Vec<u32> = plan
            .documents
            .iter()
            .flat_map(|d| d.targets().map(|t| t.0))
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn multi_document_single_file_outputs_are_numbered() {
        let plan = DocumentPlan::build(
            &raws(&[1, 2, 3, 4]),
            &job(Count::Bounded(2), Count::Bounded(2), Layout::Single),
        )
        .unwrap();
        assert_eq!(plan.documents[0].output, PathBuf::from("/out/scan-001.pdf"));
        assert_eq!(plan.documents[1].output, PathBuf::from("/out/scan-002.pdf"));
    }

    #[test]
    fn removed_blanks_shrink_their_document_without_gaps() {
        let mut j = job(Count::Bounded(4), Count::Bounded(2), Layout::Single);
        j.remove_blanks = true;

        // Raw page 3 was blank and removed by the backend.
        let plan = DocumentPlan::build(&raws(&[1, 2, 4, 5, 6, 7, 8]), &j).unwrap();

        let doc0 = &plan.documents[0];
        let doc1 = &plan.documents[1];
        assert_eq!((doc0.start.0, doc0.end.0), (1, 4)); // shrank to 3 pages
        assert_eq!((doc1.start.0, doc1.end.0), (4, 8)); // still 4, no gap

        // Targets over all pages are dense.
        let mut targets: Vec<u32> = plan
            .pages
            .iter()
            .flat_map(|p| p.placements.iter().map(|pl| pl.target.0))
            .collect();
        targets.sort_unstable();
        assert_eq!(targets, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn fully_blank_document_is_an_error() {
        let mut j = job(Count::Bounded(2), Count::Bounded(2), Layout::Single);
        j.remove_blanks = true;
        let err = DocumentPlan::build(&raws(&[3, 4]), &j).unwrap_err();
        assert!(matches!(err, ScanwerkError::EmptyDocument(1)));
    }

    #[test]
    fn page_beyond_configured_batch_is_an_error() {
        let err = DocumentPlan::build(
            &raws(&[1, 2, 3]),
            &job(Count::Bounded(2), Count::Bounded(1), Layout::Single),
        )
        .unwrap_err();
        assert!(matches!(err, ScanwerkError::UnexpectedPage(3)));
    }

    #[test]
    fn incomplete_document_without_blank_removal_is_an_error() {
        let err = DocumentPlan::build(
            &raws(&[1, 2, 3]),
            &job(Count::Bounded(4), Count::Bounded(1), Layout::Single),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScanwerkError::IncompleteDocument { got: 3, per_doc: 4 }
        ));
    }

    #[test]
    fn unbounded_documents_grow_with_the_stream() {
        let plan = DocumentPlan::build(
            &raws(&(1..=6).collect::<Vec<_>>()),
            &job(Count::Bounded(2), Count::Unbounded, Layout::Single),
        )
        .unwrap();
        assert_eq!(plan.documents.len(), 3);
        assert_eq!(plan.target_count(), 6);
    }

    #[test]
    fn unbounded_pages_form_one_document() {
        let plan = DocumentPlan::build(
            &raws(&[1, 2, 3, 4, 5]),
            &job(Count::Unbounded, Count::Bounded(1), Layout::Single),
        )
        .unwrap();
        assert_eq!(plan.documents.len(), 1);
        assert_eq!(plan.documents[0].page_count(), 5);
    }
}
