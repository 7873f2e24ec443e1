//! Page selection grammar shared by the split and edit tools.
//!
//! A selection is parsed from user range syntax like "1-3, 5, 8-10" into a
//! validated, ordered, duplicate-free set of zero-based page indices.

use crate::error::PdfToolError;
use std::collections::BTreeSet;

/// A finished, sorted, deduplicated set of zero-based page indices.
///
/// Built only through [`PageSelection::parse`]; a partially-built selection is
/// never observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    indices: Vec<usize>,
    total_pages: usize,
}

impl PageSelection {
    /// Parse a range expression against a document of `total_pages` pages.
    ///
    /// Tokens are comma-separated; each is a 1-based page number or an
    /// inclusive `start-end` range. Malformed and out-of-range tokens are
    /// silently dropped rather than rejected, and a descending range like
    /// "5-3" selects nothing. Both policies match the behavior users already
    /// rely on; callers must treat an empty result as "nothing to do" and
    /// refuse to proceed. The only hard error is `total_pages == 0`.
    pub fn parse(text: &str, total_pages: usize) -> Result<Self, PdfToolError> {
        if total_pages == 0 {
            return Err(PdfToolError::InvalidRange(
                "Document has no pages".into(),
            ));
        }

        let mut picked = BTreeSet::new();

        for token in text.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            if let Some((start, end)) = token.split_once('-') {
                let (start, end) = match (
                    start.trim().parse::<usize>(),
                    end.trim().parse::<usize>(),
                ) {
                    (Ok(s), Ok(e)) => (s, e),
                    _ => continue,
                };
                // Descending ranges yield nothing by construction.
                for page in start..=end {
                    if page >= 1 && page <= total_pages {
                        picked.insert(page - 1);
                    }
                }
            } else {
                match token.parse::<usize>() {
                    Ok(page) if page >= 1 && page <= total_pages => {
                        picked.insert(page - 1);
                    }
                    _ => continue,
                }
            }
        }

        Ok(Self {
            indices: picked.into_iter().collect(),
            total_pages,
        })
    }

    /// Zero-based indices in ascending order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Indices in descending order, the only safe order for removal:
    /// deleting low-to-high shifts every later index after the first cut.
    pub fn descending(&self) -> Vec<usize> {
        let mut rev = self.indices.clone();
        rev.reverse();
        rev
    }

    /// The unselected indices of the same document, ascending.
    pub fn complement(&self) -> Self {
        let chosen: BTreeSet<usize> = self.indices.iter().copied().collect();
        Self {
            indices: (0..self.total_pages)
                .filter(|i| !chosen.contains(i))
                .collect(),
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}
