use std::collections::HashMap;

use crate::DiagnosticSummary;
use crate::protocols::common::{Diagnostic, DiagnosticKind};

const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Default)]
struct Entry {
    count: u64,
    examples: Vec<String>,
}

/// Aggregates diagnostics per id, keeping a few located examples.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: HashMap<DiagnosticKind, Entry>,
}

impl DiagnosticLog {
    /// `base` is the offset of the diagnostic's frame within the record.
    pub(crate) fn push(&mut self, session: &str, record: u64, base: usize, diag: &Diagnostic) {
        let entry = self.entries.entry(diag.kind).or_default();
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES {
            entry.examples.push(format!(
                "session {session} record {record} @ {}: {}",
                base + diag.offset,
                diag.message
            ));
        }
    }

    /// Summaries sorted by severity (warnings first) then id.
    pub(crate) fn into_summaries(self) -> Vec<DiagnosticSummary> {
        let mut summaries: Vec<_> = self.entries.into_iter().collect();
        summaries.sort_by(|(a, _), (b, _)| {
            a.severity()
                .rank()
                .cmp(&b.severity().rank())
                .then_with(|| a.id().cmp(b.id()))
        });
        summaries
            .into_iter()
            .map(|(kind, entry)| DiagnosticSummary {
                id: kind.id().to_string(),
                severity: kind.severity().as_str().to_string(),
                message: kind.summary().to_string(),
                count: entry.count,
                examples: entry.examples,
            })
            .collect()
    }
}
