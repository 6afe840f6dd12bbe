use super::diagnostics::DiagnosticLog;
use crate::protocols::descriptor::{DescriptorClass, DescriptorWalk};
use crate::{ByteRange, DescriptorSummary};

/// Append one summary per decoded descriptor and log every diagnostic.
///
/// Offsets in the summaries are relative to the record; field offsets stay
/// relative to their descriptor.
pub(crate) fn add_descriptor_walk(
    summaries: &mut Vec<DescriptorSummary>,
    log: &mut DiagnosticLog,
    session: &str,
    record: u64,
    walk: DescriptorWalk,
) {
    for diag in &walk.diagnostics {
        log.push(session, record, 0, diag);
    }
    for walked in walk.descriptors {
        let descriptor = walked.descriptor;
        for diag in &descriptor.diagnostics {
            log.push(session, record, walked.offset, diag);
        }
        summaries.push(DescriptorSummary {
            session: session.to_string(),
            record,
            offset: walked.offset as u64,
            kind: descriptor.kind.name().to_string(),
            class: match descriptor.class {
                DescriptorClass::Interface => "interface".to_string(),
                DescriptorClass::Endpoint => "endpoint".to_string(),
            },
            subtype: descriptor.subtype,
            length: descriptor.total_length,
            consumed: descriptor.consumed as u64,
            fields: descriptor.fields,
            undecoded: descriptor.undecoded.map(|range| ByteRange {
                start: range.start as u64,
                end: range.end as u64,
            }),
        });
    }
}
