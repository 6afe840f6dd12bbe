use std::collections::BTreeMap;

use super::diagnostics::DiagnosticLog;
use super::ts_to_rfc3339;
use crate::protocols::common::reader::hex_bytes;
use crate::protocols::midi::{BufferOutcome, CodeIndex};
use crate::{MidiSummary, SysExSummary};

#[derive(Debug, Default, Clone)]
pub(crate) struct CableStats {
    pub events: u64,
    pub sysex_events: u64,
    pub code_index: BTreeMap<CodeIndex, u64>,
}

/// Keyed by `(session, cable)` so iteration is already in report order.
pub(crate) type MidiStats = BTreeMap<(String, u8), CableStats>;

pub(crate) fn add_midi_buffer(
    stats: &mut MidiStats,
    sysex: &mut Vec<SysExSummary>,
    log: &mut DiagnosticLog,
    session: &str,
    ts: Option<f64>,
    outcome: BufferOutcome,
) {
    let record = outcome.buffer_id;
    for diag in &outcome.diagnostics {
        log.push(session, record, 0, diag);
    }
    for event in &outcome.events {
        let entry = stats.entry((session.to_string(), event.cable)).or_default();
        entry.events += 1;
        if event.code_index.is_sysex() {
            entry.sysex_events += 1;
        }
        *entry.code_index.entry(event.code_index).or_default() += 1;
    }
    let completed_at = ts_to_rfc3339(ts);
    for message in outcome.messages {
        sysex.push(SysExSummary {
            session: session.to_string(),
            cable: message.cable,
            length: message.bytes.len() as u64,
            bytes: hex_bytes(&message.bytes),
            first_record: message.origin.first_buffer,
            completed_record: message.origin.completed_buffer,
            fragments: message.origin.fragments as u64,
            completed_at: completed_at.clone(),
        });
    }
}

pub(crate) fn build_midi_summaries(stats: MidiStats) -> Vec<MidiSummary> {
    stats
        .into_iter()
        .map(|((session, cable), stats)| MidiSummary {
            session,
            cable,
            events: stats.events,
            sysex_events: stats.sysex_events,
            code_index: stats
                .code_index
                .into_iter()
                .map(|(cin, count)| (format!("{:#03x} {}", cin.value(), cin.name()), count))
                .collect(),
        })
        .collect()
}
