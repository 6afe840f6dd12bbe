use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::protocols::common::{Diagnostic, DiagnosticKind};
use crate::protocols::descriptor::{AudioSubclass, InterfaceInfo, decode_descriptors};
use crate::session::{ProtocolFamily, Session};
use crate::source::{RecordKind, RecordSource, SourceError, TraceFileSource, TraceRecord};
use crate::{DEFAULT_GENERATED_AT, Report, TraceSummary, make_stub_report};

mod descriptors;
mod diagnostics;
mod midi;

use descriptors::add_descriptor_walk;
use diagnostics::DiagnosticLog;
use midi::{MidiStats, add_midi_buffer, build_midi_summaries};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

pub fn analyze_trace_file(path: &Path) -> Result<Report, AnalysisError> {
    let source = TraceFileSource::open(path)?;
    analyze_source(path, source)
}

pub fn analyze_source<S: RecordSource>(
    path: &Path,
    mut source: S,
) -> Result<Report, AnalysisError> {
    let mut records_total = 0u64;
    let mut descriptor_records = 0u64;
    let mut bulk_records = 0u64;
    let mut first_ts = None;
    let mut last_ts = None;
    let mut sessions: BTreeMap<String, Session> = BTreeMap::new();
    let mut log = DiagnosticLog::default();
    let mut descriptors = Vec::new();
    let mut midi_stats = MidiStats::new();
    let mut sysex = Vec::new();

    while let Some(record) = source.next_record()? {
        records_total += 1;
        update_ts_bounds(&mut first_ts, &mut last_ts, record.ts);
        match record.kind {
            RecordKind::Descriptor => descriptor_records += 1,
            RecordKind::Bulk => bulk_records += 1,
        }

        let session = sessions.entry(record.session.clone()).or_default();
        let family = ProtocolFamily::from_interface_class(record.interface_class);
        if let Err(err) = session.bind_class(family) {
            warn!("record {}: {err}", record.index);
            log.push(
                &record.session,
                record.index,
                0,
                &Diagnostic::new(
                    DiagnosticKind::SessionConflict,
                    0..record.data.len(),
                    err.to_string(),
                ),
            );
            continue;
        }
        if family != ProtocolFamily::Audio {
            debug!("record {}: owned by {family}, not decoded", record.index);
            continue;
        }

        let subclass = AudioSubclass::from(record.interface_subclass);
        match record.kind {
            RecordKind::Descriptor => {
                let iface = InterfaceInfo {
                    interface_class: record.interface_class,
                    subclass,
                };
                let walk = decode_descriptors(&record.data, &iface, session);
                add_descriptor_walk(&mut descriptors, &mut log, &record.session, record.index, walk);
            }
            RecordKind::Bulk if subclass == AudioSubclass::MidiStreaming => {
                let outcome = session.process_midi_buffer(record.index, &record.data);
                add_midi_buffer(
                    &mut midi_stats,
                    &mut sysex,
                    &mut log,
                    &record.session,
                    record.ts,
                    outcome,
                );
            }
            RecordKind::Bulk => push_unhandled_bulk(&mut log, &record),
        }
    }

    let sessions_total = sessions.len() as u64;
    for (key, session) in sessions {
        for pending in session.into_pending_sysex() {
            log.push(
                &key,
                pending.first_buffer,
                0,
                &Diagnostic::new(
                    DiagnosticKind::SysExIncomplete,
                    0..0,
                    format!(
                        "cable {}: {} bytes in {} fragments never terminated",
                        pending.cable,
                        pending.bytes.len(),
                        pending.fragments
                    ),
                ),
            );
        }
    }

    let mut report = make_stub_report(&path.display().to_string(), path.metadata()?.len());
    report.trace_summary = Some(TraceSummary {
        records_total,
        descriptor_records,
        bulk_records,
        sessions: sessions_total,
        time_start: ts_to_rfc3339(first_ts),
        time_end: ts_to_rfc3339(last_ts),
    });
    report.generated_at = report
        .trace_summary
        .as_ref()
        .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.descriptors = descriptors;
    report.midi = build_midi_summaries(midi_stats);
    report.sysex = sysex;
    report.diagnostics = log.into_summaries();
    Ok(report)
}

fn push_unhandled_bulk(log: &mut DiagnosticLog, record: &TraceRecord) {
    log.push(
        &record.session,
        record.index,
        0,
        &Diagnostic::new(
            DiagnosticKind::UnhandledBulk,
            0..record.data.len(),
            format!(
                "{} bytes on interface subclass {:#04x} left undecoded",
                record.data.len(),
                record.interface_subclass
            ),
        ),
    );
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let ts = match ts {
        Some(ts) => ts,
        None => return,
    };
    match first {
        None => *first = Some(ts),
        Some(existing) => {
            if ts < *existing {
                *first = Some(ts);
            }
        }
    }
    match last {
        None => *last = Some(ts),
        Some(existing) => {
            if ts > *existing {
                *last = Some(ts);
            }
        }
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
