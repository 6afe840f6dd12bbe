//! Per-interface decode session.
//!
//! A `Session` replaces a shared per-conversation class-data slot: the caller
//! owns one per logical interface and passes it into every decode call.
//! Sessions share nothing and do no locking. Calls for one session must be
//! serialized by the caller.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocols::descriptor::error::DescriptorError;
use crate::protocols::descriptor::layout::IF_CLASS_AUDIO;
use crate::protocols::descriptor::version::{AdcVersion, Layout, VersionContext};
use crate::protocols::midi::sysex::{BufferOutcome, PendingSysEx, SysExReassembler};

/// Class driver family a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    Audio,
    Other(u8),
}

impl ProtocolFamily {
    pub fn from_interface_class(class: u8) -> Self {
        if class == IF_CLASS_AUDIO {
            ProtocolFamily::Audio
        } else {
            ProtocolFamily::Other(class)
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolFamily::Audio => f.write_str("audio"),
            ProtocolFamily::Other(class) => write!(f, "interface class {class:#04x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session already bound to {bound}, cannot bind {requested}")]
    ClassConflict {
        bound: ProtocolFamily,
        requested: ProtocolFamily,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    family: Option<ProtocolFamily>,
    version: Option<VersionContext>,
    sysex: SysExReassembler,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(&self) -> Option<ProtocolFamily> {
        self.family
    }

    /// Bind the session to a family. Rebinding to the same family is a no-op;
    /// another family is refused and nothing changes.
    pub fn bind_class(&mut self, family: ProtocolFamily) -> Result<(), SessionError> {
        match self.family {
            None => {
                debug!("session bound to {family}");
                self.family = Some(family);
                Ok(())
            }
            Some(bound) if bound == family => Ok(()),
            Some(bound) => Err(SessionError::ClassConflict {
                bound,
                requested: family,
            }),
        }
    }

    pub(crate) fn ensure_audio(&self) -> Result<(), DescriptorError> {
        match self.family {
            Some(bound) if bound != ProtocolFamily::Audio => {
                Err(DescriptorError::SessionConflict { bound })
            }
            _ => Ok(()),
        }
    }

    /// Create the version context on first call, return the existing one after.
    ///
    /// # Examples
    /// ```
    /// use uacshark_core::{AdcVersion, Session};
    ///
    /// let mut session = Session::new();
    /// session.get_or_create_version_context(AdcVersion::new(2, 0))?;
    /// let context = session.get_or_create_version_context(AdcVersion::new(1, 0))?;
    /// assert_eq!(context.major(), 2);
    /// # Ok::<(), uacshark_core::DescriptorError>(())
    /// ```
    pub fn get_or_create_version_context(
        &mut self,
        version: AdcVersion,
    ) -> Result<&VersionContext, DescriptorError> {
        self.ensure_audio()?;
        self.family = Some(ProtocolFamily::Audio);
        Ok(self.version.get_or_insert_with(|| {
            debug!("version context created: audio class {version}");
            VersionContext::new(version)
        }))
    }

    pub fn version_context(&self) -> Option<&VersionContext> {
        self.version.as_ref()
    }

    /// Known layout, if a supported header has been decoded.
    pub fn layout(&self) -> Option<Layout> {
        self.version.as_ref().and_then(|context| context.layout().ok())
    }

    /// Layout for a version-dependent parser, or the reason to refuse.
    pub(crate) fn audio_layout(&self) -> Result<Layout, DescriptorError> {
        self.ensure_audio()?;
        self.version
            .as_ref()
            .ok_or(DescriptorError::MissingVersion)?
            .layout()
    }

    pub fn sysex(&self) -> &SysExReassembler {
        &self.sysex
    }

    pub fn sysex_mut(&mut self) -> &mut SysExReassembler {
        &mut self.sysex
    }

    /// Feed one MIDI streaming bulk buffer to the session's reassembler.
    pub fn process_midi_buffer(&mut self, buffer_id: u64, data: &[u8]) -> BufferOutcome {
        self.sysex.process_buffer(buffer_id, data)
    }

    /// Tear the session down, returning any SysEx never completed.
    pub fn into_pending_sysex(self) -> Vec<PendingSysEx> {
        self.sysex.into_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_is_exclusive() {
        let mut session = Session::new();
        session.bind_class(ProtocolFamily::Audio).unwrap();
        session.bind_class(ProtocolFamily::Audio).unwrap();
        let err = session.bind_class(ProtocolFamily::Other(3)).unwrap_err();
        assert_eq!(
            err,
            SessionError::ClassConflict {
                bound: ProtocolFamily::Audio,
                requested: ProtocolFamily::Other(3),
            }
        );
        assert_eq!(session.family(), Some(ProtocolFamily::Audio));
    }

    #[test]
    fn version_context_is_set_once() {
        let mut session = Session::new();
        assert!(session.version_context().is_none());
        assert_eq!(
            session.audio_layout().unwrap_err(),
            DescriptorError::MissingVersion
        );
        session
            .get_or_create_version_context(AdcVersion::new(1, 0))
            .unwrap();
        session
            .get_or_create_version_context(AdcVersion::new(2, 0))
            .unwrap();
        assert_eq!(session.version_context().unwrap().major(), 1);
        assert_eq!(session.layout(), Some(Layout::V1));
        assert_eq!(session.family(), Some(ProtocolFamily::Audio));
    }

    #[test]
    fn foreign_session_refuses_context() {
        let mut session = Session::new();
        session.bind_class(ProtocolFamily::from_interface_class(0x03)).unwrap();
        let err = session
            .get_or_create_version_context(AdcVersion::new(2, 0))
            .unwrap_err();
        assert_eq!(
            err,
            DescriptorError::SessionConflict {
                bound: ProtocolFamily::Other(0x03),
            }
        );
        assert!(session.version_context().is_none());
    }

    #[test]
    fn sessions_do_not_share_sysex_state() {
        let mut first = Session::new();
        let second = Session::new();
        first.process_midi_buffer(0, &[0x04, 0xf0, 0x01, 0x02]);
        assert!(!first.sysex().is_idle());
        assert!(second.sysex().is_idle());
        let pending = first.into_pending_sysex();
        assert_eq!(pending[0].bytes, vec![0xf0, 0x01, 0x02]);
    }

    #[test]
    fn family_from_class_code() {
        assert_eq!(ProtocolFamily::from_interface_class(0x01), ProtocolFamily::Audio);
        assert_eq!(ProtocolFamily::Other(0x0e).to_string(), "interface class 0x0e");
    }
}
