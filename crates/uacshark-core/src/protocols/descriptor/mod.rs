//! USB Audio class-specific descriptor decoding (audio class 1.0 and 2.0).
//!
//! The decoder reads the common `bLength` / `bDescriptorType` /
//! `bDescriptorSubtype` prefix, selects a subtype parser from the interface
//! subclass and the session's version context, and reconciles the declared
//! length with the bytes the parser understood. The caller always advances
//! by the declared length, so a partially understood body never desyncs the
//! walk over a configuration descriptor.
//!
//! Version handling: the audio control header creates the session's
//! `VersionContext`. Every other parser needs a layout from it and refuses
//! (zero body bytes) when it is missing or the major version is unknown.
//!
//! Wire-format constants live in `layout`; bounded, field-recording reads in
//! `reader`; bitmask interpretation in `bitmap`.

pub mod bitmap;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod model;
pub mod parser;
pub mod reader;
pub mod version;

pub use decoder::{
    AudioSubclass, DecodedDescriptor, DescriptorClass, DescriptorKind, DescriptorWalk,
    InterfaceInfo, WalkedDescriptor, decode_descriptor, decode_descriptors,
};
pub use error::DescriptorError;
pub use version::{AdcVersion, Layout, VersionContext, bcd44_to_dec};
