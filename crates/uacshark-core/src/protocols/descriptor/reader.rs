use serde::{Deserialize, Serialize};

use super::bitmap::{BitField, BitmapTable};
use super::error::DescriptorError;
use super::version::AdcVersion;
use crate::protocols::common::reader::{hex_bytes, u24_le};

/// One decoded field, located relative to the descriptor start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub offset: usize,
    pub length: usize,
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bits: Vec<BitField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U24(u32),
    U32(u32),
    /// `bcdADC` rendered as `major + minor / 100`.
    Version(f64),
    /// Raw byte run, lowercase hex.
    Bytes(String),
}

/// Bounded cursor over one descriptor that records every field it reads.
///
/// The slice handed in is already cut at `min(total_length, supplied)`, so no
/// read can pass the declared length. Failed reads leave the cursor untouched.
pub struct DescriptorReader<'a> {
    bytes: &'a [u8],
    declared_len: usize,
    offset: usize,
    fields: Vec<Field>,
}

/// Cursor position and field count, used to roll back a refused body.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    offset: usize,
    fields: usize,
}

impl<'a> DescriptorReader<'a> {
    pub fn new(bytes: &'a [u8], declared_len: usize) -> Self {
        let bounded = &bytes[..bytes.len().min(declared_len)];
        Self {
            bytes: bounded,
            declared_len,
            offset: 0,
            fields: Vec::new(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    /// Bytes left before the declared end, whether or not they were supplied.
    pub fn remaining_declared(&self) -> usize {
        self.declared_len.saturating_sub(self.offset)
    }

    pub fn mark(&self) -> Mark {
        Mark {
            offset: self.offset,
            fields: self.fields.len(),
        }
    }

    pub fn rewind(&mut self, mark: Mark) {
        self.offset = mark.offset;
        self.fields.truncate(mark.fields);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DescriptorError> {
        let bytes: &'a [u8] = self.bytes;
        let end = self.offset + len;
        bytes
            .get(self.offset..end)
            .ok_or(DescriptorError::TooShort {
                field,
                needed: end,
                actual: bytes.len(),
            })
    }

    fn record(&mut self, name: &'static str, len: usize, value: FieldValue, bits: Vec<BitField>) {
        self.fields.push(Field {
            name: name.to_string(),
            offset: self.offset,
            length: len,
            value,
            bits,
        });
        self.offset += len;
    }

    pub fn u8(&mut self, name: &'static str) -> Result<u8, DescriptorError> {
        let value = self.take(name, 1)?[0];
        self.record(name, 1, FieldValue::U8(value), Vec::new());
        Ok(value)
    }

    pub fn u16_le(&mut self, name: &'static str) -> Result<u16, DescriptorError> {
        let bytes = self.take(name, 2)?;
        let value = u16::from_le_bytes([bytes[0], bytes[1]]);
        self.record(name, 2, FieldValue::U16(value), Vec::new());
        Ok(value)
    }

    pub fn u24_le(&mut self, name: &'static str) -> Result<u32, DescriptorError> {
        let bytes = self.take(name, 3)?;
        let value = u24_le([bytes[0], bytes[1], bytes[2]]);
        self.record(name, 3, FieldValue::U24(value), Vec::new());
        Ok(value)
    }

    pub fn u32_le(&mut self, name: &'static str) -> Result<u32, DescriptorError> {
        let bytes = self.take(name, 4)?;
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.record(name, 4, FieldValue::U32(value), Vec::new());
        Ok(value)
    }

    pub fn bytes(&mut self, name: &'static str, len: usize) -> Result<&'a [u8], DescriptorError> {
        let bytes = self.take(name, len)?;
        self.record(name, len, FieldValue::Bytes(hex_bytes(bytes)), Vec::new());
        Ok(bytes)
    }

    /// Little-endian bitmask of `len` bytes (1, 2 or 4) interpreted by `table`.
    pub fn bitmap(
        &mut self,
        name: &'static str,
        len: usize,
        table: &BitmapTable,
    ) -> Result<u32, DescriptorError> {
        let bytes = self.take(name, len)?;
        let (value, field_value) = match *bytes {
            [b0] => (u32::from(b0), FieldValue::U8(b0)),
            [b0, b1] => {
                let value = u16::from_le_bytes([b0, b1]);
                (u32::from(value), FieldValue::U16(value))
            }
            [b0, b1, b2, b3] => {
                let value = u32::from_le_bytes([b0, b1, b2, b3]);
                (value, FieldValue::U32(value))
            }
            _ => return self.bytes(name, len).map(|_| 0),
        };
        self.record(name, len, field_value, table.decode(value));
        Ok(value)
    }

    /// Raw byte run whose leading bytes carry named bits.
    pub fn bytes_with_bits(
        &mut self,
        name: &'static str,
        len: usize,
        table: &BitmapTable,
    ) -> Result<&'a [u8], DescriptorError> {
        let bytes = self.take(name, len)?;
        let bits = table.decode_bytes(bytes);
        self.record(name, len, FieldValue::Bytes(hex_bytes(bytes)), bits);
        Ok(bytes)
    }

    /// `bcdADC`. An out-of-range nibble fails without recording the field.
    pub fn bcd_version(&mut self, name: &'static str) -> Result<AdcVersion, DescriptorError> {
        let bytes = self.take(name, 2)?;
        let version = AdcVersion::from_bcd(u16::from_le_bytes([bytes[0], bytes[1]]))?;
        self.record(name, 2, FieldValue::Version(version.as_f64()), Vec::new());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::descriptor::bitmap::{FEATURE_UNIT_CONTROLS, HEADER_CONTROLS};

    #[test]
    fn reads_record_offsets_and_lengths() {
        let data = [0x09, 0x24, 0x01, 0x34, 0x12, 0x44, 0xac, 0x00];
        let mut reader = DescriptorReader::new(&data, data.len());
        assert_eq!(reader.u8("bLength").unwrap(), 9);
        reader.u8("bDescriptorType").unwrap();
        reader.u8("bDescriptorSubtype").unwrap();
        assert_eq!(reader.u16_le("wValue").unwrap(), 0x1234);
        assert_eq!(reader.u24_le("tSamFreq").unwrap(), 44_100);
        let fields = reader.fields();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[3].offset, 3);
        assert_eq!(fields[3].length, 2);
        assert_eq!(fields[4].offset, 5);
        assert_eq!(fields[4].value, FieldValue::U24(44_100));
    }

    #[test]
    fn never_reads_past_declared_length() {
        let data = [0x04, 0x24, 0x02, 0x01, 0xff, 0xff];
        let mut reader = DescriptorReader::new(&data, 4);
        reader.bytes("prefix", 3).unwrap();
        assert_eq!(reader.u8("bTerminalID").unwrap(), 1);
        let err = reader.u8("wTerminalType").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::TooShort {
                field: "wTerminalType",
                needed: 5,
                actual: 4,
            }
        );
        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.remaining_declared(), 0);
    }

    #[test]
    fn supplied_bytes_shorter_than_declared() {
        let data = [0x0a, 0x24, 0x06];
        let mut reader = DescriptorReader::new(&data, 10);
        reader.bytes("prefix", 3).unwrap();
        assert_eq!(reader.remaining_declared(), 7);
        assert!(reader.u8("bUnitID").is_err());
    }

    #[test]
    fn rewind_drops_fields() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = DescriptorReader::new(&data, data.len());
        reader.u8("a").unwrap();
        let mark = reader.mark();
        reader.u16_le("b").unwrap();
        reader.rewind(mark);
        assert_eq!(reader.offset(), 1);
        assert_eq!(reader.fields().len(), 1);
    }

    #[test]
    fn bitmap_attaches_named_bits() {
        let data = [0x05];
        let mut reader = DescriptorReader::new(&data, 1);
        assert_eq!(reader.bitmap("bmControls", 1, &HEADER_CONTROLS).unwrap(), 5);
        let field = &reader.fields()[0];
        assert_eq!(field.bits[0].name, "Latency control");
        assert_eq!(field.bits[0].value, 1);
        assert_eq!(field.bits[1].value, 1);
    }

    #[test]
    fn bytes_with_bits_reads_two_bytes_of_names() {
        let data = [0x01, 0x02, 0xff];
        let mut reader = DescriptorReader::new(&data, 3);
        reader
            .bytes_with_bits("bmaControls", 3, &FEATURE_UNIT_CONTROLS)
            .unwrap();
        let field = &reader.fields()[0];
        assert_eq!(field.value, FieldValue::Bytes("0102ff".to_string()));
        let mute = field.bits.iter().find(|bit| bit.name == "Mute").unwrap();
        let loudness = field.bits.iter().find(|bit| bit.name == "Loudness").unwrap();
        assert_eq!(mute.value, 1);
        assert_eq!(loudness.value, 1);
    }

    #[test]
    fn bcd_version_rejects_without_advancing() {
        let data = [0x0a, 0x01];
        let mut reader = DescriptorReader::new(&data, 2);
        assert!(reader.bcd_version("bcdADC").is_err());
        assert_eq!(reader.offset(), 0);
        assert!(reader.fields().is_empty());
    }
}
