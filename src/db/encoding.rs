// Text codec for the VehicleAttributes column.
//
// Existing rows hold the attribute list with `", "` and `": "` separators
// and non-ASCII escaped as `\uXXXX`, so encoding keeps that layout. Any JSON
// decodes back, key order included.

use crate::domain::listing::VehicleAttributes;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    writer.write_all(format!("\\u{:04x}", unit).as_bytes())?;
                }
            }
        }
        Ok(())
    }
}

pub fn encode_attributes(attributes: &VehicleAttributes) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    attributes.serialize(&mut ser)?;
    // Only ASCII is ever written.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn decode_attributes(text: &str) -> Result<VehicleAttributes, serde_json::Error> {
    serde_json::from_str(text)
}
