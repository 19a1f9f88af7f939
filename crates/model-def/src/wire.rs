// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary wire primitives for the compact definition encoding.
//!
//! # Wire format
//! ```text
//! bool    : 1 byte (0 or 1)
//! u32     : 4 bytes big-endian
//! f64     : 8 bytes big-endian (IEEE 754 bit pattern)
//! string  : u32 length prefix + UTF-8 bytes
//! ```
//!
//! Values are written back to back with no padding. The reader is strict:
//! every read is bounds-checked and the caller can assert full consumption
//! with [`WireReader::expect_end`].

use crate::DefinitionError;

/// Appends wire-encoded values to a growable byte buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes a single boolean byte.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Writes a `u32` as 4 big-endian bytes.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes an `f64` as its 8-byte big-endian bit pattern.
    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, s: &str) {
        // Strings over u32::MAX bytes cannot occur in practice; saturate
        // rather than panic.
        let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
        self.write_u32(len);
        self.buf.extend_from_slice(&s.as_bytes()[..len as usize]);
    }

    /// Writes a presence flag followed by the string when present.
    pub fn write_opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.write_bool(true);
                self.write_str(s);
            }
            None => self.write_bool(false),
        }
    }

    /// Writes a presence flag followed by the `u32` when present.
    pub fn write_opt_u32(&mut self, v: Option<u32>) {
        match v {
            Some(v) => {
                self.write_bool(true);
                self.write_u32(v);
            }
            None => self.write_bool(false),
        }
    }

    /// Writes a presence flag followed by the `f64` when present.
    pub fn write_opt_f64(&mut self, v: Option<f64>) {
        match v {
            Some(v) => {
                self.write_bool(true);
                self.write_f64(v);
            }
            None => self.write_bool(false),
        }
    }
}

/// Bounds-checked reader over a wire-encoded byte slice.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DefinitionError> {
        if self.remaining() < n {
            return Err(DefinitionError::Wire(format!(
                "unexpected end of payload: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining(),
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a boolean byte; any value other than 0 or 1 is an error.
    pub fn read_bool(&mut self) -> Result<bool, DefinitionError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DefinitionError::Wire(format!(
                "invalid boolean byte {other:#04x} at offset {}",
                self.pos - 1,
            ))),
        }
    }

    /// Reads a 4-byte big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, DefinitionError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an 8-byte big-endian `f64` bit pattern.
    pub fn read_f64(&mut self) -> Result<f64, DefinitionError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_bits(u64::from_be_bytes(raw)))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, DefinitionError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| DefinitionError::Wire(format!("invalid UTF-8 string: {e}")))
    }

    /// Reads a presence flag followed by the string when present.
    pub fn read_opt_str(&mut self) -> Result<Option<String>, DefinitionError> {
        if self.read_bool()? {
            Ok(Some(self.read_str()?))
        } else {
            Ok(None)
        }
    }

    /// Reads a presence flag followed by the `u32` when present.
    pub fn read_opt_u32(&mut self) -> Result<Option<u32>, DefinitionError> {
        if self.read_bool()? {
            Ok(Some(self.read_u32()?))
        } else {
            Ok(None)
        }
    }

    /// Reads a presence flag followed by the `f64` when present.
    pub fn read_opt_f64(&mut self) -> Result<Option<f64>, DefinitionError> {
        if self.read_bool()? {
            Ok(Some(self.read_f64()?))
        } else {
            Ok(None)
        }
    }

    /// Fails unless every byte of the payload has been consumed.
    pub fn expect_end(&self) -> Result<(), DefinitionError> {
        if self.remaining() != 0 {
            return Err(DefinitionError::Wire(format!(
                "{} trailing bytes after the definition payload",
                self.remaining(),
            )));
        }
        Ok(())
    }
}
