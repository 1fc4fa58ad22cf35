//! Length-delimited protobuf `MetricFamily` records (panic-free).
//!
//! Each record is a base-128 varint length followed by that many bytes of a
//! serialized `io.prometheus.client.MetricFamily`. Chunks may split a record
//! anywhere; bytes are buffered until a whole record is available.
//!
//! Parsing rules:
//! - Never index the buffer; varints are peeked through iterators.
//! - End of stream on a record boundary is success. Anything left in the
//!   buffer at `finish` is a truncated record.

use bytes::{Buf, BytesMut};
use prost::Message;

use crate::error::{DecodeError, Result};
use crate::model::MetricFamily;
use crate::protocol::pb::PbMetricFamily;

/// Default upper bound for a single record.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 4 << 20;

const MAX_VARINT_LEN: usize = 10;

/// Incremental decoder for a delimited record stream.
#[derive(Debug)]
pub struct DelimitedDecoder {
    buf: BytesMut,
    families: Vec<MetricFamily>,
    max_record: usize,
}

impl Default for DelimitedDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORD_BYTES)
    }
}

impl DelimitedDecoder {
    pub fn new(max_record: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            families: Vec::new(),
            max_record,
        }
    }

    /// Append a chunk and decode every record it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(chunk);

        while let Some((len, prefix)) = peek_varint(&self.buf)? {
            if len > self.max_record as u64 {
                return Err(DecodeError::RecordTooLarge {
                    len,
                    limit: self.max_record,
                });
            }
            // len <= max_record, so the cast is lossless
            let len = len as usize;
            if self.buf.remaining() < prefix + len {
                break;
            }

            self.buf.advance(prefix);
            let record = self.buf.split_to(len).freeze();
            let pb = PbMetricFamily::decode(record)?;
            let family = MetricFamily::try_from(pb)?;
            tracing::trace!(family = %family.name, metrics = family.metrics.len(), "decoded record");
            self.families.push(family);
        }
        Ok(())
    }

    /// End of stream: succeed only on a record boundary.
    pub fn finish(self) -> Result<Vec<MetricFamily>> {
        if !self.buf.is_empty() {
            return Err(DecodeError::Truncated {
                pending: self.buf.len(),
            });
        }
        Ok(self.families)
    }
}

/// Peek a varint length prefix. `Ok(None)` means more bytes are needed.
fn peek_varint(buf: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value: u64 = 0;
    for (i, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        return Err(DecodeError::Malformed("length prefix varint overflow".into()));
    }
    Ok(None)
}

/// Encode families as a delimited record stream.
pub fn encode_delimited(families: &[MetricFamily]) -> Vec<u8> {
    let mut out = Vec::new();
    for mf in families {
        out.extend(PbMetricFamily::from(mf).encode_length_delimited_to_vec());
    }
    out
}
