//! Exposition format codecs.
//!
//! A `/metrics` response is decoded by one of two independent decoders:
//! - [`delimited`]: varint length-prefixed protobuf `MetricFamily` records.
//! - [`text`]: the line-oriented text exposition format.
//!
//! [`Format::select`] picks one from the parsed `Content-Type`; [`FamilyDecoder`]
//! wraps the chosen decoder behind a single `feed`/`finish` interface.

pub mod delimited;
pub mod media_type;
pub mod pb;
pub mod text;

pub use delimited::{encode_delimited, DelimitedDecoder, DEFAULT_MAX_RECORD_BYTES};
pub use media_type::MediaType;
pub use text::{render_text, TextDecoder};

use crate::error::Result;
use crate::model::MetricFamily;

/// Media type of the protobuf exposition format.
pub const PROTOBUF_MEDIA_TYPE: &str = "application/vnd.google.protobuf";
/// `proto` parameter naming the record message.
pub const METRIC_FAMILY_PROTO: &str = "io.prometheus.client.MetricFamily";
/// `encoding` parameter for length-delimited records.
pub const DELIMITED_ENCODING: &str = "delimited";

/// `Accept` header sent to metrics endpoints: delimited protobuf preferred, text as fallback.
pub const ACCEPT_HEADER: &str = "application/vnd.google.protobuf;proto=io.prometheus.client.MetricFamily;encoding=delimited;q=0.7,text/plain;version=0.0.4;q=0.3";

/// Wire encoding of a metrics response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Delimited,
    Text,
}

impl Format {
    /// Exact match on media type plus `proto` and `encoding` selects
    /// [`Format::Delimited`]; everything else is text.
    pub fn select(mt: &MediaType) -> Self {
        if mt.essence == PROTOBUF_MEDIA_TYPE
            && mt.param("proto") == Some(METRIC_FAMILY_PROTO)
            && mt.param("encoding") == Some(DELIMITED_ENCODING)
        {
            Format::Delimited
        } else {
            Format::Text
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Delimited => "delimited",
            Format::Text => "text",
        }
    }
}

/// Streaming decoder for one response body.
#[derive(Debug)]
pub enum FamilyDecoder {
    Delimited(DelimitedDecoder),
    Text(TextDecoder),
}

impl FamilyDecoder {
    pub fn new(format: Format) -> Self {
        match format {
            Format::Delimited => FamilyDecoder::Delimited(DelimitedDecoder::default()),
            Format::Text => FamilyDecoder::Text(TextDecoder::new()),
        }
    }

    /// Parse `content_type` and build the matching decoder.
    pub fn for_content_type(content_type: &str) -> Result<Self> {
        let mt = MediaType::parse(content_type)?;
        Ok(Self::new(Format::select(&mt)))
    }

    /// Same as [`FamilyDecoder::for_content_type`] with a custom delimited record limit.
    pub fn with_record_limit(content_type: &str, max_record: usize) -> Result<Self> {
        let mt = MediaType::parse(content_type)?;
        Ok(match Format::select(&mt) {
            Format::Delimited => FamilyDecoder::Delimited(DelimitedDecoder::new(max_record)),
            Format::Text => FamilyDecoder::Text(TextDecoder::new()),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            FamilyDecoder::Delimited(_) => Format::Delimited,
            FamilyDecoder::Text(_) => Format::Text,
        }
    }

    /// Feed the next body chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        match self {
            FamilyDecoder::Delimited(d) => d.feed(chunk),
            FamilyDecoder::Text(t) => t.feed(chunk),
        }
    }

    /// End of body: return every family, or the first error.
    pub fn finish(self) -> Result<Vec<MetricFamily>> {
        match self {
            FamilyDecoder::Delimited(d) => d.finish(),
            FamilyDecoder::Text(t) => t.finish(),
        }
    }
}

/// Decode a complete body in one call.
pub fn decode(content_type: &str, body: &[u8]) -> Result<Vec<MetricFamily>> {
    let mut dec = FamilyDecoder::for_content_type(content_type)?;
    dec.feed(body)?;
    dec.finish()
}
