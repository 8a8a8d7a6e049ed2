use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// An AMF0 data message (type 18): a handler name followed by values.
/// The core forwards type 18 verbatim; this wrapper is for collaborators
/// that want the structured view (onMetaData, @setDataFrame).
#[derive(Debug, Clone)]
pub struct RtmpData {
    pub name: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    pub fn new(name: impl Into<String>) -> Self {
        RtmpData {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Build an onMetaData message
    pub fn on_metadata(metadata: Amf0Object) -> Self {
        let mut data = RtmpData::new("onMetaData");
        data.values.push(Amf0Value::EcmaArray(metadata));
        data
    }

    /// Encode to an AMF0 payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();

        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        for value in &self.values {
            encoder.encode(value)?;
        }

        Ok(encoder.get_bytes())
    }

    /// Decode from an AMF0 payload
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::amf_decode("Data handler name must be a string"))?
            .to_string();

        let mut values = Vec::new();
        while decoder.has_remaining() {
            values.push(decoder.decode()?);
        }

        Ok(RtmpData { name, values })
    }

    /// Metadata property list if this is onMetaData
    pub fn metadata(&self) -> Option<&Amf0Object> {
        if self.name == "onMetaData" {
            self.values.first().and_then(|v| v.as_object())
        } else {
            None
        }
    }
}
