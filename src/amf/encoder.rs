use crate::amf::amf0::{Amf0Object, Amf0Value, markers};
use crate::{ByteBuffer, Error, Result};

/// Serializes Amf0Values; the exact inverse of Amf0Decoder
pub struct Amf0Encoder {
    buffer: ByteBuffer,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: ByteBuffer::with_capacity(1024),
        }
    }

    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => self.encode_number(*n),
            Amf0Value::Boolean(b) => self.encode_boolean(*b),
            Amf0Value::String(s) => self.encode_string(s),
            Amf0Value::Object(obj) => self.encode_object(obj),
            Amf0Value::Null => self.encode_marker(markers::NULL),
            Amf0Value::Undefined => self.encode_marker(markers::UNDEFINED),
            Amf0Value::EcmaArray(obj) => self.encode_ecma_array(obj),
            Amf0Value::StrictArray(arr) => self.encode_strict_array(arr),
            Amf0Value::Date(timestamp, timezone) => self.encode_date(*timestamp, *timezone),
            Amf0Value::LongString(s) => self.encode_long_string(s),
        }
    }

    fn encode_marker(&mut self, marker: u8) -> Result<()> {
        self.buffer.write_u8(marker)?;
        Ok(())
    }

    fn encode_number(&mut self, value: f64) -> Result<()> {
        self.buffer.write_u8(markers::NUMBER)?;
        self.buffer.write_f64_be(value)?;
        Ok(())
    }

    fn encode_boolean(&mut self, value: bool) -> Result<()> {
        self.buffer.write_u8(markers::BOOLEAN)?;
        self.buffer.write_u8(if value { 1 } else { 0 })?;
        Ok(())
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        if value.len() > u16::MAX as usize {
            return Err(Error::amf_encode("String exceeds u16 length prefix"));
        }
        self.buffer.write_u8(markers::STRING)?;
        self.write_key(value)?;
        Ok(())
    }

    fn encode_object(&mut self, obj: &Amf0Object) -> Result<()> {
        self.buffer.write_u8(markers::OBJECT)?;
        self.encode_pairs(obj)
    }

    fn encode_ecma_array(&mut self, obj: &Amf0Object) -> Result<()> {
        self.buffer.write_u8(markers::ECMA_ARRAY)?;
        self.buffer.write_u32_be(obj.len() as u32)?;
        self.encode_pairs(obj)
    }

    fn encode_pairs(&mut self, obj: &Amf0Object) -> Result<()> {
        for (key, value) in obj {
            self.write_key(key)?;
            self.encode(value)?;
        }
        // End-marker triplet
        self.buffer.write_u16_be(0)?;
        self.buffer.write_u8(markers::OBJECT_END)?;
        Ok(())
    }

    fn encode_strict_array(&mut self, arr: &[Amf0Value]) -> Result<()> {
        self.buffer.write_u8(markers::STRICT_ARRAY)?;
        self.buffer.write_u32_be(arr.len() as u32)?;
        for value in arr {
            self.encode(value)?;
        }
        Ok(())
    }

    fn encode_date(&mut self, timestamp: f64, timezone: i16) -> Result<()> {
        self.buffer.write_u8(markers::DATE)?;
        self.buffer.write_f64_be(timestamp)?;
        self.buffer.write_i16_be(timezone)?;
        Ok(())
    }

    fn encode_long_string(&mut self, value: &str) -> Result<()> {
        self.buffer.write_u8(markers::LONG_STRING)?;
        self.buffer.write_u32_be(value.len() as u32)?;
        self.buffer.write_bytes(value.as_bytes())?;
        Ok(())
    }

    /// Length-prefixed UTF-8 without a type marker (object keys)
    fn write_key(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(Error::amf_encode("Property name exceeds u16 length prefix"));
        }
        self.buffer.write_u16_be(bytes.len() as u16)?;
        self.buffer.write_bytes(bytes)?;
        Ok(())
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::Amf0Decoder;

    fn round_trip(value: Amf0Value) {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&value).unwrap();

        let mut buffer = ByteBuffer::new(encoder.get_bytes());
        let decoded = Amf0Decoder::new(&mut buffer).decode().unwrap();
        assert_eq!(decoded, value);
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(Amf0Value::Number(-1.5));
        round_trip(Amf0Value::Boolean(true));
        round_trip(Amf0Value::String("onMetaData".to_string()));
        round_trip(Amf0Value::Null);
        round_trip(Amf0Value::Undefined);
        round_trip(Amf0Value::Date(1.7e12, 0));
        round_trip(Amf0Value::LongString("x".repeat(70_000)));
    }

    #[test]
    fn test_nested_round_trip() {
        round_trip(Amf0Value::Object(vec![
            ("app".to_string(), Amf0Value::String("live".to_string())),
            (
                "caps".to_string(),
                Amf0Value::StrictArray(vec![
                    Amf0Value::Number(15.0),
                    Amf0Value::Object(vec![("deep".to_string(), Amf0Value::Boolean(false))]),
                ]),
            ),
            (
                "meta".to_string(),
                Amf0Value::EcmaArray(vec![("duration".to_string(), Amf0Value::Number(0.0))]),
            ),
        ]));
    }

    #[test]
    fn test_object_end_marker_bytes() {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::Object(Vec::new())).unwrap();
        assert_eq!(encoder.get_bytes(), vec![0x03, 0x00, 0x00, 0x09]);
    }
}
