use crate::amf::amf0::{Amf0Object, Amf0Value, markers};
use crate::{ByteBuffer, Error, Result};

/// Recursive-descent decoder over one ByteBuffer. The cursor position after
/// a decode() call is the number of bytes the value consumed.
pub struct Amf0Decoder<'a> {
    buffer: &'a mut ByteBuffer,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buffer: &'a mut ByteBuffer) -> Self {
        Amf0Decoder { buffer }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.buffer.remaining() > 0
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        let marker = self.read_u8()?;
        match marker {
            markers::NUMBER => self.decode_number(),
            markers::BOOLEAN => self.decode_boolean(),
            markers::STRING => self.decode_string(),
            markers::OBJECT => Ok(Amf0Value::Object(self.decode_pairs()?)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => self.decode_ecma_array(),
            markers::STRICT_ARRAY => self.decode_strict_array(),
            markers::DATE => self.decode_date(),
            markers::LONG_STRING => self.decode_long_string(),
            other => Err(Error::UnsupportedAmfType(other)),
        }
    }

    fn decode_number(&mut self) -> Result<Amf0Value> {
        let value = self.read_f64()?;
        Ok(Amf0Value::Number(value))
    }

    fn decode_boolean(&mut self) -> Result<Amf0Value> {
        let value = self.read_u8()? != 0;
        Ok(Amf0Value::Boolean(value))
    }

    fn decode_string(&mut self) -> Result<Amf0Value> {
        let len = self.read_u16()? as usize;
        Ok(Amf0Value::String(self.read_utf8(len)?))
    }

    /// Key/value pairs terminated by the 0x00 0x00 0x09 end-marker triplet
    fn decode_pairs(&mut self) -> Result<Amf0Object> {
        let mut object = Amf0Object::new();
        loop {
            let name_len = self.read_u16()? as usize;
            if name_len == 0 {
                let end = self.read_u8()?;
                if end != markers::OBJECT_END {
                    return Err(Error::amf_decode(format!(
                        "Expected object end marker, found 0x{:02x}",
                        end
                    )));
                }
                break;
            }
            let name = self.read_utf8(name_len)?;
            let value = self.decode()?;
            object.push((name, value));
        }
        Ok(object)
    }

    fn decode_ecma_array(&mut self) -> Result<Amf0Value> {
        // Declared count is advisory; the end marker is authoritative
        let _count = self.read_u32()?;
        Ok(Amf0Value::EcmaArray(self.decode_pairs()?))
    }

    fn decode_strict_array(&mut self) -> Result<Amf0Value> {
        let count = self.read_u32()? as usize;
        let mut array = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            array.push(self.decode()?);
        }
        Ok(Amf0Value::StrictArray(array))
    }

    fn decode_date(&mut self) -> Result<Amf0Value> {
        let timestamp = self.read_f64()?;
        let timezone = self
            .buffer
            .read_i16_be()
            .map_err(|_| Error::amf_decode("Truncated date value"))?;
        Ok(Amf0Value::Date(timestamp, timezone))
    }

    fn decode_long_string(&mut self) -> Result<Amf0Value> {
        let len = self.read_u32()? as usize;
        Ok(Amf0Value::LongString(self.read_utf8(len)?))
    }

    // Truncation inside a value is an AMF error, not an IO error: it tears
    // down one message, never the connection.
    fn read_u8(&mut self) -> Result<u8> {
        self.buffer
            .read_u8()
            .map_err(|_| Error::amf_decode("Truncated value"))
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.buffer
            .read_u16_be()
            .map_err(|_| Error::amf_decode("Truncated value"))
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.buffer
            .read_u32_be()
            .map_err(|_| Error::amf_decode("Truncated value"))
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.buffer
            .read_f64_be()
            .map_err(|_| Error::amf_decode("Truncated number"))
    }

    fn read_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self
            .buffer
            .read_bytes(len)
            .map_err(|_| Error::amf_decode("Truncated string"))?;
        String::from_utf8(bytes).map_err(|e| Error::amf_decode(format!("Invalid UTF-8: {}", e)))
    }
}
