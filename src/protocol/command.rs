use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// A decoded command message: procedure name, transaction id, the optional
/// command object, and the trailing arguments in wire order.
#[derive(Debug, Clone)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Option<Amf0Value>,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: None,
            arguments: Vec::new(),
        }
    }

    /// `_result` response to a client transaction
    pub fn result(transaction_id: f64, properties: Amf0Object, information: Amf0Value) -> Self {
        let mut cmd = RtmpCommand::new("_result", transaction_id);
        cmd.command_object = Some(Amf0Value::Object(properties));
        cmd.arguments.push(information);
        cmd
    }

    /// `_error` response to a client transaction
    pub fn error(transaction_id: f64, information: Amf0Value) -> Self {
        let mut cmd = RtmpCommand::new("_error", transaction_id);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(information);
        cmd
    }

    /// Encode command to an AMF0 payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();

        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;

        match &self.command_object {
            Some(obj) => encoder.encode(obj)?,
            None => encoder.encode(&Amf0Value::Null)?,
        }

        for arg in &self.arguments {
            encoder.encode(arg)?;
        }

        Ok(encoder.get_bytes())
    }

    /// Decode command from an AMF0 payload
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::amf_decode("Command name must be a string"))?
            .to_string();

        let transaction_id = decoder
            .decode()?
            .as_number()
            .ok_or_else(|| Error::amf_decode("Transaction id must be a number"))?;

        let command_object = if decoder.has_remaining() {
            Some(decoder.decode()?)
        } else {
            None
        };

        let mut arguments = Vec::new();
        while decoder.has_remaining() {
            arguments.push(decoder.decode()?);
        }

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments,
        })
    }
}
