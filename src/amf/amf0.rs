/// Ordered property list backing Object and EcmaArray values. AMF0 objects
/// keep their wire order, so encode(decode(bytes)) reproduces bytes.
pub type Amf0Object = Vec<(String, Amf0Value)>;

/// AMF0 value types used inside command and data messages
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),              // 0x00
    Boolean(bool),            // 0x01
    String(String),           // 0x02
    Object(Amf0Object),       // 0x03
    Null,                     // 0x05
    Undefined,                // 0x06
    EcmaArray(Amf0Object),    // 0x08
    StrictArray(Vec<Amf0Value>), // 0x0A
    Date(f64, i16),           // 0x0B, timezone carried but ignored
    LongString(String),       // 0x0C
}

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09; // terminates the 0x00 0x00 0x09 triplet
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
}

impl Amf0Value {
    /// Extract number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract object property list
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(obj) | Amf0Value::EcmaArray(obj) => Some(obj),
            _ => None,
        }
    }

    /// Look up a property by key in an Object or EcmaArray
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object()
            .and_then(|obj| obj.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v)
    }

    /// Check if null or undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }
}
