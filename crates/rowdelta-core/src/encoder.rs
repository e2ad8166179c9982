//! Canonical field encoder.
//!
//! Every field value is turned into two things:
//!
//! - a **normalized value**, stored in the row payload and returned on read;
//! - a **fragment**, the canonical text used to build canonical keys and
//!   fingerprints.
//!
//! Fragments of one field set are joined with [`FIELD_SEPARATOR`]. No
//! fragment alphabet contains the separator:
//!
//! | Type | Fragment |
//! |---|---|
//! | integer | `-?[0-9]+` |
//! | bool | `true` / `false` |
//! | float / double / money | `-?[0-9]+\.[0-9]{6 / 12 / 2}` |
//! | string / hash | `"[0-9a-f]*"` |
//! | null (any type) | `~` |

use std::str::FromStr;

use rowdelta_core_types::Sensitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{DiffError, Result};

/// Separator between the fragments of one field set
pub const FIELD_SEPARATOR: &str = "|";

/// Fragment emitted for a JSON `null` of any type
pub const NULL_FRAGMENT: &str = "~";

/// Per-field encoder selected once at schema construction
pub type EncodeFn = fn(&Value) -> std::result::Result<Encoded, String>;

/// Field type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    String,
    Bool,
    /// Rounded to 6 decimal places
    Float,
    /// Rounded to 12 decimal places
    Double,
    /// Decimal string with exactly 2 decimal places
    Money,
    /// SHA-256 digest of the string form; the original value is discarded
    Hash,
}

impl FieldType {
    /// Parse a textual type tag (case-insensitive, common aliases accepted)
    pub fn parse_tag(tag: &str) -> Option<FieldType> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Some(FieldType::Integer),
            "string" | "str" | "text" => Some(FieldType::String),
            "bool" | "boolean" => Some(FieldType::Bool),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "money" | "decimal" => Some(FieldType::Money),
            "hash" => Some(FieldType::Hash),
            _ => None,
        }
    }

    /// Canonical tag name
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Money => "money",
            FieldType::Hash => "hash",
        }
    }

    /// The encoder function for this type
    pub fn encoder(self) -> EncodeFn {
        match self {
            FieldType::Integer => encode_integer,
            FieldType::String => encode_string,
            FieldType::Bool => encode_bool,
            FieldType::Float => encode_float,
            FieldType::Double => encode_double,
            FieldType::Money => encode_money,
            FieldType::Hash => encode_hash,
        }
    }
}

impl FromStr for FieldType {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::parse_tag(s).ok_or_else(|| DiffError::UnknownFieldType {
            field: String::new(),
            tag: s.to_string(),
        })
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of encoding one field value
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// Normalized value stored in the payload
    pub value: Value,
    /// Canonical text used in keys and fingerprints
    pub fragment: String,
}

impl Encoded {
    fn null() -> Self {
        Self {
            value: Value::Null,
            fragment: NULL_FRAGMENT.to_string(),
        }
    }
}

/// Encode one field value, attaching the field name to any failure
///
/// # Errors
///
/// Returns `InvalidValue` when the value cannot be cast to `field_type`.
pub fn encode_field(field: &str, field_type: FieldType, value: &Value) -> Result<Encoded> {
    (field_type.encoder())(value).map_err(|reason| DiffError::InvalidValue {
        field: field.to_string(),
        field_type: field_type.as_str().to_string(),
        reason,
    })
}

/// Encode a value read back from a stored payload
///
/// Identical to [`encode_field`] except that a hash field already holding a
/// digest keeps it instead of being hashed again.
///
/// # Errors
///
/// Returns `InvalidValue` when the value cannot be cast to `field_type`.
pub fn reencode_field(field: &str, field_type: FieldType, value: &Value) -> Result<Encoded> {
    match (field_type, value) {
        (FieldType::Hash, Value::String(s)) if is_digest(s) => Ok(Encoded {
            value: value.clone(),
            fragment: format!("\"{}\"", s),
        }),
        _ => encode_field(field, field_type, value),
    }
}

fn is_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Join fragments in declaration order
pub fn join_fragments<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    fragments
        .into_iter()
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

fn encode_integer(value: &Value) -> std::result::Result<Encoded, String> {
    let int = match value {
        Value::Null => return Ok(Encoded::null()),
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None if n.is_u64() => return Err(format!("{} is out of the 64-bit range", n)),
            None => truncate(n.as_f64().unwrap_or(f64::NAN))?,
        },
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(i) => i,
                Err(_) => truncate(
                    trimmed
                        .parse::<f64>()
                        .map_err(|_| format!("'{}' is not a number", trimmed))?,
                )?,
            }
        }
        other => return Err(format!("expected an integer, found {}", kind_of(other))),
    };

    Ok(Encoded {
        value: Value::from(int),
        fragment: int.to_string(),
    })
}

fn truncate(f: f64) -> std::result::Result<i64, String> {
    // 2^63 is exactly representable; anything at or above it overflows i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !f.is_finite() {
        return Err("non-finite number".to_string());
    }
    let t = f.trunc();
    if t >= LIMIT || t < -LIMIT {
        return Err(format!("{} is out of the 64-bit range", f));
    }
    Ok(t as i64)
}

fn encode_bool(value: &Value) -> std::result::Result<Encoded, String> {
    let truthy = match value {
        Value::Null => return Ok(Encoded::null()),
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    };

    Ok(Encoded {
        value: Value::Bool(truthy),
        fragment: truthy.to_string(),
    })
}

fn encode_float(value: &Value) -> std::result::Result<Encoded, String> {
    encode_fixed(value, 6)
}

fn encode_double(value: &Value) -> std::result::Result<Encoded, String> {
    encode_fixed(value, 12)
}

fn encode_fixed(value: &Value, places: usize) -> std::result::Result<Encoded, String> {
    let f = match value {
        Value::Null => return Ok(Encoded::null()),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s.trim()))?,
        other => return Err(format!("expected a number, found {}", kind_of(other))),
    };
    if !f.is_finite() {
        return Err("non-finite number".to_string());
    }

    let mut text = format!("{:.*}", places, f);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text.remove(0);
    }
    let rounded: f64 = text
        .parse()
        .map_err(|_| format!("cannot re-read rounded value '{}'", text))?;

    Ok(Encoded {
        value: Value::from(rounded),
        fragment: text,
    })
}

fn encode_money(value: &Value) -> std::result::Result<Encoded, String> {
    let text = match value {
        Value::Null => return Ok(Encoded::null()),
        // The JSON text, not the binary float, is the source of truth
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(format!("expected a decimal, found {}", kind_of(other))),
    };

    let parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("'{}' is not a decimal: {}", text, e))?;

    let mut amount = parsed.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);
    if amount.is_zero() {
        amount.set_sign_positive(true);
    }
    let formatted = amount.to_string();

    Ok(Encoded {
        value: Value::String(formatted.clone()),
        fragment: formatted,
    })
}

fn encode_string(value: &Value) -> std::result::Result<Encoded, String> {
    let Some(cast) = string_cast(value) else {
        return Ok(Encoded::null());
    };
    let fragment = quote_hex(cast.trim().as_bytes());

    Ok(Encoded {
        value: Value::String(cast),
        fragment,
    })
}

fn encode_hash(value: &Value) -> std::result::Result<Encoded, String> {
    let Some(cast) = string_cast(value) else {
        return Ok(Encoded::null());
    };
    let input = Sensitive::new(cast);
    let digest = hex::encode(Sha256::digest(input.expose().as_bytes()));
    let fragment = format!("\"{}\"", digest);

    Ok(Encoded {
        value: Value::String(digest),
        fragment,
    })
}

fn string_cast(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        composite => Some(composite.to_string()),
    }
}

fn quote_hex(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(bytes))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
