//! Key/value schema compiled into per-field encoders.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoder::{join_fragments, reencode_field, EncodeFn, Encoded, FieldType};
use crate::errors::{DiffError, Result};

/// A record: JSON object keyed by field name
pub type Record = serde_json::Map<String, Value>;

/// Declared field: name plus type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledField {
    name: String,
    field_type: FieldType,
    encode: EncodeFn,
}

impl CompiledField {
    fn compile(spec: FieldSpec) -> Self {
        Self {
            encode: spec.field_type.encoder(),
            name: spec.name,
            field_type: spec.field_type,
        }
    }

    fn lookup<'r>(&self, record: &'r Record) -> Result<&'r Value> {
        record.get(&self.name).ok_or_else(|| DiffError::MissingField {
            field: self.name.clone(),
        })
    }

    fn encode(&self, record: &Record) -> Result<Encoded> {
        let value = self.lookup(record)?;
        (self.encode)(value).map_err(|reason| DiffError::InvalidValue {
            field: self.name.clone(),
            field_type: self.field_type.as_str().to_string(),
            reason,
        })
    }

    fn reencode(&self, record: &Record) -> Result<Encoded> {
        reencode_field(&self.name, self.field_type, self.lookup(record)?)
    }
}

/// Output of encoding one record against a schema
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub canonical_key: String,
    pub fingerprint: String,
    /// Normalized key and value fields; unknown input fields are dropped
    pub payload: Record,
}

/// Ordered key fields and value fields, validated and compiled once
///
/// # Example
///
/// ```
/// use rowdelta_core::schema::Schema;
///
/// let schema = Schema::from_tags(
///     &[("id", "integer")],
///     &[("name", "string"), ("total", "money")],
/// )
/// .unwrap();
/// assert_eq!(schema.value_fields().collect::<Vec<_>>(), ["name", "total"]);
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    key: Vec<CompiledField>,
    value: Vec<CompiledField>,
}

impl Schema {
    /// Build a schema from typed field specs
    ///
    /// # Errors
    ///
    /// - `EmptyFieldSet` if either set has no fields
    /// - `DuplicateField` if a name repeats within one set
    ///
    /// A name may appear in both sets. It then contributes a fragment to the
    /// canonical key and to the fingerprint, and the payload holds the value
    /// normalized under its key type.
    pub fn new(key: Vec<FieldSpec>, value: Vec<FieldSpec>) -> Result<Self> {
        if key.is_empty() {
            return Err(DiffError::EmptyFieldSet { set: "key" });
        }
        if value.is_empty() {
            return Err(DiffError::EmptyFieldSet { set: "value" });
        }

        check_unique(&key)?;
        check_unique(&value)?;

        Ok(Self {
            key: key.into_iter().map(CompiledField::compile).collect(),
            value: value.into_iter().map(CompiledField::compile).collect(),
        })
    }

    /// Build a schema from `(name, type tag)` pairs
    ///
    /// # Errors
    ///
    /// - `UnknownFieldType` for an unrecognized tag
    /// - everything [`Schema::new`] rejects
    pub fn from_tags<N, T>(key: &[(N, T)], value: &[(N, T)]) -> Result<Self>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        Self::new(parse_specs(key)?, parse_specs(value)?)
    }

    /// Key field names in declaration order
    pub fn key_fields(&self) -> impl Iterator<Item = &str> {
        self.key.iter().map(|f| f.name.as_str())
    }

    /// Value field names in declaration order
    pub fn value_fields(&self) -> impl Iterator<Item = &str> {
        self.value.iter().map(|f| f.name.as_str())
    }

    /// Declared specs, key set then value set
    pub fn specs(&self) -> (Vec<FieldSpec>, Vec<FieldSpec>) {
        let to_specs = |fields: &[CompiledField]| {
            fields
                .iter()
                .map(|f| FieldSpec::new(f.name.clone(), f.field_type))
                .collect()
        };
        (to_specs(&self.key), to_specs(&self.value))
    }

    /// Type of a key or value field
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.key
            .iter()
            .chain(self.value.iter())
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Encode a full record into canonical key, fingerprint and payload
    ///
    /// # Errors
    ///
    /// `MissingField` or `InvalidValue` for the first field that fails.
    pub fn encode(&self, record: &Record) -> Result<EncodedRow> {
        self.encode_with(record, CompiledField::encode)
    }

    /// Encode a record built from stored payloads (e.g. a merge result)
    ///
    /// Hash fields that already hold a digest are kept as is.
    ///
    /// # Errors
    ///
    /// `MissingField` or `InvalidValue` for the first field that fails.
    pub fn reencode(&self, record: &Record) -> Result<EncodedRow> {
        self.encode_with(record, CompiledField::reencode)
    }

    fn encode_with(
        &self,
        record: &Record,
        encode: fn(&CompiledField, &Record) -> Result<Encoded>,
    ) -> Result<EncodedRow> {
        let mut payload = Record::new();

        let mut key_fragments = Vec::with_capacity(self.key.len());
        for field in &self.key {
            let encoded = encode(field, record)?;
            key_fragments.push(encoded.fragment);
            payload.insert(field.name.clone(), encoded.value);
        }

        let mut value_fragments = Vec::with_capacity(self.value.len());
        for field in &self.value {
            let encoded = encode(field, record)?;
            value_fragments.push(encoded.fragment);
            // A field shared with the key set keeps its key normalization
            payload.entry(field.name.clone()).or_insert(encoded.value);
        }

        Ok(EncodedRow {
            canonical_key: join_fragments(key_fragments.iter().map(String::as_str)),
            fingerprint: join_fragments(value_fragments.iter().map(String::as_str)),
            payload,
        })
    }

    /// Encode only the key fields of a record (value fields may be absent)
    ///
    /// # Errors
    ///
    /// `MissingField` or `InvalidValue` for the first key field that fails.
    pub fn canonical_key(&self, record: &Record) -> Result<String> {
        let fragments = self
            .key
            .iter()
            .map(|field| field.encode(record).map(|e| e.fragment))
            .collect::<Result<Vec<_>>>()?;
        Ok(join_fragments(fragments.iter().map(String::as_str)))
    }

    /// Fragment of a stored value under a declared field's type
    ///
    /// Returns `None` for undeclared fields or values that do not encode.
    pub fn fragment_of(&self, name: &str, value: &Value) -> Option<String> {
        let field_type = self.field_type(name)?;
        reencode_field(name, field_type, value)
            .ok()
            .map(|e| e.fragment)
    }
}

fn check_unique(specs: &[FieldSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(DiffError::DuplicateField {
                field: spec.name.clone(),
            });
        }
    }
    Ok(())
}

fn parse_specs<N, T>(pairs: &[(N, T)]) -> Result<Vec<FieldSpec>>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    pairs
        .iter()
        .map(|(name, tag)| {
            let name = name.as_ref();
            FieldType::parse_tag(tag.as_ref())
                .map(|ft| FieldSpec::new(name, ft))
                .ok_or_else(|| DiffError::UnknownFieldType {
                    field: name.to_string(),
                    tag: tag.as_ref().to_string(),
                })
        })
        .collect()
}
