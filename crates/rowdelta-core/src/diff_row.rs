//! Classification results with field-level diff extraction.

use std::fmt;
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::schema::{Record, Schema};

/// Characters of a string value kept in a row's text rendering
pub const SHORTEN_AT: usize = 32;

/// How a row relates to its counterpart side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    /// Key present only on the local side
    New,
    /// Key on both sides, fingerprints differ
    Changed,
    /// Key on both sides, fingerprints equal
    Unchanged,
    /// Key present only on the foreign side
    Missing,
}

impl RowChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowChange::New => "New",
            RowChange::Changed => "Changed",
            RowChange::Unchanged => "Unchanged",
            RowChange::Missing => "Missing",
        }
    }
}

/// One field's `(old, new)` pair: old is the foreign value, new the local one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange(pub Value, pub Value);

impl FieldChange {
    pub fn old_value(&self) -> &Value {
        &self.0
    }

    pub fn new_value(&self) -> &Value {
        &self.1
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", shortened(&self.0), shortened(&self.1))
    }
}

/// Differing fields in the order they were requested
///
/// Serializes as `{"field": [old, new]}` with keys in that same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff(Vec<(String, FieldChange)>);

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, change)| change)
    }

    /// Field names in request order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as `{"field": [old, new], ...}`
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, change)| {
                    (
                        name.clone(),
                        Value::Array(vec![change.0.clone(), change.1.clone()]),
                    )
                })
                .collect(),
        )
    }

    fn push(&mut self, name: &str, change: FieldChange) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = change,
            None => self.0.push((name.to_string(), change)),
        }
    }
}

/// `name: old -> new` pairs joined by `, `
impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, change)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, change)?;
        }
        Ok(())
    }
}

impl Serialize for FieldDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, change) in &self.0 {
            map.serialize_entry(name, change)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldDiffVisitor;

        impl<'de> Visitor<'de> for FieldDiffVisitor {
            type Value = FieldDiff;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field name to [old, new]")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldDiff, A::Error> {
                let mut diff = FieldDiff::default();
                while let Some((name, change)) = access.next_entry::<String, FieldChange>()? {
                    diff.push(&name, change);
                }
                Ok(diff)
            }
        }

        deserializer.deserialize_map(FieldDiffVisitor)
    }
}

/// Paired local/foreign view of one canonical key
///
/// New rows have no foreign payload, Missing rows no local payload;
/// Changed and Unchanged rows carry both.
#[derive(Debug, Clone)]
pub struct DiffRow {
    kind: RowChange,
    canonical_key: String,
    local: Option<Record>,
    foreign: Option<Record>,
    schema: Arc<Schema>,
}

impl DiffRow {
    pub(crate) fn new(
        kind: RowChange,
        canonical_key: String,
        local: Option<Record>,
        foreign: Option<Record>,
        schema: Arc<Schema>,
    ) -> Self {
        Self {
            kind,
            canonical_key,
            local,
            foreign,
            schema,
        }
    }

    pub fn kind(&self) -> RowChange {
        self.kind
    }

    pub fn canonical_key(&self) -> &str {
        &self.canonical_key
    }

    /// Payload from the side the query ran on
    pub fn local(&self) -> Option<&Record> {
        self.local.as_ref()
    }

    /// Payload from the counterpart side
    pub fn foreign(&self) -> Option<&Record> {
        self.foreign.as_ref()
    }

    /// Whichever payload is present, local first
    pub fn payload(&self) -> Option<&Record> {
        self.local.as_ref().or(self.foreign.as_ref())
    }

    /// Field diff over the schema's value fields
    pub fn field_diff(&self) -> FieldDiff {
        let names: Vec<&str> = self.schema.value_fields().collect();
        self.field_diff_for(&names)
    }

    /// Field diff over a caller-chosen set of fields, in the order given
    ///
    /// Declared fields compare by encoded fragment; undeclared names compare
    /// the raw payload values. When one payload is absent every requested
    /// field is listed, with `null` on the absent side.
    pub fn field_diff_for(&self, fields: &[&str]) -> FieldDiff {
        let one_sided = self.local.is_none() || self.foreign.is_none();
        let mut diff = FieldDiff::default();
        for &name in fields {
            let old = lookup(self.foreign.as_ref(), name);
            let new = lookup(self.local.as_ref(), name);
            if one_sided || self.differs(name, &old, &new) {
                diff.push(name, FieldChange(old, new));
            }
        }
        diff
    }

    fn differs(&self, name: &str, old: &Value, new: &Value) -> bool {
        match (
            self.schema.fragment_of(name, old),
            self.schema.fragment_of(name, new),
        ) {
            (Some(a), Some(b)) => a != b,
            _ => old != new,
        }
    }
}

/// One line per row, e.g. `New id: 1 (name: "x", total: "1.00")`
///
/// Key values print in full; string values in the value list and the diff
/// are cut to [`SHORTEN_AT`] characters.
impl fmt::Display for DiffRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = match self.kind {
            RowChange::Missing => self.foreign.as_ref(),
            _ => self.local.as_ref(),
        };
        let key_fields: Vec<&str> = self.schema.key_fields().collect();

        write!(f, "{} ", self.kind.as_str())?;
        write_pairs(f, data, &key_fields, false)?;

        match self.kind {
            RowChange::Unchanged => Ok(()),
            RowChange::Changed => write!(f, " => {}", self.field_diff()),
            RowChange::New | RowChange::Missing => {
                let value_fields: Vec<&str> = self.schema.value_fields().collect();
                f.write_str(" (")?;
                write_pairs(f, data, &value_fields, true)?;
                f.write_str(")")
            }
        }
    }
}

fn write_pairs(
    f: &mut fmt::Formatter<'_>,
    data: Option<&Record>,
    fields: &[&str],
    shorten: bool,
) -> fmt::Result {
    for (i, &name) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        let value = lookup(data, name);
        if shorten {
            write!(f, "{}: {}", name, shortened(&value))?;
        } else {
            write!(f, "{}: {}", name, value)?;
        }
    }
    Ok(())
}

/// JSON text of a value, long strings cut with a trailing `...`
fn shortened(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > SHORTEN_AT => {
            let cut: String = s.chars().take(SHORTEN_AT).collect();
            Value::String(format!("{}...", cut)).to_string()
        }
        other => other.to_string(),
    }
}

fn lookup(payload: Option<&Record>, name: &str) -> Value {
    payload
        .and_then(|p| p.get(name))
        .cloned()
        .unwrap_or(Value::Null)
}
