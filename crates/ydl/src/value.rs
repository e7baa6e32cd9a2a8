//! value representation
//!
//! The ydl data model contains the following data types
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - date (calendar date without time zone, written as `YYYY-MM-DD`)
//! - sequence ("list" of values)
//! - mapping (order-preserving "map"/"dictionary", where the key is of type string)
//! - instance (a constructed object, only present after instantiation)
//!
//! Additionally:
//! - there is no `null`/`None` value. Nulls are rejected when converting parsed yaml.
//! - mapping keys that yaml parses as numbers or booleans are stringified.
//! - plain strings that are valid `YYYY-MM-DD` dates become [Value::Date].
use crate::binder::Object;
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Date(chrono::NaiveDate),
    Sequence(Vec<Value>),
    Mapping(IndexMap<String, Value>),
    Instance(Object),
}

impl Value {
    /// Name of the variant, used in log output and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Instance(_) => "instance",
        }
    }

    /// Child by mapping key or by (textual) sequence index
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries.get(key),
            Value::Sequence(items) => key.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Mapping(entries) => entries.get_mut(key),
            Value::Sequence(items) => key
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Every integer is also a decimal
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Object> {
        match self {
            Value::Instance(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow the constructed object if this is an instance of `T`
    pub fn downcast_ref<T: std::any::Any>(&self) -> Option<&T> {
        self.as_instance().and_then(Object::downcast_ref)
    }

    /// Deep merge `overlay` into `self`
    ///
    /// Mappings merge key by key (recursively). In every other case the overlay replaces the
    /// existing value.
    pub fn merge(&mut self, overlay: Value) {
        match (self, overlay) {
            (Value::Mapping(base), Value::Mapping(overlay)) => {
                for (key, value) in overlay {
                    match base.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (base, overlay) => *base = overlay,
        }
    }

    /// Convert the serialized form of a constructed object
    ///
    /// Unlike parsed documents, serialized structs commonly contain `None` fields. Those are
    /// dropped instead of rejected.
    pub(crate) fn from_serialized(value: serde_yaml::Value) -> Result<Self, ValueError> {
        from_yaml(value, "", Nulls::Skip)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Nulls {
    Reject,
    Skip,
}

fn from_yaml(value: serde_yaml::Value, at: &str, nulls: Nulls) -> Result<Value, ValueError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => return Err(ValueError::Null(display_at(at))),
        Yaml::Bool(b) => b.into(),
        Yaml::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::Integer(int)
            } else if let Some(decimal) = number.as_f64() {
                Value::Decimal(decimal)
            } else {
                return Err(ValueError::UnsupportedNumber(display_at(at)));
            }
        }
        Yaml::String(s) => s.into(),
        Yaml::Sequence(items) => {
            let mut sequence = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                if nulls == Nulls::Skip && item.is_null() {
                    continue;
                }
                sequence.push(from_yaml(item, &format!("{at}/{index}"), nulls)?);
            }
            Value::Sequence(sequence)
        }
        Yaml::Mapping(mapping) => {
            let mut entries = IndexMap::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => return Err(ValueError::UnsupportedKey(display_at(at))),
                };
                if nulls == Nulls::Skip && value.is_null() {
                    continue;
                }
                let value = from_yaml(value, &format!("{at}/{key}"), nulls)?;
                entries.insert(key, value);
            }
            Value::Mapping(entries)
        }
        Yaml::Tagged(tagged) => from_yaml(tagged.value, at, nulls)?,
    })
}

fn display_at(at: &str) -> String {
    if at.is_empty() {
        "/".to_string()
    } else {
        at.to_string()
    }
}

/// Strict `YYYY-MM-DD`
fn parse_date(s: &str) -> Option<chrono::NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }

    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValueError {
    #[error("null value at '{0}' is not supported")]
    Null(String),
    #[error("unsupported mapping key at '{0}'")]
    UnsupportedKey(String),
    #[error("number out of range at '{0}'")]
    UnsupportedNumber(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid yaml")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl TryFrom<serde_yaml::Value> for Value {
    type Error = ValueError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        from_yaml(value, "", Nulls::Reject)
    }
}

impl std::str::FromStr for Value {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Value::try_from(yaml)?)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        match parse_date(&value) {
            Some(date) => Value::Date(date),
            None => Value::String(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(value: chrono::NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Instance(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Sequence(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Mapping(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Date(value) => serializer.collect_str(&value.format("%Y-%m-%d")),
            Value::Sequence(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Mapping(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Instance(object) => serde::Serialize::serialize(object.repr(), serializer),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_scalars_by_kind() {
        let value: Value = "{ flag: true, count: 3, ratio: 0.5, name: bob, filed: 2015-11-20 }"
            .parse()
            .expect("valid yaml");

        assert_eq!(value.get("flag").and_then(Value::as_bool), Some(true));
        assert_eq!(value.get("count"), Some(&Value::Integer(3)));
        assert_eq!(value.get("ratio"), Some(&Value::Decimal(0.5)));
        assert_eq!(value.get("name"), Some(&Value::String("bob".into())));
        assert_eq!(
            value.get("filed").and_then(Value::as_date),
            chrono::NaiveDate::from_ymd_opt(2015, 11, 20)
        );
    }

    #[test]
    fn only_exact_dates_become_dates() {
        assert_eq!(Value::from("2015-1-20").kind(), "string");
        assert_eq!(Value::from("2015-02-30").kind(), "string");
        assert_eq!(Value::from("on 2015-11-20").kind(), "string");
        assert_eq!(Value::from("2016-02-29").kind(), "date");
    }

    #[test]
    fn null_is_rejected() {
        match "persons:\n  bob:\n".parse::<Value>() {
            Err(ParseError::Value(err)) => {
                assert_eq!(err, ValueError::Null("/persons/bob".into()))
            }
            other => panic!("expected a value error, got {other:?}"),
        }
    }

    #[test]
    fn numeric_keys_are_stringified() {
        let value: Value = "{ 3: third, true: yes }".parse().expect("valid yaml");
        let keys: Vec<_> = value.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["3".to_string(), "true".to_string()]);
    }

    #[test]
    fn sequence_lookup_by_textual_index() {
        let value: Value = "[a, b, c]".parse().unwrap();
        assert_eq!(value.get("1").and_then(Value::as_str), Some("b"));
        assert_eq!(value.get("3"), None);
    }

    #[test]
    fn merge_is_deep_for_mappings() {
        let mut base: Value = "{ bob: { first: Bob, city: Topeka }, tags: [a, b] }"
            .parse()
            .unwrap();
        let overlay: Value = "{ bob: { city: Wichita }, tags: [c], ann: { first: Ann } }"
            .parse()
            .unwrap();

        base.merge(overlay);

        let expected: Value =
            "{ bob: { first: Bob, city: Wichita }, tags: [c], ann: { first: Ann } }"
                .parse()
                .unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn serialized_nulls_are_skipped() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("{ name: x, phone: null }").unwrap();
        let value = Value::from_serialized(yaml).unwrap();
        assert_eq!(value, Value::from_iter([("name", "x")]));
    }

    #[test]
    fn dates_serialize_as_strings() {
        let value = Value::from_iter([("filed", "2015-11-20")]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"filed":"2015-11-20"}"#
        );
    }
}
