//! Boxed values: the codec-agnostic configuration carrier.
//!
//! Every value ferried by an action configuration or a scenario's options is
//! first reduced to a [`BoxedValue`], a tagged union that is structurally
//! comparable (the pipeline compatibility check depends on this) and
//! JSON-representable (scenario import/export depends on this).
//!
//! User types move in and out of the box through [`Boxable`]. Integer widths
//! narrower than 64 bits validate range on unbox and report failure as a
//! miss rather than truncating. Timestamps round-trip through ISO-8601
//! strings, URLs through their absolute-string form, and serde-serializable
//! structures without a native arm through canonical JSON (sorted keys)
//! embedded as bytes.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

/// A tagged union used as the universal configuration/data carrier.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxedValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer. Narrower widths box into this arm.
    Int(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes. Serializes to JSON as base64.
    Bytes(Vec<u8>),
    /// Ordered list.
    Array(Vec<BoxedValue>),
    /// String-keyed mapping. `BTreeMap` keeps JSON key order stable.
    Dict(BTreeMap<String, BoxedValue>),
}

impl BoxedValue {
    /// Converts the box to its smallest equivalent JSON value.
    ///
    /// `Bytes` becomes a base64 string, `Float` widens to a JSON number.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BoxedValue::Null => serde_json::Value::Null,
            BoxedValue::Bool(b) => serde_json::Value::Bool(*b),
            BoxedValue::Int(i) => serde_json::Value::from(*i),
            BoxedValue::Float(f) => serde_json::Value::from(f64::from(*f)),
            BoxedValue::Double(d) => serde_json::Value::from(*d),
            BoxedValue::String(s) => serde_json::Value::String(s.clone()),
            BoxedValue::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            BoxedValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(BoxedValue::to_json).collect())
            }
            BoxedValue::Dict(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts a JSON value into a box.
    ///
    /// Integral numbers become `Int`, fractional numbers become `Double`.
    /// Strings stay strings; a consumer expecting bytes base64-decodes on
    /// unbox (see the `Vec<u8>` [`Boxable`] impl).
    pub fn from_json(value: serde_json::Value) -> BoxedValue {
        match value {
            serde_json::Value::Null => BoxedValue::Null,
            serde_json::Value::Bool(b) => BoxedValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BoxedValue::Int(i)
                } else {
                    BoxedValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => BoxedValue::String(s),
            serde_json::Value::Array(items) => {
                BoxedValue::Array(items.into_iter().map(BoxedValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => BoxedValue::Dict(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, BoxedValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Boxes any serde-serializable value as canonical JSON bytes.
    ///
    /// Keys are sorted (serde_json's object map is a `BTreeMap`), so the
    /// embedded bytes are stable and configuration equality behaves
    /// predictably.
    pub fn from_serde<T: Serialize>(value: &T) -> Result<BoxedValue, serde_json::Error> {
        let canonical = serde_json::to_value(value)?;
        Ok(BoxedValue::Bytes(serde_json::to_vec(&canonical)?))
    }

    /// Unboxes canonical JSON bytes back into a serde-deserializable value.
    pub fn to_serde<T: DeserializeOwned>(&self) -> Option<T> {
        let bytes = Vec::<u8>::from_boxed(Some(self))?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Returns the dict entries if this is a `Dict`.
    pub fn as_dict(&self) -> Option<&BTreeMap<String, BoxedValue>> {
        match self {
            BoxedValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the array items if this is an `Array`.
    pub fn as_array(&self) -> Option<&[BoxedValue]> {
        match self {
            BoxedValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Serialize for BoxedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoxedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(BoxedValue::from_json)
    }
}

/// Conversion in and out of [`BoxedValue`].
///
/// `from_boxed` receives `None` when the configuration key is absent, so
/// implementations decide how absence unboxes (`Option<T>` maps it to
/// `Some(None)`, everything else to a miss).
pub trait Boxable: Sized {
    /// Attempts to unbox. `None` signals a miss, never a truncation.
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self>;

    /// Boxes the value.
    fn to_boxed(&self) -> BoxedValue;
}

impl Boxable for bool {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Bool(b) => Some(*b),
            // Integer coercion: nonzero is true.
            BoxedValue::Int(i) => Some(*i != 0),
            // String coercion: case-insensitive "true"/"1" and "false"/"0".
            BoxedValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Bool(*self)
    }
}

impl Boxable for String {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::String(self.clone())
    }
}

impl Boxable for i64 {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Int(*self)
    }
}

macro_rules! impl_boxable_narrow_int {
    ($($ty:ty),* $(,)?) => {
        $(impl Boxable for $ty {
            fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
                match value? {
                    // Out-of-range is a miss, not a truncation.
                    BoxedValue::Int(i) => <$ty>::try_from(*i).ok(),
                    _ => None,
                }
            }

            fn to_boxed(&self) -> BoxedValue {
                BoxedValue::Int(i64::from(*self))
            }
        })*
    };
}

impl_boxable_narrow_int!(i8, i16, i32, u8, u16, u32);

impl Boxable for u64 {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Int(i) => u64::try_from(*i).ok(),
            // Values above i64::MAX box as decimal strings.
            BoxedValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        match i64::try_from(*self) {
            Ok(i) => BoxedValue::Int(i),
            Err(_) => BoxedValue::String(self.to_string()),
        }
    }
}

impl Boxable for f64 {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Double(d) => Some(*d),
            BoxedValue::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Double(*self)
    }
}

impl Boxable for f32 {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Float(f) => Some(*f),
            // Accept doubles that survive the narrowing exactly (a JSON
            // round trip widens Float to Double).
            BoxedValue::Double(d) => {
                let narrowed = *d as f32;
                (f64::from(narrowed) == *d).then_some(narrowed)
            }
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Float(*self)
    }
}

impl Boxable for Vec<u8> {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::Bytes(b) => Some(b.clone()),
            // A JSON round trip turns bytes into a base64 string.
            BoxedValue::String(s) => BASE64.decode(s).ok(),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Bytes(self.clone())
    }
}

impl Boxable for Url {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::String(s) => Url::parse(s).ok(),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::String(self.as_str().to_string())
    }
}

impl Boxable for DateTime<Utc> {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value? {
            BoxedValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl<T: Boxable> Boxable for Option<T> {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        match value {
            None | Some(BoxedValue::Null) => Some(None),
            Some(inner) => T::from_boxed(Some(inner)).map(Some),
        }
    }

    fn to_boxed(&self) -> BoxedValue {
        match self {
            Some(inner) => inner.to_boxed(),
            None => BoxedValue::Null,
        }
    }
}

impl<T: Boxable> Boxable for Vec<T> {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        value?
            .as_array()?
            .iter()
            .map(|item| T::from_boxed(Some(item)))
            .collect()
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Array(self.iter().map(Boxable::to_boxed).collect())
    }
}

impl<T: Boxable> Boxable for BTreeMap<String, T> {
    fn from_boxed(value: Option<&BoxedValue>) -> Option<Self> {
        value?
            .as_dict()?
            .iter()
            .map(|(k, v)| T::from_boxed(Some(v)).map(|t| (k.clone(), t)))
            .collect()
    }

    fn to_boxed(&self) -> BoxedValue {
        BoxedValue::Dict(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_boxed()))
                .collect(),
        )
    }
}
