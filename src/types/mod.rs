use crate::error::ValidationError;
use derive_more::Display;
use ordered_float::OrderedFloat;
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    ser, Deserialize, Deserializer, Serialize, Serializer,
};
use std::{collections::BTreeMap, fmt};
use uuid::Uuid;

pub use event::DeviceEvent;
pub use report::EventReport;
pub use time::{event_time_now, format_event_time, parse_event_time};

pub mod event;
pub mod report;
pub mod time;

/// Event-specific parameters, keyed by name.
///
/// Keys are kept ordered so the encoded form is deterministic.
pub type Paras = BTreeMap<String, ParaValue>;

/// Correlation identifier of a device event, never empty.
#[derive(
    Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            Err(ValidationError::EmptyField("event_id"))
        } else {
            Ok(Self(id))
        }
    }

    /// A fresh random identifier (UUID v4, simple form).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventId {
    type Error = ValidationError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl TryFrom<&str> for EventId {
    type Error = ValidationError;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl AsRef<str> for EventId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A single parameter value.
///
/// Encoded as the natural JSON value: `Integer` as a JSON number without a
/// fraction, `Float` as a JSON number with one.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParaValue {
    Null,
    Bool(bool),
    /// Must fit in `i64` or `u64` to be serializable.
    Integer(i128),
    /// Must be finite to be serializable.
    Float(OrderedFloat<f64>),
    String(String),
    Sequence(Vec<ParaValue>),
    Mapping(Paras),
}

impl ParaValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParaValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParaValue::Integer(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParaValue::Float(v) => Some(v.0),
            ParaValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParaValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Checks that this value (at `depth`, found at `path`) can be encoded.
    fn check(&self, path: &str, depth: usize, max_depth: usize) -> Result<(), ValidationError> {
        if depth > max_depth {
            return Err(ValidationError::ParasTooDeep {
                path: path.to_owned(),
                max_depth,
            });
        }

        match self {
            ParaValue::Float(v) if !v.0.is_finite() => {
                Err(ValidationError::NonSerializableParam {
                    path: path.to_owned(),
                    reason: "non-finite float",
                })
            }
            ParaValue::Integer(v) if wire_integer(*v).is_none() => {
                Err(ValidationError::NonSerializableParam {
                    path: path.to_owned(),
                    reason: "integer outside the 64-bit range",
                })
            }
            ParaValue::Sequence(items) => {
                items.iter().enumerate().try_for_each(|(i, item)| {
                    item.check(&format!("{path}[{i}]"), depth + 1, max_depth)
                })
            }
            ParaValue::Mapping(members) => check_paras(members, path, depth + 1, max_depth),
            _ => Ok(()),
        }
    }
}

/// Checks every value of `paras`, whose members sit at `depth`.
pub(crate) fn check_paras(
    paras: &Paras,
    path: &str,
    depth: usize,
    max_depth: usize,
) -> Result<(), ValidationError> {
    paras
        .iter()
        .try_for_each(|(name, value)| value.check(&format!("{path}.{name}"), depth, max_depth))
}

enum WireInteger {
    Signed(i64),
    Unsigned(u64),
}

fn wire_integer(v: i128) -> Option<WireInteger> {
    if let Ok(i) = i64::try_from(v) {
        Some(WireInteger::Signed(i))
    } else {
        u64::try_from(v).ok().map(WireInteger::Unsigned)
    }
}

impl Serialize for ParaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParaValue::Null => serializer.serialize_unit(),
            ParaValue::Bool(v) => serializer.serialize_bool(*v),
            ParaValue::Integer(v) => match wire_integer(*v) {
                Some(WireInteger::Signed(i)) => serializer.serialize_i64(i),
                Some(WireInteger::Unsigned(u)) => serializer.serialize_u64(u),
                None => Err(ser::Error::custom(format!(
                    "integer {v} is outside the 64-bit range"
                ))),
            },
            ParaValue::Float(v) if !v.0.is_finite() => Err(ser::Error::custom(format!(
                "float {v} is not finite"
            ))),
            ParaValue::Float(v) => serializer.serialize_f64(v.0),
            ParaValue::String(v) => serializer.serialize_str(v),
            ParaValue::Sequence(v) => v.serialize(serializer),
            ParaValue::Mapping(v) => v.serialize(serializer),
        }
    }
}

struct ParaValueVisitor;

impl<'de> Visitor<'de> for ParaValueVisitor {
    type Value = ParaValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON-compatible value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ParaValue, E> {
        Ok(ParaValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ParaValue, E> {
        Ok(ParaValue::Integer(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ParaValue, E> {
        Ok(ParaValue::Integer(v.into()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<ParaValue, E> {
        Ok(ParaValue::Integer(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<ParaValue, E> {
        i128::try_from(v)
            .map(ParaValue::Integer)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ParaValue, E> {
        Ok(ParaValue::Float(OrderedFloat(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ParaValue, E> {
        Ok(ParaValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ParaValue, E> {
        Ok(ParaValue::String(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<ParaValue, E> {
        Ok(ParaValue::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<ParaValue, E> {
        Ok(ParaValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ParaValue, D::Error> {
        ParaValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ParaValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ParaValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ParaValue, A::Error> {
        let mut members = Paras::new();
        while let Some((name, value)) = map.next_entry::<String, ParaValue>()? {
            members.insert(name, value);
        }
        Ok(ParaValue::Mapping(members))
    }
}

impl<'de> Deserialize<'de> for ParaValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ParaValueVisitor)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParaValue {
                fn from(v: $t) -> Self {
                    ParaValue::Integer(v.into())
                }
            }
        )*
    };
}

impl_from_integer!(u8, u16, u32, u64, i8, i16, i32, i64);

impl From<bool> for ParaValue {
    fn from(v: bool) -> Self {
        ParaValue::Bool(v)
    }
}

impl From<f32> for ParaValue {
    fn from(v: f32) -> Self {
        ParaValue::Float(OrderedFloat(v.into()))
    }
}

impl From<f64> for ParaValue {
    fn from(v: f64) -> Self {
        ParaValue::Float(OrderedFloat(v))
    }
}

impl From<String> for ParaValue {
    fn from(v: String) -> Self {
        ParaValue::String(v)
    }
}

impl From<&str> for ParaValue {
    fn from(v: &str) -> Self {
        ParaValue::String(v.to_owned())
    }
}

impl From<Vec<ParaValue>> for ParaValue {
    fn from(v: Vec<ParaValue>) -> Self {
        ParaValue::Sequence(v)
    }
}

impl From<Paras> for ParaValue {
    fn from(v: Paras) -> Self {
        ParaValue::Mapping(v)
    }
}

impl<T: Into<ParaValue>> From<Option<T>> for ParaValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParaValue::Null)
    }
}

impl From<serde_json::Value> for ParaValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => ParaValue::Null,
            Value::Bool(b) => ParaValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParaValue::Integer(i.into())
                } else if let Some(u) = n.as_u64() {
                    ParaValue::Integer(u.into())
                } else {
                    ParaValue::Float(OrderedFloat(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => ParaValue::String(s),
            Value::Array(items) => {
                ParaValue::Sequence(items.into_iter().map(ParaValue::from).collect())
            }
            Value::Object(members) => ParaValue::Mapping(
                members
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}
