use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    /// The last path segment of the document name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Value {
    #[serde(flatten)]
    pub value_type: ValueType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    StringValue(String),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    BooleanValue(bool),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
    NullValue(()),
    TimestampValue(String),
    GeoPointValue(GeoPoint),
    BytesValue(String), // base64 encoded
    ReferenceValue(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MapValue {
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

impl Value {
    fn of(value_type: ValueType) -> Self {
        Self { value_type }
    }

    /// Converts plain JSON into a typed Firestore value.
    pub fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        let value_type = match value {
            JsonValue::Null => ValueType::NullValue(()),
            JsonValue::Bool(b) => ValueType::BooleanValue(b),
            JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ValueType::IntegerValue(i.to_string()),
                (None, Some(f)) => ValueType::DoubleValue(f),
                _ => {
                    return Err(serde_json::Error::custom(format!(
                        "Unsupported number type: {}",
                        n
                    )))
                }
            },
            JsonValue::String(s) => ValueType::StringValue(s),
            JsonValue::Array(items) => ValueType::ArrayValue(ArrayValue {
                values: items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<Result<_, _>>()?,
            }),
            JsonValue::Object(map) => ValueType::MapValue(MapValue {
                fields: fields_from_json(map)?,
            }),
        };
        Ok(Value::of(value_type))
    }

    /// Converts back to plain JSON. Timestamps, bytes and references become
    /// strings; geo points become `{ latitude, longitude }` objects.
    pub fn into_json(self) -> Result<JsonValue, serde_json::Error> {
        Ok(match self.value_type {
            ValueType::StringValue(s)
            | ValueType::TimestampValue(s)
            | ValueType::BytesValue(s)
            | ValueType::ReferenceValue(s) => JsonValue::String(s),
            ValueType::IntegerValue(s) => {
                let i: i64 = s.parse().map_err(|e| {
                    serde_json::Error::custom(format!(
                        "Failed to parse integer string '{}': {}",
                        s, e
                    ))
                })?;
                JsonValue::Number(i.into())
            }
            ValueType::DoubleValue(d) => JsonValue::Number(Number::from_f64(d).ok_or_else(|| {
                serde_json::Error::custom(format!("Invalid f64 value: {}", d))
            })?),
            ValueType::BooleanValue(b) => JsonValue::Bool(b),
            ValueType::NullValue(()) => JsonValue::Null,
            ValueType::MapValue(map) => fields_into_json(map.fields)?,
            ValueType::ArrayValue(array) => JsonValue::Array(
                array
                    .values
                    .into_iter()
                    .map(Value::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            ValueType::GeoPointValue(point) => serde_json::json!({
                "latitude": point.latitude,
                "longitude": point.longitude,
            }),
        })
    }
}

pub(crate) fn fields_from_json(
    map: Map<String, JsonValue>,
) -> Result<HashMap<String, Value>, serde_json::Error> {
    map.into_iter()
        .map(|(key, value)| Value::from_json(value).map(|value| (key, value)))
        .collect()
}

pub(crate) fn fields_into_json(
    fields: HashMap<String, Value>,
) -> Result<JsonValue, serde_json::Error> {
    let map = fields
        .into_iter()
        .map(|(key, value)| value.into_json().map(|value| (key, value)))
        .collect::<Result<Map<_, _>, _>>()?;
    Ok(JsonValue::Object(map))
}
