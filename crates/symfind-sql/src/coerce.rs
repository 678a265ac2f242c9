//! Parameter coercion to declared field types

use sea_query::Value as SeaValue;
use symfind_core::{FieldType, Value};
use tracing::warn;

/// Coerce `value` to `declared`, element-wise for arrays
///
/// Values that cannot be represented in the declared type are kept as they
/// are; the database decides what to make of them.
pub fn coerce(value: Value, declared: Option<&FieldType>) -> Value {
	let Some(declared) = declared else {
		return value;
	};
	match value {
		Value::Array(items) => Value::Array(
			items
				.into_iter()
				.map(|item| coerce(item, Some(declared)))
				.collect(),
		),
		Value::Backed(inner) => coerce(*inner, Some(declared)),
		Value::Null => Value::Null,
		scalar => coerce_scalar(scalar, declared),
	}
}

fn coerce_scalar(value: Value, declared: &FieldType) -> Value {
	let coerced = match (declared, &value) {
		(FieldType::Integer, Value::Int(_))
		| (FieldType::Float, Value::Float(_))
		| (FieldType::Boolean, Value::Bool(_))
		| (FieldType::String, Value::String(_))
		| (FieldType::Custom(_), _) => Some(value.clone()),

		(FieldType::Integer, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
		(FieldType::Integer, Value::String(s)) => s.trim().parse().ok().map(Value::Int),
		(FieldType::Integer, Value::Float(f)) if f.fract() == 0.0 => Some(Value::Int(*f as i64)),

		(FieldType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
		(FieldType::Float, Value::String(s)) => s.trim().parse().ok().map(Value::Float),

		(FieldType::Boolean, Value::Int(i)) => Some(Value::Bool(*i != 0)),
		(FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
			"1" | "true" => Some(Value::Bool(true)),
			"0" | "false" | "" => Some(Value::Bool(false)),
			_ => None,
		},

		(FieldType::String, Value::Int(i)) => Some(Value::String(i.to_string())),
		(FieldType::String, Value::Float(f)) => Some(Value::String(f.to_string())),
		(FieldType::String, Value::Bool(b)) => Some(Value::String(if *b { "1" } else { "0" }.to_string())),

		_ => None,
	};
	coerced.unwrap_or_else(|| {
		warn!(value = %value, declared = %declared, "value kept uncoerced");
		value
	})
}

/// Bindable scalar; arrays are expanded by the caller
pub fn to_sea_value(value: &Value) -> SeaValue {
	match value {
		Value::Null => SeaValue::Int(None),
		Value::Bool(b) => SeaValue::Bool(Some(*b)),
		Value::Int(i) => SeaValue::BigInt(Some(*i)),
		Value::Float(f) => SeaValue::Double(Some(*f)),
		Value::String(s) => SeaValue::String(Some(s.clone())),
		Value::Backed(inner) => to_sea_value(inner),
		Value::Array(_) => {
			warn!(value = %value, "array bound as a scalar, sending its JSON text");
			SeaValue::String(Some(value.to_json().to_string()))
		}
	}
}
