use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an epoch timestamp that may arrive as a number, a numeric
/// string, or null. Anything unparsable becomes `None`.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Example {
///     #[serde(default, deserialize_with = "crate::serde_utils::lenient_epoch")]
///     date_created: Option<i64>,
/// }
/// ```
pub fn lenient_epoch<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(epoch_from_value))
}

/// Treat an explicit `null` like a missing key and fall back to the
/// type's default. `#[serde(default)]` alone only covers the missing key.
pub fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn epoch_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
