use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub const FEATURE_COUNT: usize = 6;

/// Column order the trained model expects.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "vendor_id",
    "pickup_location_id_int",
    "dropoff_location_id_int",
    "weekday",
    "time_of_day",
    "passenger_count",
];

/// A submission as it arrives, before any checks. `null` and a missing
/// key both deserialize to `None`. Only a JSON object is accepted; an
/// array is never read by position.
#[derive(Debug, Clone, Default)]
pub struct RawFareRequest {
    pub vendor_id: Option<Value>,
    pub pickup_location_id: Option<Value>,
    pub dropoff_location_id: Option<Value>,
    pub weekday: Option<Value>,
    pub time_of_day: Option<Value>,
    pub passenger_count: Option<Value>,
}

impl<'de> Deserialize<'de> for RawFareRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        let mut take = |name: &str, alias: Option<&str>| {
            let value = body.remove(name).filter(|v| !v.is_null());
            let legacy = alias.and_then(|a| body.remove(a));
            value.or(legacy).filter(|v| !v.is_null())
        };
        Ok(Self {
            vendor_id: take("vendor_id", None),
            pickup_location_id: take("pickup_location_id", Some("pickup_id")),
            dropoff_location_id: take("dropoff_location_id", Some("dropoff_id")),
            weekday: take("weekday", None),
            time_of_day: take("time_of_day", None),
            passenger_count: take("passenger_count", None),
        })
    }
}

impl RawFareRequest {
    pub fn get(&self, field: &str) -> Option<&Value> {
        match field {
            "vendor_id" => self.vendor_id.as_ref(),
            "pickup_location_id" => self.pickup_location_id.as_ref(),
            "dropoff_location_id" => self.dropoff_location_id.as_ref(),
            "weekday" => self.weekday.as_ref(),
            "time_of_day" => self.time_of_day.as_ref(),
            "passenger_count" => self.passenger_count.as_ref(),
            _ => None,
        }
    }
}

/// A fare request that passed every rule. Only [`crate::validation::validate`]
/// builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct FareRequest {
    pub vendor_id: u8,
    pub pickup_location_id: u16,
    pub dropoff_location_id: u16,
    /// 0 = Monday
    pub weekday: u8,
    /// Hour of day, fractional.
    pub time_of_day: f64,
    pub passenger_count: u32,
}

impl FareRequest {
    // `values` follow FARE_RULES order and are already in domain.
    pub(crate) fn from_checked(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            vendor_id: values[0] as u8,
            pickup_location_id: values[1] as u16,
            dropoff_location_id: values[2] as u16,
            weekday: values[3] as u8,
            time_of_day: values[4],
            passenger_count: values[5] as u32,
        }
    }

    pub fn feature_row(&self) -> FeatureRow {
        FeatureRow([
            f32::from(self.vendor_id),
            f32::from(self.pickup_location_id),
            f32::from(self.dropoff_location_id),
            f32::from(self.weekday),
            self.time_of_day as f32,
            self.passenger_count as f32,
        ])
    }
}

/// One model input, ordered as [`FEATURE_COLUMNS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow(pub [f32; FEATURE_COUNT]);

impl FeatureRow {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_COLUMNS.iter().copied().zip(self.0.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate, FARE_RULES};
    use serde_json::json;

    #[test]
    fn rule_order_matches_model_columns() {
        for (rule, column) in FARE_RULES.iter().zip(FEATURE_COLUMNS) {
            assert!(column.starts_with(rule.field), "{} vs {}", rule.field, column);
        }
    }

    #[test]
    fn feature_row_uses_declared_column_order() {
        let raw: RawFareRequest = serde_json::from_value(json!({
            "vendor_id": 1,
            "pickup_location_id": 10,
            "dropoff_location_id": 50,
            "weekday": 2,
            "time_of_day": 1.5,
            "passenger_count": 1
        }))
        .unwrap();
        let row = validate(&raw).unwrap().feature_row();
        assert_eq!(row, FeatureRow([1.0, 10.0, 50.0, 2.0, 1.5, 1.0]));
        let names: Vec<_> = row.named().map(|(n, _)| n).collect();
        assert_eq!(names, FEATURE_COLUMNS);
    }

    #[test]
    fn legacy_form_names_are_accepted() {
        let raw: RawFareRequest =
            serde_json::from_value(json!({ "pickup_id": 4, "dropoff_id": 5 })).unwrap();
        assert_eq!(raw.get("pickup_location_id"), Some(&json!(4)));
        assert_eq!(raw.get("dropoff_location_id"), Some(&json!(5)));
    }

    #[test]
    fn only_objects_are_accepted() {
        assert!(serde_json::from_str::<RawFareRequest>("[1,10,50,2,1.5,1]").is_err());
        assert!(serde_json::from_str::<RawFareRequest>("42").is_err());
        assert!(serde_json::from_value::<RawFareRequest>(json!(null)).is_err());
        let raw: RawFareRequest = serde_json::from_str(r#"{"tip": 3}"#).unwrap();
        assert!(raw.get("vendor_id").is_none());
    }

    #[test]
    fn null_reads_as_missing() {
        let raw: RawFareRequest = serde_json::from_value(json!({ "weekday": null })).unwrap();
        assert!(raw.get("weekday").is_none());
    }
}
