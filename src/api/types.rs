//! Response types of the Prometheus-compatible query API.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ApiError;

/// Label name to value. Sorted, so rendering is stable.
pub type LabelSet = BTreeMap<String, String>;

/// Response envelope shared by every JSON endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, rename = "errorType")]
    pub error_type: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Unwrap the payload, turning `status: error` into [`ApiError::Api`].
    pub fn into_result(self) -> Result<T, ApiError> {
        for warning in &self.warnings {
            tracing::warn!("Server warning: {}", warning);
        }
        if !self.is_success() {
            return Err(ApiError::Api { error_type: self.error_type, message: self.error });
        }
        self.data.ok_or_else(|| ApiError::Api {
            error_type: "decode".to_string(),
            message: "response has no data".to_string(),
        })
    }
}

/// `[<unix seconds>, "<value>"]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleValue {
    pub timestamp: f64,
    pub value: f64,
}

impl SampleValue {
    pub fn time(&self) -> DateTime<Utc> {
        unix_to_time(self.timestamp)
    }
}

impl Serialize for SampleValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.timestamp, format_value(self.value)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SampleValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (timestamp, raw) = <(f64, String)>::deserialize(deserializer)?;
        let value = raw
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid sample value '{raw}'")))?;
        Ok(Self { timestamp, value })
    }
}

/// `[<unix seconds>, "<string>"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringValue(pub f64, pub String);

impl StringValue {
    pub fn time(&self) -> DateTime<Utc> {
        unix_to_time(self.0)
    }

    pub fn value(&self) -> &str {
        &self.1
    }
}

/// One series of an instant (`value`) or range (`values`) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SampleValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<SampleValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryResult {
    Vector(Vec<Sample>),
    Matrix(Vec<Sample>),
    Scalar(SampleValue),
    String(StringValue),
}

impl QueryResult {
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryResult::Vector(_) => "vector",
            QueryResult::Matrix(_) => "matrix",
            QueryResult::Scalar(_) => "scalar",
            QueryResult::String(_) => "string",
        }
    }
}

fn unix_to_time(seconds: f64) -> DateTime<Utc> {
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

/// Render a sample value the way the API spells it.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Render a label set as `name{a="1", b="2"}`.
pub fn format_metric(labels: &LabelSet) -> String {
    if labels.is_empty() {
        return "{}".to_string();
    }
    let name = labels.get("__name__").map(String::as_str).unwrap_or_default();
    let pairs: Vec<String> = labels
        .iter()
        .filter(|(key, _)| key.as_str() != "__name__")
        .map(|(key, value)| format!("{key}={value:?}"))
        .collect();
    if pairs.is_empty() {
        return name.to_string();
    }
    format!("{}{{{}}}", name, pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_vector() {
        let body = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    { "metric": { "__name__": "up", "job": "vm" }, "value": [1704067200.5, "1"] }
                ]
            }
        });
        let resp: ApiResponse<QueryResult> = serde_json::from_value(body).unwrap();
        let QueryResult::Vector(samples) = resp.into_result().unwrap() else {
            panic!("expected vector");
        };
        assert_eq!(samples.len(), 1);
        let value = samples[0].value.unwrap();
        assert_eq!(value.value, 1.0);
        assert_eq!(value.time().timestamp_millis(), 1_704_067_200_500);
    }

    #[test]
    fn test_decode_matrix_scalar_and_string() {
        let matrix: QueryResult = serde_json::from_value(json!({
            "resultType": "matrix",
            "result": [{ "metric": {}, "values": [[1, "0.5"], [2, "NaN"]] }]
        }))
        .unwrap();
        let QueryResult::Matrix(series) = &matrix else { panic!("expected matrix") };
        assert_eq!(series[0].values.len(), 2);
        assert!(series[0].values[1].value.is_nan());

        let scalar: QueryResult =
            serde_json::from_value(json!({ "resultType": "scalar", "result": [1, "+Inf"] })).unwrap();
        assert_eq!(scalar, QueryResult::Scalar(SampleValue { timestamp: 1.0, value: f64::INFINITY }));

        let string: QueryResult =
            serde_json::from_value(json!({ "resultType": "string", "result": [1, "hello"] })).unwrap();
        assert_eq!(string.result_type(), "string");
    }

    #[test]
    fn test_error_envelope() {
        let body = json!({ "status": "error", "errorType": "bad_data", "error": "parse error" });
        let resp: ApiResponse<QueryResult> = serde_json::from_value(body).unwrap();
        match resp.into_result() {
            Err(ApiError::Api { error_type, message }) => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(message, "parse error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sample_value_serializes_like_api() {
        let value = SampleValue { timestamp: 1.5, value: 2.0 };
        assert_eq!(serde_json::to_value(value).unwrap(), json!([1.5, "2"]));
    }

    #[test]
    fn test_format_metric() {
        let mut labels = LabelSet::new();
        assert_eq!(format_metric(&labels), "{}");
        labels.insert("__name__".into(), "up".into());
        assert_eq!(format_metric(&labels), "up");
        labels.insert("job".into(), "vm".into());
        labels.insert("instance".into(), "host:8428".into());
        assert_eq!(format_metric(&labels), r#"up{instance="host:8428", job="vm"}"#);
    }
}
