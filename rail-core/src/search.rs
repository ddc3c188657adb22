use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Raw query string of a route search. Every field is required.
#[derive(Debug, Default, Deserialize)]
pub struct TrainSearchRequest {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainSearch {
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
}

impl TrainSearchRequest {
    pub fn validate(self) -> CoreResult<TrainSearch> {
        let required = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(source), Some(destination), Some(date)) =
            (required(self.source), required(self.destination), required(self.date))
        else {
            return Err(CoreError::validation("Please provide source, destination and date"));
        };

        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| CoreError::validation(format!("Invalid date '{date}', expected YYYY-MM-DD")))?;

        Ok(TrainSearch { source, destination, date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_deserialization() {
        let json = r#"{ "source": "New Delhi", "destination": "Jaipur", "date": "2024-12-25" }"#;
        let req: TrainSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        let search = req.validate().unwrap();
        assert_eq!(search.source, "New Delhi");
        assert_eq!(search.date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn test_missing_field_rejected() {
        let req = TrainSearchRequest {
            source: Some("New Delhi".into()),
            destination: Some("  ".into()),
            date: Some("2024-12-25".into()),
        };
        assert!(matches!(req.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn test_bad_date_rejected() {
        let req = TrainSearchRequest {
            source: Some("A".into()),
            destination: Some("B".into()),
            date: Some("25/12/2024".into()),
        };
        assert!(matches!(req.validate(), Err(CoreError::ValidationError(_))));
    }
}
