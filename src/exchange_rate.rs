use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One `<item>` of the upstream feed after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub fullname: String,
    pub code: String,
    pub value: Decimal,
}

/// A stored rate. At most one exists per (date, code).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PersistedRate {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub value: Decimal,
    pub date: NaiveDate,
}

impl PersistedRate {
    pub fn from_record(record: &RateRecord, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: record.fullname.clone(),
            code: record.code.clone(),
            value: record.value,
            date,
        }
    }
}

/// Wire shape of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub name: String,
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

impl From<PersistedRate> for RateRow {
    fn from(rate: PersistedRate) -> Self {
        Self {
            name: rate.name,
            code: rate.code,
            value: rate.value,
        }
    }
}

/// Parses a `YYYY-MM-DD` calendar date. Surrounding whitespace is not accepted.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.chars().any(char::is_whitespace) {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_calendar_dates() {
        assert_eq!(
            parse_date("2022-04-28"),
            NaiveDate::from_ymd_opt(2022, 4, 28)
        );
        assert_eq!(parse_date("2022-02-31"), None);
        assert_eq!(parse_date("28.04.2022"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date(" 2022-04-28"), None);
        assert_eq!(parse_date("2022-04-28 "), None);
    }

    #[test]
    fn row_serializes_value_as_number() {
        let row = RateRow {
            name: "Australian dollar".to_string(),
            code: "AUD".to_string(),
            value: Decimal::from_str("1.3241").unwrap(),
        };
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"name": "Australian dollar", "code": "AUD", "value": 1.3241})
        );
    }
}
