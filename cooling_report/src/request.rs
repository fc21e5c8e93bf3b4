use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ReportError;

/// Raw form fields as typed by the operator.
///
/// Readings accept either a comma or a dot as decimal separator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportRequest {
    pub title: String,
    pub objective: String,
    pub product: String,
    /// `dd/mm/yyyy`
    pub date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`; earlier than `start_time` means the run crossed midnight.
    pub end_time: String,
    pub start_temperature: String,
    pub end_temperature: String,
    pub start_humidity: String,
    pub end_humidity: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRequest {
    pub title: String,
    pub objective: String,
    pub product: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub date_text: String,
    pub start_text: String,
    pub end_text: String,
    pub start_temperature: f64,
    pub end_temperature: f64,
    pub start_humidity: f64,
    pub end_humidity: f64,
}

impl ReportRequest {
    pub fn parse(&self) -> Result<ParsedRequest, ReportError> {
        let date_text = self.date.trim();
        let start_text = self.start_time.trim();
        let end_text = self.end_time.trim();

        let date = parse_date("date", date_text)?;
        let start = date.and_time(parse_clock("start time", start_text)?);
        let mut end = date.and_time(parse_clock("end time", end_text)?);
        if end < start {
            end += Duration::days(1);
        }

        Ok(ParsedRequest {
            title: self.title.trim().to_string(),
            objective: self.objective.trim().to_string(),
            product: self.product.trim().to_string(),
            date,
            start,
            end,
            date_text: date_text.to_string(),
            start_text: start_text.to_string(),
            end_text: end_text.to_string(),
            start_temperature: parse_decimal("start temperature", &self.start_temperature)?,
            end_temperature: parse_decimal("end temperature", &self.end_temperature)?,
            start_humidity: parse_decimal("start humidity", &self.start_humidity)?,
            end_humidity: parse_decimal("end humidity", &self.end_humidity)?,
        })
    }
}

/// Parse a reading written with either `,` or `.` as decimal separator.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, ReportError> {
    let normalized = raw.trim().replace(',', ".");
    let invalid = |reason: &str| ReportError::Parse {
        field,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    if normalized.is_empty() {
        return Err(invalid("value is empty"));
    }
    let value: f64 = normalized
        .parse()
        .map_err(|_| invalid("expected a decimal number such as 5,5 or 5.5"))?;
    if !value.is_finite() {
        return Err(invalid("value must be finite"));
    }
    Ok(value)
}

fn parse_date(field: &'static str, text: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(text, "%d/%m/%Y").map_err(|e| ReportError::Parse {
        field,
        value: text.to_string(),
        reason: format!("expected dd/mm/yyyy ({e})"),
    })
}

fn parse_clock(field: &'static str, text: &str) -> Result<NaiveTime, ReportError> {
    NaiveTime::parse_from_str(text, "%H:%M").map_err(|e| ReportError::Parse {
        field,
        value: text.to_string(),
        reason: format!("expected HH:MM ({e})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ReportRequest {
        ReportRequest {
            title: " Câmara 0 ºC ".into(),
            objective: "Binômio 4 ºC em 4 horas".into(),
            product: "Sassami".into(),
            date: "15/03/2024".into(),
            start_time: "16:03".into(),
            end_time: "16:53".into(),
            start_temperature: "5.5".into(),
            end_temperature: "3,2".into(),
            start_humidity: " 73,8 ".into(),
            end_humidity: "89.5".into(),
        }
    }

    #[test]
    fn accepts_comma_and_dot_decimals() {
        let parsed = base().parse().unwrap();
        assert_eq!(parsed.start_temperature, 5.5);
        assert_eq!(parsed.end_temperature, 3.2);
        assert_eq!(parsed.start_humidity, 73.8);
        assert_eq!(parsed.end_humidity, 89.5);
        assert_eq!(parsed.title, "Câmara 0 ºC");
    }

    #[test]
    fn combines_date_and_clock() {
        let parsed = base().parse().unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(parsed.start.format("%d/%m/%Y %H:%M").to_string(), "15/03/2024 16:03");
        assert_eq!(parsed.end.format("%d/%m/%Y %H:%M").to_string(), "15/03/2024 16:53");
    }

    #[test]
    fn end_before_start_rolls_to_next_day() {
        let mut request = base();
        request.start_time = "23:50".into();
        request.end_time = "00:10".into();
        let parsed = request.parse().unwrap();
        assert_eq!(parsed.end - parsed.start, Duration::minutes(20));
        assert_eq!(parsed.end.format("%d/%m").to_string(), "16/03");
    }

    #[test]
    fn malformed_fields_name_the_field() {
        let mut request = base();
        request.date = "2024-03-15".into();
        match request.parse() {
            Err(ReportError::Parse { field, value, .. }) => {
                assert_eq!(field, "date");
                assert_eq!(value, "2024-03-15");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut request = base();
        request.end_time = "25:00".into();
        assert!(matches!(
            request.parse(),
            Err(ReportError::Parse { field: "end time", .. })
        ));
    }

    #[test]
    fn rejects_empty_and_non_finite_readings() {
        assert!(parse_decimal("start temperature", "  ").is_err());
        assert!(parse_decimal("start temperature", "inf").is_err());
        assert!(parse_decimal("start temperature", "NaN").is_err());
        assert!(parse_decimal("start temperature", "1.234,5").is_err());
        assert_eq!(parse_decimal("start temperature", "-1,5").unwrap(), -1.5);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "title": "T", "objective": "O", "product": "P",
            "date": "01/01/2024", "start_time": "10:00", "end_time": "10:10",
            "start_temperature": "10", "end_temperature": "1",
            "start_humidity": "50", "end_humidity": "60"
        }"#;
        let request: ReportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.end_time, "10:10");
        assert!(request.parse().is_ok());
    }
}
