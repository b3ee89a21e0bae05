use serde::{Deserialize, Serialize};

/// A caller directory entry, keyed by phone number.
///
/// Field names serialize in camelCase to match what the application layer
/// sends through the write API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerRecord {
    /// Canonical digit string; primary key.
    pub phone_number: String,
    pub country_code: String,
    pub name: String,
    #[serde(default)]
    pub appointment: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub ios_row: String,
}

impl CallerRecord {
    pub fn new(phone_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            country_code: String::new(),
            name: name.into(),
            appointment: String::new(),
            city: String::new(),
            ios_row: String::new(),
        }
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn with_appointment(mut self, appointment: impl Into<String>) -> Self {
        self.appointment = appointment.into();
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_ios_row(mut self, ios_row: impl Into<String>) -> Self {
        self.ios_row = ios_row.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let record = CallerRecord::new("15551234567", "Alice")
            .with_country_code("US")
            .with_ios_row("Alice, Dentist");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phoneNumber"], "15551234567");
        assert_eq!(json["countryCode"], "US");
        assert_eq!(json["iosRow"], "Alice, Dentist");
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{"phoneNumber": "123", "countryCode": "LV", "name": "Bob"}"#;
        let record: CallerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Bob");
        assert!(record.appointment.is_empty());
        assert!(record.city.is_empty());
    }
}
