use callmark_directory::CallerRecord;
use serde::Serialize;

/// What an overlay shows for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayContent {
    pub app_name: String,
    pub caller_name: String,
    /// `None` when the record has no appointment; the surface omits the row.
    pub appointment: Option<String>,
    /// `None` when the record has no city; the surface omits the row.
    pub city: Option<String>,
}

impl OverlayContent {
    pub fn from_record(record: &CallerRecord, app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            caller_name: record.name.clone(),
            appointment: non_empty(&record.appointment),
            city: non_empty(&record.city),
        }
    }

    /// Rows to render, in display order. Omitted fields produce no row.
    pub fn rows(&self) -> Vec<&str> {
        let mut rows = vec![self.caller_name.as_str()];
        rows.extend(self.appointment.as_deref());
        rows.extend(self.city.as_deref());
        rows
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let record = CallerRecord::new("1", "Alice");
        let content = OverlayContent::from_record(&record, "Callmark");

        assert_eq!(content.caller_name, "Alice");
        assert_eq!(content.appointment, None);
        assert_eq!(content.city, None);
        assert_eq!(content.rows(), vec!["Alice"]);
    }

    #[test]
    fn test_all_fields_shown() {
        let record = CallerRecord::new("1", "Alice")
            .with_appointment("Dentist")
            .with_city("Riga");
        let content = OverlayContent::from_record(&record, "Callmark");

        assert_eq!(content.rows(), vec!["Alice", "Dentist", "Riga"]);
        assert_eq!(content.app_name, "Callmark");
    }

    #[test]
    fn test_blank_city_omitted() {
        let record = CallerRecord::new("1", "Alice").with_city("   ");
        let content = OverlayContent::from_record(&record, "Callmark");
        assert_eq!(content.city, None);
    }

    #[test]
    fn test_name_shown_even_when_empty() {
        let record = CallerRecord::new("1", "");
        let content = OverlayContent::from_record(&record, "Callmark");
        assert_eq!(content.rows(), vec![""]);
    }
}
