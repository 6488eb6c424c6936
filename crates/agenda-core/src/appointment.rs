use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Waiting,
    InProgress,
    Completed,
    NoShow,
    Cancelled,
    Rejected,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Waiting,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::NoShow,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rejected,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Waiting => "waiting",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|status| status.as_key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Waiting => "Waiting",
            AppointmentStatus::InProgress => "In progress",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::NoShow => "No-show",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Rejected => "Rejected",
        }
    }

    /// Badge colour for the status chip.
    pub fn color(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "#EAB308",
            AppointmentStatus::Confirmed => "#3B82F6",
            AppointmentStatus::Waiting => "#F97316",
            AppointmentStatus::InProgress => "#6366F1",
            AppointmentStatus::Completed => "#22C55E",
            AppointmentStatus::NoShow => "#6B7280",
            AppointmentStatus::Cancelled => "#EF4444",
            AppointmentStatus::Rejected => "#B91C1C",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    InPerson,
    Telemedicine,
    Urgent,
    FollowUp,
    FirstVisit,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 5] = [
        AppointmentType::InPerson,
        AppointmentType::Telemedicine,
        AppointmentType::Urgent,
        AppointmentType::FollowUp,
        AppointmentType::FirstVisit,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            AppointmentType::InPerson => "in_person",
            AppointmentType::Telemedicine => "telemedicine",
            AppointmentType::Urgent => "urgent",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::FirstVisit => "first_visit",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.as_key() == key)
    }

    pub fn color(self) -> &'static str {
        match self {
            AppointmentType::InPerson => "#3B82F6",
            AppointmentType::Telemedicine => "#10B981",
            AppointmentType::Urgent => "#EF4444",
            AppointmentType::FollowUp => "#8B5CF6",
            AppointmentType::FirstVisit => "#F59E0B",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRef {
    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,

    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub duration_minutes: Option<u32>,

    pub status: AppointmentStatus,

    #[serde(rename = "type")]
    pub kind: AppointmentType,

    #[serde(default)]
    pub patient: PatientRef,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,
}

impl Appointment {
    pub fn new(
        id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        status: AppointmentStatus,
        kind: AppointmentType,
    ) -> Self {
        Self {
            id,
            start_at: Some(start_at),
            end_at: Some(end_at),
            duration_minutes: None,
            status,
            kind,
            patient: PatientRef::default(),
            color: None,
            reason: None,
        }
    }

    /// `None` for records missing a timestamp or with `start_at >= end_at`.
    pub fn interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_at, self.end_at) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .map(str::trim)
            .filter(|color| !color.is_empty())
            .unwrap_or_else(|| self.kind.color())
    }

    pub fn display_duration(&self) -> Option<i64> {
        if let Some(stored) = self.duration_minutes {
            return Some(i64::from(stored));
        }
        self.interval()
            .map(|(start, end)| (end - start).num_minutes())
    }

    pub fn patient_name(&self) -> &str {
        let name = self.patient.name.trim();
        if name.is_empty() { "(unnamed patient)" } else { name }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Appointment, AppointmentStatus, AppointmentType};

    fn sample() -> Appointment {
        let start = Utc
            .with_ymd_and_hms(2024, 3, 14, 13, 0, 0)
            .single()
            .expect("valid start");
        Appointment::new(
            Uuid::from_u128(1),
            start,
            start + Duration::minutes(30),
            AppointmentStatus::Confirmed,
            AppointmentType::Telemedicine,
        )
    }

    #[test]
    fn color_falls_back_to_type_mapping() {
        let mut apt = sample();
        assert_eq!(apt.display_color(), "#10B981");

        apt.color = Some("   ".to_string());
        assert_eq!(apt.display_color(), "#10B981");

        apt.color = Some("#123456".to_string());
        assert_eq!(apt.display_color(), "#123456");
    }

    #[test]
    fn interval_rejects_inverted_or_missing_bounds() {
        let mut apt = sample();
        assert!(apt.interval().is_some());

        apt.end_at = apt.start_at;
        assert!(apt.interval().is_none());

        apt.end_at = None;
        assert!(apt.interval().is_none());
    }

    #[test]
    fn duration_prefers_stored_value() {
        let mut apt = sample();
        assert_eq!(apt.display_duration(), Some(30));
        apt.duration_minutes = Some(45);
        assert_eq!(apt.display_duration(), Some(45));
    }

    #[test]
    fn deserializes_camel_case_record() {
        let raw = r##"{
            "id": "00000000-0000-0000-0000-000000000007",
            "startAt": "2024-03-14T09:00:00Z",
            "endAt": "2024-03-14T09:30:00Z",
            "status": "no_show",
            "type": "first_visit",
            "patient": { "name": "Ana Pérez" }
        }"##;
        let apt: Appointment = serde_json::from_str(raw).expect("parse appointment");
        assert_eq!(apt.status, AppointmentStatus::NoShow);
        assert_eq!(apt.kind, AppointmentType::FirstVisit);
        assert_eq!(apt.patient_name(), "Ana Pérez");
        assert_eq!(apt.display_color(), "#F59E0B");
    }

    #[test]
    fn keys_parse_case_insensitively() {
        assert_eq!(
            AppointmentStatus::from_key("In-Progress"),
            Some(AppointmentStatus::InProgress)
        );
        assert_eq!(
            AppointmentType::from_key("FOLLOW_UP"),
            Some(AppointmentType::FollowUp)
        );
        assert_eq!(AppointmentType::from_key("house_call"), None);
    }
}
