//! JSON export of selected evaluations
//!
//! Clinician fields are denormalized from the current profile at export
//! time, so a renamed clinician shows up under the new name.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use mse_core::traits::Id;
use mse_models::{Clinician, EvaluationDetail};
use serde::Serialize;

/// Profile fields carried on each exported record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportClinician {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub years_experience: i32,
}

impl From<&Clinician> for ExportClinician {
    fn from(c: &Clinician) -> Self {
        Self {
            username: c.username.clone(),
            email: c.email.clone(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            title: c.title.clone(),
            years_experience: c.years_experience,
        }
    }
}

/// One element of the export array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub id: Id,
    pub clinician: ExportClinician,
    pub image_path: String,
    /// The clinician's judgment, not the ground truth
    pub is_real: bool,
    pub confidence: i32,
    pub timestamp: String,
}

/// RFC 3339 with a `+00:00` offset; sub-second digits only when present
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    let precision = if at.nanosecond() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    at.to_rfc3339_opts(precision, false)
}

/// Build export records ordered by evaluation id
///
/// Rows whose clinician is missing from `clinicians` are skipped.
pub fn build_export(
    details: &[EvaluationDetail],
    clinicians: &HashMap<Id, Clinician>,
) -> Vec<ExportRecord> {
    let mut records: Vec<ExportRecord> = details
        .iter()
        .filter_map(|detail| {
            let clinician = clinicians.get(&detail.clinician_id)?;
            Some(ExportRecord {
                id: detail.evaluation_id,
                clinician: clinician.into(),
                image_path: detail.image_path.clone(),
                is_real: detail.judged_real,
                confidence: detail.confidence,
                timestamp: format_timestamp(&detail.created_at),
            })
        })
        .collect();
    records.sort_by_key(|r| r.id);
    records
}

/// Pretty-printed JSON array with two-space indentation
pub fn to_json(records: &[ExportRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Attachment name for an export generated at `now`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("evaluations_export_{}.json", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doctor1() -> Clinician {
        let now = Utc::now();
        Clinician {
            id: 7,
            username: "doctor1".into(),
            email: "doctor1@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            title: "Dr.".into(),
            workplace: "General Hospital".into(),
            years_experience: 10,
            is_superuser: false,
            password_hash: "secret".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn detail(id: Id, at: DateTime<Utc>) -> EvaluationDetail {
        EvaluationDetail {
            evaluation_id: id,
            clinician_id: 7,
            image_id: id,
            image_set_id: 1,
            image_path: "real/image001.jpg".into(),
            ground_truth_real: false,
            judged_real: true,
            confidence: 5,
            created_at: at,
        }
    }

    #[test]
    fn test_doctor1_export() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let clinicians = HashMap::from([(7, doctor1())]);
        let records = build_export(&[detail(1, at)], &clinicians);
        let json = to_json(&records).unwrap();

        let expected = r#"[
  {
    "id": 1,
    "clinician": {
      "username": "doctor1",
      "email": "doctor1@example.com",
      "first_name": "Ada",
      "last_name": "Lovelace",
      "title": "Dr.",
      "years_experience": 10
    },
    "image_path": "real/image001.jpg",
    "is_real": true,
    "confidence": 5,
    "timestamp": "2024-01-15T10:30:00+00:00"
  }
]"#;
        assert_eq!(json, expected);
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_ordered_by_id_and_unknown_clinician_skipped() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let mut orphan = detail(2, at);
        orphan.clinician_id = 99;
        let details = vec![detail(5, at), orphan, detail(3, at)];

        let records = build_export(&details, &HashMap::from([(7, doctor1())]));
        let ids: Vec<Id> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 5]);
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_timestamp_with_fraction() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
            + chrono::Duration::microseconds(250);
        assert_eq!(format_timestamp(&at), "2024-01-15T10:30:00.000250+00:00");
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(export_filename(at), "evaluations_export_20240309_070501.json");
    }
}
