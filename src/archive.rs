use crate::storage::{LocalStorage, StorageError, ARCHIVES_KEY};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
pub const SUBJECTS: [&str; 5] = ["Math", "English", "Japanese", "Science", "Social Studies"];
pub const TEST_TYPES: [&str; 3] = ["Midterm", "Final", "Proficiency"];

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("file data must be a base64 data URL")]
    InvalidDataUrl,
    #[error("file data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("file name is required")]
    MissingFileName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: i64,
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub test_type: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_data: String,
    pub created_at: String,
}

/// Entry without its payload, for listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub id: i64,
    pub file_name: String,
    pub file_type: String,
    pub school: String,
    pub subject: String,
    pub test_type: String,
    pub date: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

impl From<&ArchiveEntry> for ArchiveSummary {
    fn from(entry: &ArchiveEntry) -> Self {
        Self {
            id: entry.id,
            file_name: entry.file_name.clone(),
            file_type: entry.file_type.clone(),
            school: entry.school.clone(),
            subject: entry.subject.clone(),
            test_type: entry.test_type.clone(),
            date: entry.date.clone(),
            tags: entry.tags.clone(),
            created_at: entry.created_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub test_type: String,
    pub date: String,
    /// Comma separated.
    #[serde(default)]
    pub tags: String,
    pub file_data: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveFilter {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl ArchiveFilter {
    pub fn matches(&self, entry: &ArchiveEntry) -> bool {
        let school = self.school.as_deref().unwrap_or_default();
        if !entry.school.contains(school) {
            return false;
        }
        if let Some(subject) = non_empty(&self.subject) {
            if entry.subject != subject {
                return false;
            }
        }

        let start = non_empty(&self.start_date).and_then(parse_date);
        let end = non_empty(&self.end_date).and_then(parse_date);
        if start.is_none() && end.is_none() {
            return true;
        }
        let Some(date) = parse_date(&entry.date) else {
            return false;
        };
        start.is_none_or(|start| date >= start) && end.is_none_or(|end| date <= end)
    }
}

/// Decoded file ready to be served.
#[derive(Debug)]
pub struct DecodedFile {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(data_url: &str) -> Result<DecodedFile, ArchiveError> {
    let rest = data_url.strip_prefix("data:").ok_or(ArchiveError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ArchiveError::InvalidDataUrl)?;
    let mime = header.strip_suffix(";base64").ok_or(ArchiveError::InvalidDataUrl)?;
    let bytes = STANDARD.decode(payload.trim())?;

    Ok(DecodedFile {
        mime: if mime.is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_archives(storage: &LocalStorage) -> Vec<ArchiveEntry> {
    match storage.get_json::<Vec<ArchiveEntry>>(ARCHIVES_KEY) {
        Ok(archives) => archives.unwrap_or_default(),
        Err(err) => {
            warn!("archives are corrupt, treating as empty: {err}");
            Vec::new()
        }
    }
}

pub fn list_archives(storage: &LocalStorage, filter: &ArchiveFilter) -> Vec<ArchiveSummary> {
    load_archives(storage)
        .iter()
        .filter(|entry| filter.matches(entry))
        .map(ArchiveSummary::from)
        .collect()
}

pub fn find_archive(storage: &LocalStorage, id: i64) -> Option<ArchiveEntry> {
    load_archives(storage).into_iter().find(|entry| entry.id == id)
}

/// Validates the upload and returns the entry to store.
pub fn prepare_upload(upload: UploadRequest, now: DateTime<Utc>) -> Result<ArchiveEntry, ArchiveError> {
    let file_name = upload.file_name.trim();
    if file_name.is_empty() {
        return Err(ArchiveError::MissingFileName);
    }
    let decoded = decode_data_url(&upload.file_data)?;
    if decoded.bytes.len() > MAX_FILE_BYTES {
        return Err(ArchiveError::TooLarge {
            size: decoded.bytes.len(),
            limit: MAX_FILE_BYTES,
        });
    }

    let file_type = match upload.file_type.trim() {
        "" => decoded.mime,
        declared => declared.to_string(),
    };

    Ok(ArchiveEntry {
        id: now.timestamp_millis(),
        file_name: file_name.to_string(),
        file_type,
        school: upload.school.trim().to_string(),
        subject: upload.subject.trim().to_string(),
        test_type: upload.test_type.trim().to_string(),
        date: upload.date.trim().to_string(),
        tags: parse_tags(&upload.tags),
        file_data: upload.file_data,
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn add_archive(storage: &mut LocalStorage, mut entry: ArchiveEntry) -> Result<ArchiveSummary, StorageError> {
    let mut archives = load_archives(storage);
    if let Some(last_id) = archives.iter().map(|a| a.id).max() {
        entry.id = entry.id.max(last_id + 1);
    }
    let summary = ArchiveSummary::from(&entry);
    archives.push(entry);
    storage.set_json(ARCHIVES_KEY, &archives)?;
    Ok(summary)
}

/// Returns false when no entry had that id.
pub fn delete_archive(storage: &mut LocalStorage, id: i64) -> Result<bool, StorageError> {
    let mut archives = load_archives(storage);
    let before = archives.len();
    archives.retain(|entry| entry.id != id);
    if archives.len() == before {
        return Ok(false);
    }
    storage.set_json(ARCHIVES_KEY, &archives)?;
    Ok(true)
}

pub fn archive_count(storage: &LocalStorage) -> usize {
    load_archives(storage).len()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn upload(name: &str, school: &str, subject: &str, date: &str) -> UploadRequest {
        UploadRequest {
            file_name: name.to_string(),
            file_type: String::new(),
            school: school.to_string(),
            subject: subject.to_string(),
            test_type: "Midterm".to_string(),
            date: date.to_string(),
            tags: " past paper, ,2025 ".to_string(),
            file_data: format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.4")),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    #[test]
    fn upload_splits_tags_and_infers_type() {
        let entry = prepare_upload(upload("exam.pdf", "North High", "Math", "2025-07-01"), now()).unwrap();
        assert_eq!(entry.tags, vec!["past paper", "2025"]);
        assert_eq!(entry.file_type, "application/pdf");

        let decoded = decode_data_url(&entry.file_data).unwrap();
        assert_eq!(decoded.bytes, b"%PDF-1.4");
    }

    #[test]
    fn upload_rejects_bad_payloads() {
        let mut bad = upload("exam.pdf", "", "", "2025-07-01");
        bad.file_data = "not a data url".to_string();
        assert!(matches!(prepare_upload(bad, now()), Err(ArchiveError::InvalidDataUrl)));

        let mut bad = upload("exam.pdf", "", "", "2025-07-01");
        bad.file_data = "data:text/plain;base64,@@@".to_string();
        assert!(matches!(prepare_upload(bad, now()), Err(ArchiveError::InvalidBase64(_))));

        let mut big = upload("big.bin", "", "", "2025-07-01");
        big.file_data = format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(vec![0u8; MAX_FILE_BYTES + 1])
        );
        assert!(matches!(prepare_upload(big, now()), Err(ArchiveError::TooLarge { .. })));
    }

    #[test]
    fn filters_combine_school_subject_and_dates() {
        let mut storage = LocalStorage::new(usize::MAX);
        for (name, school, subject, date) in [
            ("a.pdf", "North High", "Math", "2025-05-10"),
            ("b.pdf", "North High", "English", "2025-07-01"),
            ("c.pdf", "South High", "Math", "2025-09-15"),
        ] {
            let entry = prepare_upload(upload(name, school, subject, date), now()).unwrap();
            add_archive(&mut storage, entry).unwrap();
        }

        let names = |filter: ArchiveFilter| -> Vec<String> {
            list_archives(&storage, &filter)
                .into_iter()
                .map(|s| s.file_name)
                .collect()
        };

        assert_eq!(names(ArchiveFilter::default()).len(), 3);
        assert_eq!(
            names(ArchiveFilter {
                school: Some("North".to_string()),
                ..Default::default()
            }),
            vec!["a.pdf", "b.pdf"]
        );
        assert_eq!(
            names(ArchiveFilter {
                subject: Some("Math".to_string()),
                start_date: Some("2025-06-01".to_string()),
                ..Default::default()
            }),
            vec!["c.pdf"]
        );
        assert_eq!(
            names(ArchiveFilter {
                end_date: Some("2025-07-01".to_string()),
                ..Default::default()
            }),
            vec!["a.pdf", "b.pdf"]
        );
    }

    #[test]
    fn ids_stay_unique_and_delete_reports_missing() {
        let mut storage = LocalStorage::default();
        let first = add_archive(&mut storage, prepare_upload(upload("a", "", "", "2025-01-01"), now()).unwrap()).unwrap();
        let second = add_archive(&mut storage, prepare_upload(upload("b", "", "", "2025-01-01"), now()).unwrap()).unwrap();
        assert_ne!(first.id, second.id);

        assert!(delete_archive(&mut storage, first.id).unwrap());
        assert!(!delete_archive(&mut storage, first.id).unwrap());
        assert_eq!(archive_count(&storage), 1);
    }

    #[test]
    fn quota_exhaustion_surfaces_as_storage_error() {
        let mut storage = LocalStorage::new(64);
        let entry = prepare_upload(upload("a.pdf", "", "", "2025-01-01"), now()).unwrap();
        assert!(matches!(
            add_archive(&mut storage, entry),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(archive_count(&storage), 0);
    }
}
