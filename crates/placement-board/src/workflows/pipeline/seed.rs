use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::domain::CardRecord;

/// Failure reading a JSON array of [`CardRecord`]s used to seed a backend.
#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Io(err) => write!(f, "failed to read board seed: {}", err),
            SeedError::Json(err) => write!(f, "invalid board seed data: {}", err),
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(err) => Some(err),
            SeedError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

pub fn read_seed<R: Read>(reader: R) -> Result<Vec<CardRecord>, SeedError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_seed_file<P: AsRef<Path>>(path: P) -> Result<Vec<CardRecord>, SeedError> {
    let file = File::open(path)?;
    read_seed(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_records_with_optional_fields() {
        let json = r#"[
            {"id": "1", "title": "Data Analyst", "company": "Acme", "stage": "interview",
             "sub_stage": "phone_screening", "updated_at": "2025-03-01T09:00:00Z"},
            {"id": "2", "title": "Welder", "company": "Forge Co", "job_id": "job-9",
             "stage": "hired", "updated_at": "2025-03-02T09:00:00Z"}
        ]"#;

        let records = read_seed(json.as_bytes()).expect("seed parses");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sub_stage.as_deref(), Some("phone_screening"));
        assert_eq!(records[1].job_id.as_deref(), Some("job-9"));
        assert_eq!(records[1].sub_stage, None);
    }

    #[test]
    fn rejects_malformed_documents() {
        match read_seed("{\"id\": 1}".as_bytes()) {
            Err(SeedError::Json(_)) => {}
            other => panic!("expected json error, got {other:?}"),
        }
    }
}
