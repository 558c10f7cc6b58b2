//! Generic line-record file I/O shared by every entity catalog (§3, §6).
//!
//! Every entity kind is stored as one flat file: LF-terminated,
//! comma-separated, no header row. [`Record`] is the contract an entity type
//! implements to be read and written this way; [`load`]/[`save`] do the
//! actual file I/O so individual catalogs only implement parsing rules.

use std::path::Path;

use crate::error::ArmoryError;

/// A type that can be represented as one line of a store record file.
pub trait Record: Sized {
    /// The entity kind name used in error messages (e.g. `"application"`).
    const KIND: &'static str;

    /// The record's primary key.
    fn key(&self) -> &str;

    /// Parse one non-empty line into a record.
    ///
    /// # Errors
    /// Returns [`ArmoryError::InvalidInput`] if the line does not match the
    /// entity's expected field count or format.
    fn parse(line: &str) -> Result<Self, ArmoryError>;

    /// Render the record back to its one-line, comma-separated form (no trailing newline).
    fn to_line(&self) -> String;
}

/// Read every record from a store file. A missing file is treated as empty
/// (the store seeds empty files at `armory init`, but catalogs must tolerate
/// a file that was never written).
///
/// # Errors
/// Returns an error if a line fails to parse, or the file exists but cannot be read.
pub fn load<T: Record>(path: &Path) -> Result<Vec<T>, ArmoryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ArmoryError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(T::parse)
        .collect()
}

/// Overwrite a store file with exactly these records, one per line, LF-terminated.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save<T: Record>(path: &Path, records: &[T]) -> Result<(), ArmoryError> {
    let mut body = String::new();
    for record in records {
        body.push_str(&record.to_line());
        body.push('\n');
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, body).map_err(|source| ArmoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a record line into exactly `n` comma-separated fields.
///
/// # Errors
/// Returns [`ArmoryError::InvalidInput`] if the line does not split into
/// exactly `n` fields.
pub fn split_fields<'a>(kind: &'static str, line: &'a str, n: usize) -> Result<Vec<&'a str>, ArmoryError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != n {
        return Err(ArmoryError::InvalidInput {
            field: kind,
            reason: format!("expected {n} comma-separated fields, got {}: '{line}'", fields.len()),
        });
    }
    Ok(fields)
}

/// Find a record by key in a slice, for catalogs that need an in-memory lookup.
pub fn find<'a, T: Record>(records: &'a [T], key: &str) -> Option<&'a T> {
    records.iter().find(|r| r.key() == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        name: String,
        value: String,
    }

    impl Record for Dummy {
        const KIND: &'static str = "dummy";

        fn key(&self) -> &str {
            &self.name
        }

        fn parse(line: &str) -> Result<Self, ArmoryError> {
            let fields = split_fields(Self::KIND, line, 2)?;
            Ok(Self {
                name: fields[0].to_owned(),
                value: fields[1].to_owned(),
            })
        }

        fn to_line(&self) -> String {
            format!("{},{}", self.name, self.value)
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let records: Vec<Dummy> = load(&dir.path().join("nope")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dummy");
        let records = vec![
            Dummy {
                name: "a".into(),
                value: "1".into(),
            },
            Dummy {
                name: "b".into(),
                value: "2".into(),
            },
        ];
        save(&path, &records).unwrap();
        let loaded: Vec<Dummy> = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].key(), "a");
        assert_eq!(loaded[1].key(), "b");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dummy");
        std::fs::write(&path, "onlyonefield\n").unwrap();
        let err = load::<Dummy>(&path).unwrap_err();
        assert!(matches!(err, ArmoryError::InvalidInput { .. }));
    }
}
