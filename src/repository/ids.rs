//! Identifier list files: one identifier per line.

use std::fs;
use std::path::Path;

use crate::error::ScrapeError;
use crate::models::Identifier;

/// Read identifiers in file order, one per line, exactly as written.
///
/// No validation is done: a blank or malformed line is still an identifier
/// and simply fails its fetch.
pub fn read_identifiers(path: &Path) -> Result<Vec<Identifier>, ScrapeError> {
    let contents = fs::read_to_string(path).map_err(|e| ScrapeError::io(path, e))?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Overwrite `path` with one identifier per line.
pub fn write_identifiers(path: &Path, ids: &[Identifier]) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
    }

    let mut contents = ids.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    fs::write(path, contents).map_err(|e| ScrapeError::io(path, e))
}

/// Pull identifiers out of a CSV export of the appraisal roll.
///
/// Keeps values of `column` that start with `prefix`, in row order. Rows
/// with a missing or non-matching value are skipped.
pub fn extract_identifiers(
    path: &Path,
    column: &str,
    prefix: &str,
) -> Result<Vec<Identifier>, ScrapeError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            ScrapeError::Shape(format!("{} has no '{}' column", path.display(), column))
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim) {
            if value.starts_with(prefix) && !value.is_empty() {
                ids.push(value.to_string());
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_keeps_lines_as_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        fs::write(&path, "R001\n\n  R002  \r\nR003\n").unwrap();

        assert_eq!(
            read_identifiers(&path).unwrap(),
            vec!["R001", "", "  R002  ", "R003"]
        );
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        fs::write(&path, "").unwrap();

        assert!(read_identifiers(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_identifiers(&dir.path().join("absent.txt")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("failed.txt");
        let ids = vec!["R9".to_string(), "R7".to_string()];

        write_identifiers(&path, &ids).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "R9\nR7\n");
        assert_eq!(read_identifiers(&path).unwrap(), ids);
    }

    #[test]
    fn test_extract_from_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roll.csv");
        fs::write(
            &path,
            "Owner,QuickRef,Acres\nSmith,R001,2\nJones,P555,1\nDoe,,4\nRoe, R002 ,3\n",
        )
        .unwrap();

        assert_eq!(
            extract_identifiers(&path, "QuickRef", "R").unwrap(),
            vec!["R001", "R002"]
        );
    }

    #[test]
    fn test_extract_requires_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roll.csv");
        fs::write(&path, "Owner,Id\nSmith,R001\n").unwrap();

        assert!(matches!(
            extract_identifiers(&path, "QuickRef", "R"),
            Err(ScrapeError::Shape(_))
        ));
    }
}
