//! File formats: baseline CSV, event log CSV, price CSV and extracted documents.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, DocumentError};
use crate::extract::{normalize_code, UnparsedDocument};
use crate::factor::FactorExpr;
use crate::types::{BaselineSnapshot, ChangeEvent, EventLog};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid baseline: {0}")]
    Baseline(String),
    #[error("Invalid record: {0}")]
    Record(String),
}

fn open(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    File::create(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// -- Baseline --

/// Read a baseline file:
///
/// ```text
/// from_date,2020-04-01
/// josuu,27.769
/// code,minashi
/// 1332,50
/// ...
/// ```
pub fn read_baseline(path: &Path) -> Result<BaselineSnapshot, StoreError> {
    parse_baseline(open(path)?)
}

pub fn parse_baseline<R: Read>(reader: R) -> Result<BaselineSnapshot, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = rdr.records();

    let mut next_pair = |key: &str| -> Result<String, StoreError> {
        let record = records
            .next()
            .ok_or_else(|| StoreError::Baseline(format!("missing '{}' line", key)))??;
        match (record.get(0), record.get(1)) {
            (Some(k), Some(value)) if k == key => Ok(value.to_string()),
            _ => Err(StoreError::Baseline(format!("expected '{}' line", key))),
        }
    };

    let from_date = next_pair("from_date")?;
    let effective_from = NaiveDate::parse_from_str(&from_date, "%Y-%m-%d")
        .map_err(|_| StoreError::Baseline(format!("bad from_date '{}'", from_date)))?;
    let divisor_raw = next_pair("josuu")?;
    let divisor: f64 = divisor_raw
        .parse()
        .map_err(|_| StoreError::Baseline(format!("bad divisor '{}'", divisor_raw)))?;

    // Column header row.
    records
        .next()
        .ok_or_else(|| StoreError::Baseline("missing member header".to_string()))??;

    let mut members = BTreeMap::new();
    for record in records {
        let record = record?;
        let (Some(raw_code), Some(raw_factor)) = (record.get(0), record.get(1)) else {
            if record.iter().all(str::is_empty) {
                continue;
            }
            return Err(StoreError::Baseline(format!("short member row {:?}", record)));
        };
        let code = normalize_code(raw_code)
            .ok_or_else(|| StoreError::Baseline(format!("invalid code '{}'", raw_code)))?;
        let factor = FactorExpr::parse(raw_factor)
            .map_err(|e| StoreError::Baseline(format!("{}: {}", code, e)))?;
        if members.insert(code.clone(), factor.to_string()).is_some() {
            return Err(StoreError::Baseline(format!("duplicate code {}", code)));
        }
    }

    Ok(BaselineSnapshot {
        effective_from,
        divisor,
        members,
    })
}

pub fn write_baseline<W: Write>(writer: W, baseline: &BaselineSnapshot) -> Result<(), StoreError> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);
    wtr.write_record(["from_date", baseline.effective_from.to_string().as_str()])?;
    wtr.write_record(["josuu", baseline.divisor.to_string().as_str()])?;
    wtr.write_record(["code", "minashi"])?;
    for (code, factor) in &baseline.members {
        wtr.write_record([code, factor])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

// -- Event log --

pub fn read_event_log(path: &Path) -> Result<EventLog, StoreError> {
    parse_event_log(open(path)?)
}

pub fn parse_event_log<R: Read>(reader: R) -> Result<EventLog, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut events = Vec::new();
    for (line, record) in rdr.deserialize::<ChangeEvent>().enumerate() {
        let event = record?;
        if event.removed_code.is_none() && event.added_code.is_none() && event.divisor.is_none() {
            return Err(StoreError::Record(format!("row {} carries no change", line + 1)));
        }
        events.push(event);
    }
    Ok(EventLog::new(events))
}

/// Write the event log to a sibling temp file, then rename it over `path`.
///
/// A failed write leaves the previous log in place.
pub fn write_event_log(path: &Path, log: &EventLog) -> Result<(), StoreError> {
    let tmp = path.with_extension("csv.tmp");
    if let Err(e) = write_event_log_to(create(&tmp)?, log) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Wrote {} events to {}", log.len(), path.display());
    Ok(())
}

pub fn write_event_log_to<W: Write>(writer: W, log: &EventLog) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if log.is_empty() {
        wtr.write_record([
            "effective_date",
            "removed_code",
            "added_code",
            "adjustment_factor",
            "divisor",
        ])?;
    }
    for event in log {
        wtr.serialize(event)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

// -- Prices --

#[derive(Debug, Serialize, Deserialize)]
struct PriceRecord {
    code: String,
    price: f64,
}

/// Read a `code,price` file into a lookup map.
pub fn read_prices(path: &Path) -> Result<HashMap<String, f64>, StoreError> {
    parse_prices(open(path)?)
}

pub fn parse_prices<R: Read>(reader: R) -> Result<HashMap<String, f64>, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut prices = HashMap::new();
    for record in rdr.deserialize::<PriceRecord>() {
        let record = record?;
        let code = normalize_code(&record.code)
            .ok_or_else(|| StoreError::Record(format!("invalid code '{}'", record.code)))?;
        prices.insert(code, record.price);
    }
    Ok(prices)
}

// -- Documents --

/// Documents read from a directory, plus files that could not be read.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub rejected: Vec<UnparsedDocument>,
}

/// Load every `*.json` document in `dir`.
///
/// A file with a bad name or body is logged and reported, not fatal.
pub fn load_documents(dir: &Path) -> Result<LoadedDocuments, StoreError> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut loaded = LoadedDocuments::default();
    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_document(&path, &filename) {
            Ok(doc) => loaded.documents.push(doc),
            Err(reason) => {
                tracing::warn!("Skipping document {}: {}", filename, reason);
                loaded.rejected.push(UnparsedDocument { filename, reason });
            }
        }
    }
    tracing::info!(
        "Loaded {} documents from {} ({} rejected)",
        loaded.documents.len(),
        dir.display(),
        loaded.rejected.len()
    );
    Ok(loaded)
}

fn read_document(path: &Path, filename: &str) -> Result<Document, String> {
    let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    Document::from_json(filename, &json).map_err(|e: DocumentError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_parse_baseline() {
        let csv = "from_date,2020-04-01\njosuu,27.769\ncode,minashi\n1332, 50\n７２０３,500/10\n";
        let baseline = parse_baseline(csv.as_bytes()).unwrap();
        assert_eq!(baseline.effective_from, NaiveDate::from_ymd_opt(2020, 4, 1).unwrap());
        assert!((baseline.divisor - 27.769).abs() < EPSILON);
        assert_eq!(baseline.members.len(), 2);
        assert_eq!(baseline.members.get("7203").map(String::as_str), Some("500/10"));
    }

    #[test]
    fn test_baseline_missing_header_lines() {
        let err = parse_baseline("josuu,27.769\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Baseline(_)));
    }

    #[test]
    fn test_baseline_duplicate_code() {
        let csv = "from_date,2020-04-01\njosuu,27.769\ncode,minashi\n1332,50\n1332,50\n";
        assert!(matches!(parse_baseline(csv.as_bytes()), Err(StoreError::Baseline(_))));
    }

    #[test]
    fn test_baseline_bad_factor() {
        let csv = "from_date,2020-04-01\njosuu,27.769\ncode,minashi\n1332,eval(1)\n";
        assert!(matches!(parse_baseline(csv.as_bytes()), Err(StoreError::Baseline(_))));
    }

    #[test]
    fn test_write_then_parse_baseline() {
        let baseline = parse_baseline(
            "from_date,2020-04-01\njosuu,27.5\ncode,minashi\n1332,50\n1333,50/4\n".as_bytes(),
        )
        .unwrap();
        let mut buf = Vec::new();
        write_baseline(&mut buf, &baseline).unwrap();
        assert_eq!(parse_baseline(buf.as_slice()).unwrap(), baseline);
    }

    #[test]
    fn test_parse_event_log_optional_fields() {
        let csv = "effective_date,removed_code,added_code,adjustment_factor,divisor\n\
                   2021-10-01,4755,6146,50,27.76\n\
                   2021-10-01,,2002,50,\n";
        let log = parse_event_log(csv.as_bytes()).unwrap();
        assert_eq!(log.len(), 2);
        let second = &log.events()[1];
        assert_eq!(second.removed_code, None);
        assert_eq!(second.added_code.as_deref(), Some("2002"));
        assert_eq!(second.divisor, None);
    }

    #[test]
    fn test_event_log_rejects_empty_row() {
        let csv = "effective_date,removed_code,added_code,adjustment_factor,divisor\n2021-10-01,,,,\n";
        assert!(matches!(parse_event_log(csv.as_bytes()), Err(StoreError::Record(_))));
    }

    #[test]
    fn test_write_event_log_header() {
        let mut buf = Vec::new();
        write_event_log_to(&mut buf, &EventLog::default()).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            out.lines().next(),
            Some("effective_date,removed_code,added_code,adjustment_factor,divisor")
        );
    }

    #[test]
    fn test_write_event_log_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.csv");
        let csv = "effective_date,removed_code,added_code,adjustment_factor,divisor\n\
                   2021-10-01,4755,6146,50,27.76\n\
                   2022-04-04,1001,2001,50,\n";
        write_event_log(&path, &parse_event_log(csv.as_bytes()).unwrap()).unwrap();
        assert_eq!(read_event_log(&path).unwrap().len(), 2);

        write_event_log(&path, &EventLog::default()).unwrap();
        assert!(read_event_log(&path).unwrap().is_empty());

        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("events.csv")]);
    }

    #[test]
    fn test_parse_prices() {
        let prices = parse_prices("code,price\n7203,2000.5\n130A,10\n".as_bytes()).unwrap();
        assert!((prices["7203"] - 2000.5).abs() < EPSILON);
        assert!((prices["130A"] - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_load_documents_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("2021-09-06_構成銘柄の入れ替え.json"),
            r#"{"text": "除外 4755"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("2021-09-07_broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("2021-09-08_ignored.txt"), "").unwrap();

        let loaded = load_documents(dir.path()).unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.documents[0].text, "除外 4755");
        assert_eq!(loaded.rejected.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_baseline(Path::new("/nonexistent/initial.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/initial.csv"));
    }
}
