//! Announcement classification and change extraction.
//!
//! Each document is matched against the known announcement templates by title
//! and handed to that template's extractor. Failures are reported per
//! document and never abort a batch.

mod table;
mod text;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::calendar::TradingCalendar;
use crate::disambiguate::{find_effective_date, normalize_width};
use crate::document::Document;

pub use table::expand_merged_columns;

/// Default みなし額面 when an announcement does not state one.
pub const DEFAULT_FACTOR: &str = "50";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid month/day {month}/{day}")]
    InvalidDate { month: u32, day: u32 },
    #[error("no effective date found in document body")]
    MissingEffectiveDate,
    #[error("no table with {0} columns")]
    MissingTable(&'static str),
    #[error("cannot split '{cell}' into the columns of merged header '{header}'")]
    ColumnSplit { header: String, cell: String },
    #[error("{removed} removed codes but {added} added codes")]
    UnpairedCodes { removed: usize, added: usize },
    #[error("document contains no changes")]
    NoChanges,
    #[error("no divisor value found")]
    MissingDivisor,
}

/// Known announcement templates, in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Template {
    /// 除数 change notice; yields a divisor, never membership changes.
    DivisorNotice,
    /// みなし額面 revision table; the code is both removed and re-added.
    FactorRevision,
    /// 定期見直し result table with optional per-row dates.
    PeriodicReview,
    /// Free-text 構成銘柄の入れ替え notice.
    ReplacementNotice,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::DivisorNotice,
        Template::FactorRevision,
        Template::PeriodicReview,
        Template::ReplacementNotice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Template::DivisorNotice => "divisor-notice",
            Template::FactorRevision => "factor-revision",
            Template::PeriodicReview => "periodic-review",
            Template::ReplacementNotice => "replacement-notice",
        }
    }

    fn title_markers(&self) -> &'static [&'static str] {
        match self {
            Template::DivisorNotice => &["除数"],
            Template::FactorRevision => &["みなし額面"],
            Template::PeriodicReview => &["定期見直し"],
            Template::ReplacementNotice => &[
                "構成銘柄の入れ替え",
                "構成銘柄の入替",
                "構成銘柄の変更",
                "銘柄入れ替え",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched(Template),
    Unrecognized,
}

/// One extracted `(removed, added, factor, date override)` tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub removed_code: String,
    pub added_code: String,
    pub adjustment_factor: String,
    pub effective_date_override: Option<NaiveDate>,
}

/// Membership changes from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionChanges {
    /// Shared date from the body text, if one was found.
    pub effective_date: Option<NaiveDate>,
    pub rows: Vec<RawChange>,
}

impl CompositionChanges {
    pub fn effective_date_for(&self, row: &RawChange) -> Option<NaiveDate> {
        row.effective_date_override.or(self.effective_date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivisorNotice {
    pub filename: String,
    pub published: NaiveDate,
    pub effective_date: NaiveDate,
    pub divisor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Changes(CompositionChanges),
    Divisor(DivisorNotice),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    /// Published before the cutover date; not inspected.
    BeforeCutover,
    Unrecognized,
    Matched {
        template: Template,
        extraction: Extraction,
    },
    Failed {
        template: Template,
        error: ExtractError,
    },
}

/// Classify a document by the fixed title markers.
pub fn classify(doc: &Document) -> Classification {
    let title = normalize_width(&doc.title);
    Template::ALL
        .into_iter()
        .find(|t| t.title_markers().iter().any(|m| title.contains(m)))
        .map_or(Classification::Unrecognized, Classification::Matched)
}

/// Classify and extract one document.
pub fn extract(doc: &Document, calendar: &TradingCalendar, cutover: NaiveDate) -> DocumentOutcome {
    if doc.published < cutover {
        return DocumentOutcome::BeforeCutover;
    }
    let template = match classify(doc) {
        Classification::Matched(template) => template,
        Classification::Unrecognized => return DocumentOutcome::Unrecognized,
    };

    match extract_template(template, doc, calendar) {
        Ok(extraction) => DocumentOutcome::Matched {
            template,
            extraction,
        },
        Err(error) => DocumentOutcome::Failed { template, error },
    }
}

fn extract_template(
    template: Template,
    doc: &Document,
    calendar: &TradingCalendar,
) -> Result<Extraction, ExtractError> {
    if template == Template::DivisorNotice {
        let divisor = text::divisor_value(&doc.text)?;
        return Ok(Extraction::Divisor(DivisorNotice {
            filename: doc.filename.clone(),
            published: doc.published,
            effective_date: calendar.next_trading_date(doc.published, 1),
            divisor,
        }));
    }

    let rows = match template {
        Template::FactorRevision => table::factor_revision_rows(&doc.tables, doc.published, calendar)?,
        Template::PeriodicReview => table::periodic_review_rows(&doc.tables, doc.published, calendar)?,
        _ => text::replacement_rows(&doc.text)?,
    };
    if rows.is_empty() {
        return Err(ExtractError::NoChanges);
    }

    let effective_date = find_effective_date(&doc.text, doc.published, calendar)?;
    if effective_date.is_none() && rows.iter().any(|r| r.effective_date_override.is_none()) {
        return Err(ExtractError::MissingEffectiveDate);
    }
    Ok(Extraction::Changes(CompositionChanges {
        effective_date,
        rows,
    }))
}

/// Changes extracted from one document, tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub filename: String,
    pub template: Template,
    pub changes: CompositionChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnparsedDocument {
    pub filename: String,
    pub reason: String,
}

/// Result of running extraction over a document set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    /// Per-document batches in processing (descending filename) order.
    pub changes: Vec<ChangeBatch>,
    pub divisors: Vec<DivisorNotice>,
    pub unparsed: Vec<UnparsedDocument>,
    pub skipped: usize,
}

/// Extract every document, isolating failures per document.
pub fn process_documents(
    mut docs: Vec<Document>,
    calendar: &TradingCalendar,
    cutover: NaiveDate,
) -> ExtractionReport {
    docs.sort_by(|a, b| b.filename.cmp(&a.filename));

    let mut report = ExtractionReport::default();
    for doc in &docs {
        match extract(doc, calendar, cutover) {
            DocumentOutcome::BeforeCutover => report.skipped += 1,
            DocumentOutcome::Unrecognized => {
                tracing::warn!("Unrecognized document template: {}", doc.filename);
                report.unparsed.push(UnparsedDocument {
                    filename: doc.filename.clone(),
                    reason: "no matching template".to_string(),
                });
            }
            DocumentOutcome::Failed { template, error } => {
                tracing::warn!(
                    "Failed to extract {} as {}: {}",
                    doc.filename,
                    template.name(),
                    error
                );
                report.unparsed.push(UnparsedDocument {
                    filename: doc.filename.clone(),
                    reason: format!("{}: {}", template.name(), error),
                });
            }
            DocumentOutcome::Matched {
                extraction: Extraction::Divisor(notice),
                ..
            } => {
                tracing::debug!(
                    "Divisor {} effective {} from {}",
                    notice.divisor,
                    notice.effective_date,
                    doc.filename
                );
                report.divisors.push(notice);
            }
            DocumentOutcome::Matched {
                template,
                extraction: Extraction::Changes(changes),
            } => {
                tracing::debug!(
                    "{} change rows from {} ({})",
                    changes.rows.len(),
                    doc.filename,
                    template.name()
                );
                report.changes.push(ChangeBatch {
                    filename: doc.filename.clone(),
                    template,
                    changes,
                });
            }
        }
    }

    tracing::info!(
        "Processed {} documents: {} change batches, {} divisor notices, {} unparsed, {} before cutover",
        docs.len(),
        report.changes.len(),
        report.divisors.len(),
        report.unparsed.len(),
        report.skipped
    );
    report
}

/// True for a constituent code: three digits then a digit or upper-case letter.
pub fn is_code(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 4
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && (bytes[3].is_ascii_digit() || bytes[3].is_ascii_uppercase())
}

/// Normalize a raw code string (width, whitespace) and check its shape.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = normalize_width(raw).trim().to_string();
    is_code(&code).then_some(code)
}

/// Code-shaped tokens in `segment` with their byte offsets.
///
/// Tokens directly followed by a date or currency suffix are skipped so that
/// "2021年" or "1000円" are not taken for codes. A `.`, `/` or `,` only counts
/// as a suffix when a digit follows it, as in "1234.5" or "2021/10".
pub(crate) fn find_codes(segment: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in segment
        .char_indices()
        .chain(std::iter::once((segment.len(), ' ')))
    {
        if c.is_ascii_alphanumeric() {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            let token = &segment[s..i];
            let digit_follows = segment
                .get(i + c.len_utf8()..)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|next| next.is_ascii_digit());
            let numeric_suffix = matches!(c, '年' | '月' | '日' | '円' | '%')
                || (matches!(c, '.' | '/' | ',') && digit_follows);
            if is_code(token) && !numeric_suffix {
                out.push((s, token.to_string()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentTable;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cal() -> TradingCalendar {
        TradingCalendar::jpx().unwrap()
    }

    fn cutover() -> NaiveDate {
        d(2020, 4, 1)
    }

    fn doc(filename: &str, text: &str, tables: Vec<DocumentTable>) -> Document {
        Document::new(filename, text, tables).unwrap()
    }

    #[test]
    fn test_classify_by_title() {
        let cases = [
            ("2021-09-06_日経平均株価の除数の変更.json", Classification::Matched(Template::DivisorNotice)),
            ("2021-03-01_みなし額面の変更.json", Classification::Matched(Template::FactorRevision)),
            ("2021-09-06_定期見直し結果.json", Classification::Matched(Template::PeriodicReview)),
            ("2021-09-06_構成銘柄の入れ替え.json", Classification::Matched(Template::ReplacementNotice)),
            ("2021-09-06_お知らせ.json", Classification::Unrecognized),
        ];
        for (filename, expected) in cases {
            assert_eq!(classify(&doc(filename, "", vec![])), expected, "{}", filename);
        }
    }

    #[test]
    fn test_divisor_wins_over_composition_marker() {
        let document = doc("2021-09-06_構成銘柄の変更に伴う除数の変更.json", "", vec![]);
        assert_eq!(classify(&document), Classification::Matched(Template::DivisorNotice));
    }

    #[test]
    fn test_before_cutover_short_circuits() {
        let document = doc("2019-09-06_構成銘柄の入れ替え.json", "garbage", vec![]);
        assert_eq!(extract(&document, &cal(), cutover()), DocumentOutcome::BeforeCutover);
    }

    #[test]
    fn test_unrecognized_outcome() {
        let document = doc("2021-09-06_決算短信.json", "", vec![]);
        assert_eq!(extract(&document, &cal(), cutover()), DocumentOutcome::Unrecognized);
    }

    #[test]
    fn test_divisor_notice_effective_next_trading_day() {
        let document = doc(
            "2021-09-30_日経平均株価の除数の変更.json",
            "除数を変更します。\n変更前 ２７.７６８\n変更後 ２７.７６０",
            vec![],
        );
        match extract(&document, &cal(), cutover()) {
            DocumentOutcome::Matched {
                template: Template::DivisorNotice,
                extraction: Extraction::Divisor(notice),
            } => {
                assert_eq!(notice.effective_date, d(2021, 10, 1));
                assert!((notice.divisor - 27.760).abs() < 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_replacement_notice_extraction() {
        let text = "日経平均株価 構成銘柄の入れ替えについて\n\
                    ２０２１年９月６日\n\
                    実施日：２０２１年１０月１日（金）\n\
                    【除外銘柄】\n\
                    ４７５５ 楽天グループ\n\
                    【採用銘柄】\n\
                    ６１４６ ディスコ　みなし額面：５０\n";
        let document = doc("2021-09-06_構成銘柄の入れ替え.json", text, vec![]);
        match extract(&document, &cal(), cutover()) {
            DocumentOutcome::Matched {
                extraction: Extraction::Changes(changes),
                ..
            } => {
                assert_eq!(changes.effective_date, Some(d(2021, 10, 1)));
                assert_eq!(changes.rows.len(), 1);
                assert_eq!(changes.rows[0].removed_code, "4755");
                assert_eq!(changes.rows[0].added_code, "6146");
                assert_eq!(changes.rows[0].adjustment_factor, "50");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_missing_effective_date_fails() {
        let document = doc(
            "2021-09-06_構成銘柄の入れ替え.json",
            "除外 4755\n採用 6146",
            vec![],
        );
        assert_eq!(
            extract(&document, &cal(), cutover()),
            DocumentOutcome::Failed {
                template: Template::ReplacementNotice,
                error: ExtractError::MissingEffectiveDate,
            }
        );
    }

    #[test]
    fn test_empty_composition_fails() {
        let document = doc("2021-09-06_構成銘柄の入れ替え.json", "10月1日", vec![]);
        assert_eq!(
            extract(&document, &cal(), cutover()),
            DocumentOutcome::Failed {
                template: Template::ReplacementNotice,
                error: ExtractError::NoChanges,
            }
        );
    }

    #[test]
    fn test_process_documents_isolates_failures() {
        let docs = vec![
            doc("2021-09-06_構成銘柄の入れ替え.json", "実施日 10月1日\n除外 4755\n採用 6146", vec![]),
            doc("2021-09-07_構成銘柄の入れ替え.json", "除外 4755", vec![]),
            doc("2021-09-08_不明.json", "", vec![]),
            doc("2019-01-08_構成銘柄の入れ替え.json", "", vec![]),
            doc("2021-09-30_除数の変更.json", "新除数 27.760", vec![]),
        ];
        let report = process_documents(docs, &cal(), cutover());
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.divisors.len(), 1);
        assert_eq!(report.unparsed.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.unparsed[0].filename, "2021-09-08_不明.json");
    }

    #[test]
    fn test_process_documents_descending_order() {
        let docs = vec![
            doc("2021-03-01_構成銘柄の入れ替え.json", "実施日 4月1日\n除外 1001\n採用 2001", vec![]),
            doc("2021-09-06_構成銘柄の入れ替え.json", "実施日 10月1日\n除外 1002\n採用 2002", vec![]),
        ];
        let report = process_documents(docs, &cal(), cutover());
        assert_eq!(report.changes[0].filename, "2021-09-06_構成銘柄の入れ替え.json");
        assert_eq!(report.changes[1].filename, "2021-03-01_構成銘柄の入れ替え.json");
    }

    #[test]
    fn test_is_code() {
        assert!(is_code("7203"));
        assert!(is_code("130A"));
        assert!(!is_code("130a"));
        assert!(!is_code("72030"));
        assert!(!is_code("A203"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ７２０３ "), Some("7203".to_string()));
        assert_eq!(normalize_code("toyota"), None);
    }

    #[test]
    fn test_find_codes_skips_numeric_suffixes() {
        let codes = find_codes("2021年10月1日 4755 楽天 1000円 27.76 6146");
        let tokens: Vec<&str> = codes.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(tokens, vec!["4755", "6146"]);
    }

    #[test]
    fn test_find_codes_punctuation_without_digit() {
        let codes = find_codes("除外銘柄:4755,楽天グループ 6146. 2021/10/01 1234.5 9984/");
        let tokens: Vec<&str> = codes.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(tokens, vec!["4755", "6146", "9984"]);
    }

    #[test]
    fn test_comma_after_full_width_code() {
        let text = "実施日 10月1日\n除外銘柄：４７５５，楽天グループ\n採用銘柄：６１４６，ディスコ";
        let document = doc("2021-09-06_構成銘柄の入れ替え.json", text, vec![]);
        match extract(&document, &cal(), cutover()) {
            DocumentOutcome::Matched {
                extraction: Extraction::Changes(changes),
                ..
            } => {
                assert_eq!(changes.effective_date, Some(d(2021, 10, 1)));
                assert_eq!(changes.rows.len(), 1);
                assert_eq!(changes.rows[0].removed_code, "4755");
                assert_eq!(changes.rows[0].added_code, "6146");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_periodic_review_skips_unsplittable_table() {
        let company = DocumentTable {
            headers: vec!["会社 名".to_string()],
            rows: vec![vec!["トヨタ 自動車 株式会社".to_string()]],
        };
        let review = DocumentTable {
            headers: vec!["除外".to_string(), "採用".to_string()],
            rows: vec![vec!["4755".to_string(), "6146".to_string()]],
        };
        let document = doc(
            "2021-09-06_定期見直し結果.json",
            "実施日 10月1日",
            vec![company, review],
        );
        match extract(&document, &cal(), cutover()) {
            DocumentOutcome::Matched {
                template: Template::PeriodicReview,
                extraction: Extraction::Changes(changes),
            } => {
                assert_eq!(changes.rows.len(), 1);
                assert_eq!(changes.rows[0].added_code, "6146");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
