//! Tabular extraction: periodic review results and factor revisions.

use chrono::NaiveDate;
use regex::Regex;

use super::{find_codes, ExtractError, RawChange, DEFAULT_FACTOR};
use crate::calendar::TradingCalendar;
use crate::disambiguate::{normalize_width, resolve_month_day_str};
use crate::document::DocumentTable;

const DATE_HEADERS: &[&str] = &["実施日", "変更日", "日付"];

/// Normalize a table and split merged columns.
///
/// The extraction step sometimes fuses adjacent columns, leaving a header such
/// as "除外銘柄 採用銘柄". Such a header becomes one column per part, and each
/// row's cell in that column is split on whitespace into the same number of
/// parts. Blank cells expand to blank parts.
pub fn expand_merged_columns(table: &DocumentTable) -> Result<DocumentTable, ExtractError> {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_width(h)).collect();

    let mut expanded_headers = Vec::new();
    for header in &headers {
        let parts: Vec<&str> = header.split_whitespace().collect();
        if parts.len() > 1 {
            expanded_headers.extend(parts.iter().map(|p| p.to_string()));
        } else {
            expanded_headers.push(header.trim().to_string());
        }
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let mut expanded = Vec::with_capacity(expanded_headers.len());
        for (i, header) in headers.iter().enumerate() {
            let cell = row.get(i).map(|c| normalize_width(c)).unwrap_or_default();
            let width = header.split_whitespace().count();
            if width <= 1 {
                expanded.push(cell.trim().to_string());
                continue;
            }
            let parts: Vec<&str> = cell.split_whitespace().collect();
            if parts.is_empty() {
                expanded.extend(std::iter::repeat(String::new()).take(width));
            } else if parts.len() == width {
                expanded.extend(parts.iter().map(|p| p.to_string()));
            } else {
                return Err(ExtractError::ColumnSplit {
                    header: header.clone(),
                    cell,
                });
            }
        }
        rows.push(expanded);
    }

    Ok(DocumentTable {
        headers: expanded_headers,
        rows,
    })
}

/// Index of the first header containing a keyword, trying keywords in order.
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    keywords
        .iter()
        .find_map(|kw| headers.iter().position(|h| h.contains(kw)))
}

fn cell(row: &[String], column: Option<usize>) -> &str {
    column
        .and_then(|i| row.get(i))
        .map(|s| s.as_str())
        .unwrap_or("")
}

fn first_code(cell: &str) -> Option<String> {
    find_codes(cell).into_iter().next().map(|(_, code)| code)
}

fn factor_cell(cell: &str) -> String {
    cell.split_whitespace().collect()
}

/// Whether every keyword group matches some header before any column splitting.
fn mentions_all(table: &DocumentTable, groups: &[&[&str]]) -> bool {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_width(h)).collect();
    groups
        .iter()
        .all(|keywords| find_column(&headers, keywords).is_some())
}

fn date_cell_regex() -> Result<Regex, ExtractError> {
    Regex::new(r"(?:\d{4}\s*[年/\-.]\s*)?(\d{1,2})\s*[月/\-.]\s*(\d{1,2})")
        .map_err(|e| ExtractError::Parse(format!("regex compile error: {}", e)))
}

/// Resolve a per-row date cell ("10月1日", "10/1", "2021/10/01"); blank means none.
fn row_date(
    re: &Regex,
    cell: &str,
    published: NaiveDate,
    calendar: &TradingCalendar,
) -> Result<Option<NaiveDate>, ExtractError> {
    if cell.trim().is_empty() {
        return Ok(None);
    }
    let cap = re
        .captures(cell)
        .ok_or_else(|| ExtractError::Parse(format!("unrecognized date cell '{}'", cell)))?;
    resolve_month_day_str(published, &cap[1], &cap[2], calendar).map(Some)
}

/// Rows from the first table carrying both 除外 and 採用 columns.
///
/// A candidate table whose merged columns fail to split is passed over; its
/// error is returned only when no other table matches.
pub(super) fn periodic_review_rows(
    tables: &[DocumentTable],
    published: NaiveDate,
    calendar: &TradingCalendar,
) -> Result<Vec<RawChange>, ExtractError> {
    let date_re = date_cell_regex()?;
    let mut split_error = None;
    for table in tables {
        if !mentions_all(table, &[&["除外"], &["採用"]]) {
            continue;
        }
        let table = match expand_merged_columns(table) {
            Ok(table) => table,
            Err(e) => {
                tracing::debug!("Skipping review table: {}", e);
                split_error.get_or_insert(e);
                continue;
            }
        };
        let (Some(removed_col), Some(added_col)) = (
            find_column(&table.headers, &["除外"]),
            find_column(&table.headers, &["採用"]),
        ) else {
            continue;
        };
        let factor_col = find_column(&table.headers, &["みなし額面"]);
        let date_col = find_column(&table.headers, DATE_HEADERS);

        let mut rows = Vec::new();
        for row in &table.rows {
            let removed = first_code(cell(row, Some(removed_col)));
            let added = first_code(cell(row, Some(added_col)));
            let (removed_code, added_code) = match (removed, added) {
                (None, None) => continue,
                (Some(r), Some(a)) => (r, a),
                (r, a) => {
                    return Err(ExtractError::UnpairedCodes {
                        removed: usize::from(r.is_some()),
                        added: usize::from(a.is_some()),
                    })
                }
            };
            let factor = factor_cell(cell(row, factor_col));
            rows.push(RawChange {
                removed_code,
                added_code,
                adjustment_factor: if factor.is_empty() {
                    DEFAULT_FACTOR.to_string()
                } else {
                    factor
                },
                effective_date_override: row_date(
                    &date_re,
                    cell(row, date_col),
                    published,
                    calendar,
                )?,
            });
        }
        return Ok(rows);
    }
    Err(split_error.unwrap_or(ExtractError::MissingTable("除外/採用")))
}

/// Rows from the first table carrying code and みなし額面 columns.
///
/// Each row re-adds its own code under the revised factor.
pub(super) fn factor_revision_rows(
    tables: &[DocumentTable],
    published: NaiveDate,
    calendar: &TradingCalendar,
) -> Result<Vec<RawChange>, ExtractError> {
    let date_re = date_cell_regex()?;
    let mut split_error = None;
    for table in tables {
        if !mentions_all(table, &[&["コード", "銘柄"], &["みなし額面"]]) {
            continue;
        }
        let table = match expand_merged_columns(table) {
            Ok(table) => table,
            Err(e) => {
                tracing::debug!("Skipping factor table: {}", e);
                split_error.get_or_insert(e);
                continue;
            }
        };
        let Some(code_col) = find_column(&table.headers, &["コード", "銘柄"]) else {
            continue;
        };
        let revised_col = table
            .headers
            .iter()
            .position(|h| h.contains("変更後") && h.contains("みなし額面"))
            .or_else(|| find_column(&table.headers, &["みなし額面"]));
        let Some(factor_col) = revised_col else {
            continue;
        };
        let date_col = find_column(&table.headers, DATE_HEADERS);

        let mut rows = Vec::new();
        for row in &table.rows {
            let Some(code) = first_code(cell(row, Some(code_col))) else {
                continue;
            };
            let factor = factor_cell(cell(row, Some(factor_col)));
            if factor.is_empty() {
                return Err(ExtractError::Parse(format!("no revised factor for {}", code)));
            }
            rows.push(RawChange {
                removed_code: code.clone(),
                added_code: code,
                adjustment_factor: factor,
                effective_date_override: row_date(
                    &date_re,
                    cell(row, date_col),
                    published,
                    calendar,
                )?,
            });
        }
        return Ok(rows);
    }
    Err(split_error.unwrap_or(ExtractError::MissingTable("コード/みなし額面")))
}
