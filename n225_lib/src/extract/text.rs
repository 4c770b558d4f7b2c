//! Free-text extraction: replacement notices and divisor notices.

use regex::Regex;

use super::{find_codes, ExtractError, RawChange, DEFAULT_FACTOR};
use crate::disambiguate::normalize_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Removed,
    Added,
}

const SECTION_KEYWORDS: &[(&str, Side)] = &[("除外", Side::Removed), ("採用", Side::Added)];

/// Pair removed and added codes found under 除外 / 採用 sections.
///
/// A section keyword applies to the rest of its line and to following lines
/// that start with a code, until the next keyword.
pub(super) fn replacement_rows(text: &str) -> Result<Vec<RawChange>, ExtractError> {
    let factor_re = Regex::new(r"みなし額面\s*:?\s*(\d+(?:\s*/\s*\d+)?)")
        .map_err(|e| ExtractError::Parse(format!("regex compile error: {}", e)))?;

    let normalized = normalize_width(text);
    let mut removed: Vec<String> = Vec::new();
    let mut added: Vec<(String, String)> = Vec::new();
    let mut pending: Option<Side> = None;

    for line in normalized.lines() {
        let segments = section_segments(line);
        if segments.is_empty() {
            let Some(side) = pending else { continue };
            if let Some((pos, code)) = find_codes(line).into_iter().next() {
                if is_list_item(&line[..pos]) {
                    push(side, code, line, &factor_re, &mut removed, &mut added);
                }
            }
            continue;
        }

        for (side, segment) in segments {
            if let Some((_, code)) = find_codes(segment).into_iter().next() {
                push(side, code, segment, &factor_re, &mut removed, &mut added);
            }
            pending = Some(side);
        }
    }

    if removed.len() != added.len() {
        return Err(ExtractError::UnpairedCodes {
            removed: removed.len(),
            added: added.len(),
        });
    }
    Ok(removed
        .into_iter()
        .zip(added)
        .map(|(removed_code, (added_code, adjustment_factor))| RawChange {
            removed_code,
            added_code,
            adjustment_factor,
            effective_date_override: None,
        })
        .collect())
}

fn push(
    side: Side,
    code: String,
    segment: &str,
    factor_re: &Regex,
    removed: &mut Vec<String>,
    added: &mut Vec<(String, String)>,
) {
    match side {
        Side::Removed => removed.push(code),
        Side::Added => {
            let factor = factor_re
                .captures(segment)
                .map(|cap| cap[1].split_whitespace().collect::<String>())
                .unwrap_or_else(|| DEFAULT_FACTOR.to_string());
            added.push((code, factor));
        }
    }
}

/// Split a line at each section keyword; text before the first keyword is dropped.
fn section_segments(line: &str) -> Vec<(Side, &str)> {
    let mut hits: Vec<(usize, Side)> = SECTION_KEYWORDS
        .iter()
        .flat_map(|(kw, side)| line.match_indices(kw).map(move |(pos, _)| (pos, *side)))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    hits.iter()
        .enumerate()
        .map(|(i, (start, side))| {
            let end = hits.get(i + 1).map_or(line.len(), |(next, _)| *next);
            (*side, &line[*start..end])
        })
        .collect()
}

fn is_list_item(prefix: &str) -> bool {
    prefix
        .chars()
        .all(|c| c.is_whitespace() || "・-*•()（）【】[]「」:".contains(c))
}

/// The announced divisor: the value after 変更後/新除数, else the first after 除数.
pub(super) fn divisor_value(text: &str) -> Result<f64, ExtractError> {
    let normalized = normalize_width(text);
    let patterns = [
        r"(?:変更後|新除数)[^\d]*?(\d[\d,]*\.\d+)",
        r"除数[^\d]*?(\d[\d,]*\.\d+)",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern)
            .map_err(|e| ExtractError::Parse(format!("regex compile error: {}", e)))?;
        if let Some(cap) = re.captures(&normalized) {
            let raw = cap[1].replace(',', "");
            return raw
                .parse::<f64>()
                .map_err(|_| ExtractError::Parse(format!("invalid divisor '{}'", &cap[1])));
        }
    }
    Err(ExtractError::MissingDivisor)
}
