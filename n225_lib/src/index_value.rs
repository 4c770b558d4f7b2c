//! Price-weighted index value over a membership snapshot.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::factor::{evaluate_factor, FactorError};
use crate::replay::ReplayError;
use crate::types::MembershipSnapshot;

/// Par-value scaling constant of the price-weighted formula.
pub const PAR_VALUE: f64 = 50.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexValueError {
    #[error("no price for member {code} as of {as_of}")]
    MissingPrice { code: String, as_of: NaiveDate },
    #[error("bad adjustment factor for {code}: {source}")]
    Factor {
        code: String,
        #[source]
        source: FactorError,
    },
    #[error("divisor as of {0} is zero")]
    ZeroDivisor(NaiveDate),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// `sum(price * 50 / factor) / divisor` over every current member.
pub fn compute_index_value(
    snapshot: &MembershipSnapshot,
    prices: &HashMap<String, f64>,
) -> Result<f64, IndexValueError> {
    if snapshot.divisor == 0.0 {
        return Err(IndexValueError::ZeroDivisor(snapshot.as_of));
    }

    let mut total = 0.0;
    for (code, factor) in &snapshot.members {
        let price = prices.get(code).ok_or_else(|| IndexValueError::MissingPrice {
            code: code.clone(),
            as_of: snapshot.as_of,
        })?;
        let factor = evaluate_factor(factor).map_err(|source| IndexValueError::Factor {
            code: code.clone(),
            source,
        })?;
        total += price * PAR_VALUE / factor;
    }
    Ok(total / snapshot.divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn snapshot(divisor: f64, members: &[(&str, &str)]) -> MembershipSnapshot {
        MembershipSnapshot {
            as_of: NaiveDate::from_ymd_opt(2021, 10, 1).unwrap(),
            divisor,
            members: members
                .iter()
                .map(|(c, f)| (c.to_string(), f.to_string()))
                .collect(),
        }
    }

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(c, p)| (c.to_string(), *p)).collect()
    }

    #[test]
    fn test_two_member_value() {
        let snap = snapshot(100.0, &[("A", "50"), ("B", "50")]);
        let value = compute_index_value(&snap, &prices(&[("A", 100.0), ("B", 200.0)])).unwrap();
        assert!((value - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_ratio_factor_weighting() {
        // 1000 * 50 / 12.5 = 4000
        let snap = snapshot(10.0, &[("7203", "50/4")]);
        let value = compute_index_value(&snap, &prices(&[("7203", 1000.0)])).unwrap();
        assert!((value - 400.0).abs() < EPSILON);
    }

    #[test]
    fn test_extra_prices_ignored() {
        let snap = snapshot(1.0, &[("A", "50")]);
        let value = compute_index_value(&snap, &prices(&[("A", 10.0), ("Z", 999.0)])).unwrap();
        assert!((value - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_missing_price() {
        let snap = snapshot(100.0, &[("A", "50"), ("B", "50")]);
        let err = compute_index_value(&snap, &prices(&[("A", 100.0)])).unwrap_err();
        assert!(matches!(err, IndexValueError::MissingPrice { ref code, .. } if code == "B"));
    }

    #[test]
    fn test_zero_divisor() {
        let snap = snapshot(0.0, &[("A", "50")]);
        assert!(matches!(
            compute_index_value(&snap, &prices(&[("A", 1.0)])),
            Err(IndexValueError::ZeroDivisor(_))
        ));
    }
}
