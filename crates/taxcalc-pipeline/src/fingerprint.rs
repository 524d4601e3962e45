//! Cache fingerprinting over the normalized request projection.

use taxcalc_core::{content_hash, TaxError, TaxResult};

use crate::engine::CalculationRequest;

/// Deterministic fingerprint for a calculation request: the normalized
/// JSON projection of the return, attached form inputs, and prior-year
/// carryovers. Equal fingerprints must yield identical computation.
pub fn fingerprint(request: &CalculationRequest) -> TaxResult<String> {
    let projection =
        serde_json::to_value(request).map_err(|e| TaxError::Serialization(e.to_string()))?;
    Ok(content_hash(&projection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxcalc_core::{FilingStatus, Money, PriorYearCarryovers, TaxReturn, TaxpayerInfo};

    fn sample() -> CalculationRequest {
        CalculationRequest::new(TaxReturn::new(
            2025,
            TaxpayerInfo::new("Ada", "Lovelace", "123-45-6789", FilingStatus::Single),
        ))
    }

    #[test]
    fn equal_inputs_equal_fingerprints() {
        assert_eq!(
            fingerprint(&sample()).unwrap(),
            fingerprint(&sample()).unwrap()
        );
    }

    #[test]
    fn any_field_change_changes_fingerprint() {
        let base = fingerprint(&sample()).unwrap();
        let mut changed = sample();
        changed.tax_return.income.interest_income = Money::from_cents(1);
        assert_ne!(base, fingerprint(&changed).unwrap());
    }

    #[test]
    fn carryovers_participate_in_fingerprint() {
        let without = fingerprint(&sample()).unwrap();
        let mut with_carry = sample();
        with_carry.prior_year_carryovers = Some(PriorYearCarryovers {
            nol_carryover: Money::from_dollars(5_000),
            ..Default::default()
        });
        assert_ne!(without, fingerprint(&with_carry).unwrap());
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint(&sample()).unwrap();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
