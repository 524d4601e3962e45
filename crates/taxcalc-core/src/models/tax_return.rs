//! The tax return aggregate root.

use serde::{Deserialize, Serialize};

use crate::models::{Credits, Deductions, Income, TaxpayerInfo};

/// A complete tax return as submitted to the engine.
///
/// Constructed by the caller and consumed read-only by the pipeline; the
/// engine never mutates it. The JSON projection of this type exists solely
/// for hashing/caching and the renderer handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReturn {
    pub tax_year: u16,
    pub taxpayer: TaxpayerInfo,
    pub income: Income,
    pub deductions: Deductions,
    pub credits: Credits,
}

impl TaxReturn {
    pub fn new(tax_year: u16, taxpayer: TaxpayerInfo) -> Self {
        Self {
            tax_year,
            taxpayer,
            income: Income::default(),
            deductions: Deductions::default(),
            credits: Credits::default(),
        }
    }

    pub fn with_income(mut self, income: Income) -> Self {
        self.income = income;
        self
    }

    pub fn with_deductions(mut self, deductions: Deductions) -> Self {
        self.deductions = deductions;
        self
    }

    pub fn with_credits(mut self, credits: Credits) -> Self {
        self.credits = credits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilingStatus;

    #[test]
    fn json_projection_round_trips() {
        let ret = TaxReturn::new(
            2025,
            TaxpayerInfo::new("Ada", "Lovelace", "123-45-6789", FilingStatus::Single),
        );
        let json = serde_json::to_string(&ret).unwrap();
        let back: TaxReturn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tax_year, 2025);
        assert_eq!(back.taxpayer.filing_status, FilingStatus::Single);
    }
}
