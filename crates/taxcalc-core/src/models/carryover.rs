//! Aged carryover balances with FIFO consumption.
//!
//! FTC carryovers, minimum-tax-credit carryforwards, and suspended passive
//! losses all share the same shape: an origin year, an original amount, and
//! a used amount; consumption always drains the oldest origin year first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A single origin-year balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryoverRecord {
    pub origin_year: u16,
    pub original_amount: Money,
    #[serde(default)]
    pub used_amount: Money,
}

impl CarryoverRecord {
    pub fn new(origin_year: u16, original_amount: Money) -> Self {
        Self {
            origin_year,
            original_amount,
            used_amount: Money::ZERO,
        }
    }

    pub fn remaining(&self) -> Money {
        self.original_amount.saturating_sub(self.used_amount)
    }

    /// Consume up to `amount`; returns what was actually used.
    pub fn consume(&mut self, amount: Money) -> Money {
        let used = amount.min(self.remaining()).floor_zero();
        self.used_amount += used;
        used
    }

    /// Whether the record is still usable in `current_year` given a
    /// carryforward window (None = indefinite).
    pub fn is_live(&self, current_year: u16, max_years: Option<u8>) -> bool {
        if self.remaining().is_zero() {
            return false;
        }
        match max_years {
            Some(max) => current_year.saturating_sub(self.origin_year) <= u16::from(max),
            None => true,
        }
    }
}

/// Drain records oldest-first until `capacity` or the pool is exhausted.
/// Expired records are skipped. Returns the total consumed.
pub fn consume_fifo(
    records: &mut [CarryoverRecord],
    capacity: Money,
    current_year: u16,
    max_years: Option<u8>,
) -> Money {
    let mut remaining_capacity = capacity.floor_zero();
    let mut consumed = Money::ZERO;

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| records[i].origin_year);

    for i in order {
        if remaining_capacity.is_zero() {
            break;
        }
        if !records[i].is_live(current_year, max_years) {
            continue;
        }
        let used = records[i].consume(remaining_capacity);
        consumed += used;
        remaining_capacity -= used;
    }
    consumed
}

/// Prior-year state handed to the pipeline alongside a tax return.
///
/// Baskets and activities are string-keyed so the snapshot stays decoupled
/// from the form crates that interpret them (FTC basket tags, passive
/// activity ids).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorYearCarryovers {
    /// Suspended passive losses by activity id.
    #[serde(default)]
    pub suspended_passive_losses: BTreeMap<String, Money>,
    /// FTC carryovers by basket tag.
    #[serde(default)]
    pub ftc_carryovers: BTreeMap<String, Vec<CarryoverRecord>>,
    /// Minimum tax credit carryforwards (indefinite).
    #[serde(default)]
    pub mtc_carryforwards: Vec<CarryoverRecord>,
    /// Traditional IRA basis from prior Form 8606 filings.
    #[serde(default)]
    pub ira_basis: Money,
    #[serde(default)]
    pub capital_loss_carryover: Money,
    #[serde(default)]
    pub nol_carryover: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: u16, amount: i64) -> CarryoverRecord {
        CarryoverRecord::new(year, Money::from_dollars(amount))
    }

    #[test]
    fn fifo_drains_oldest_first() {
        let mut records = vec![rec(2022, 500), rec(2019, 300), rec(2020, 400)];
        let used = consume_fifo(&mut records, Money::from_dollars(600), 2025, Some(10));
        assert_eq!(used, Money::from_dollars(600));
        // 2019 fully consumed, 2020 partially, 2022 untouched
        assert_eq!(records[1].remaining(), Money::ZERO);
        assert_eq!(records[2].remaining(), Money::from_dollars(100));
        assert_eq!(records[0].remaining(), Money::from_dollars(500));
    }

    #[test]
    fn expired_records_are_skipped() {
        let mut records = vec![rec(2014, 300), rec(2020, 400)];
        let used = consume_fifo(&mut records, Money::from_dollars(1_000), 2025, Some(10));
        assert_eq!(used, Money::from_dollars(400));
        assert_eq!(records[0].remaining(), Money::from_dollars(300));
    }

    #[test]
    fn indefinite_window_never_expires() {
        let mut records = vec![rec(1999, 250)];
        let used = consume_fifo(&mut records, Money::from_dollars(100), 2025, None);
        assert_eq!(used, Money::from_dollars(100));
        assert_eq!(records[0].remaining(), Money::from_dollars(150));
    }

    #[test]
    fn conservation_original_equals_used_plus_remaining() {
        let mut records = vec![rec(2021, 777), rec(2023, 333)];
        consume_fifo(&mut records, Money::from_dollars(900), 2025, Some(10));
        for r in &records {
            assert_eq!(r.original_amount, r.used_amount + r.remaining());
        }
    }

    #[test]
    fn consume_never_goes_negative() {
        let mut r = rec(2024, 100);
        assert_eq!(r.consume(Money::from_dollars(-50)), Money::ZERO);
        assert_eq!(r.remaining(), Money::from_dollars(100));
    }
}
