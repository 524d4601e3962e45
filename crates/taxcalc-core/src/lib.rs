//! # taxcalc-core
//!
//! Core domain models and primitives for individual tax computation:
//! - `Money` fixed-point decimal arithmetic with explicit rounding points
//! - Deterministic canonical-JSON content hashing (SHA-256)
//! - The 2025 year-constant table addressed by (tax_year, filing_status)
//! - Tax return domain models (taxpayer, income, deductions, credits)
//! - Carryover records with FIFO consumption by origin year
//! - The error taxonomy shared by the engine, pipeline, and stores

pub mod error;
pub mod hashing;
pub mod models;
pub mod money;
pub mod year;

pub use error::*;
pub use hashing::*;
pub use models::*;
pub use money::*;
pub use year::*;
