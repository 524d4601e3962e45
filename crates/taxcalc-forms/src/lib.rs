//! # taxcalc-forms
//!
//! Form-level numerical models. Each form is a self-contained computation
//! with typed inputs producing a deterministic result struct plus a compact
//! summary; forms hold no references to the engine or pipeline.
//!
//! Cross-form ordering (AMT after regular tax and itemized data, MTC after
//! AMT, FTC after total tax before credits, PAL before AGI-dependent items)
//! is the responsibility of the calling engine.

pub mod entity_optimizer;
pub mod form_982;
pub mod form_1116;
pub mod form_5329;
pub mod form_5471;
pub mod form_5884;
pub mod form_6251;
pub mod form_8582;
pub mod form_8606;
pub mod form_8801;
pub mod form_8814;
pub mod form_8863;
pub mod schedule_1;
