//! The calculation pipeline: validate -> fingerprint -> cache lookup ->
//! compute -> cache store, with metrics and cooperative cancellation.

use std::sync::Arc;
use std::time::Instant;

use taxcalc_core::{Severity, TaxError, TaxResult, ValidationIssue};
use taxcalc_resilience::CancelToken;

use crate::cache::CalculationCache;
use crate::engine::{CalculationBreakdown, CalculationRequest, FederalTaxEngine};
use crate::fingerprint::fingerprint;
use crate::validation::{ValidationMode, Validator};

/// Per-calculation metrics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CalculationMetrics {
    pub cache_hit: bool,
    pub validation_errors: usize,
    pub validation_warnings: usize,
    pub latency_ms: u128,
    pub filing_status: String,
}

/// Pipeline output: never a thrown error for routine validation
/// outcomes.
#[derive(Debug, Clone)]
pub struct CalculationResult {
    pub success: bool,
    pub breakdown: Option<CalculationBreakdown>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validation_issues: Vec<ValidationIssue>,
    pub cache_hit: bool,
    pub metrics: Option<CalculationMetrics>,
}

impl CalculationResult {
    fn failure(errors: Vec<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            success: false,
            breakdown: None,
            errors,
            warnings: Vec::new(),
            validation_issues: issues,
            cache_hit: false,
            metrics: None,
        }
    }
}

/// Options for one execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub use_cache: bool,
    pub validate: bool,
    pub mode: ValidationMode,
    /// Identifier used to tag cache entries for invalidation.
    pub return_id: Option<String>,
    pub cancel: CancelToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            validate: true,
            mode: ValidationMode::Strict,
            return_id: None,
            cancel: CancelToken::new(),
        }
    }
}

/// The pipeline. Validator, engine, and cache are injected; there are no
/// process-global singletons.
pub struct CalculationPipeline {
    validator: Arc<dyn Validator>,
    engine: FederalTaxEngine,
    cache: Arc<dyn CalculationCache>,
}

impl CalculationPipeline {
    pub fn new(
        validator: Arc<dyn Validator>,
        engine: FederalTaxEngine,
        cache: Arc<dyn CalculationCache>,
    ) -> Self {
        Self {
            validator,
            engine,
            cache,
        }
    }

    /// Run a calculation.
    pub fn execute(
        &self,
        request: &CalculationRequest,
        options: &ExecuteOptions,
    ) -> CalculationResult {
        let start = Instant::now();
        let filing_status = request
            .tax_return
            .taxpayer
            .filing_status
            .as_str()
            .to_string();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut validation_issues = Vec::new();
        let mut validation_errors = 0;
        let mut validation_warnings = 0;

        // 1. Validation.
        if options.validate {
            let outcome = self.validator.validate(&request.tax_return);
            for issue in &outcome.issues {
                match issue.severity {
                    Severity::Error => {
                        errors.push(issue.message.clone());
                        validation_errors += 1;
                    }
                    Severity::Warning => {
                        warnings.push(issue.message.clone());
                        validation_warnings += 1;
                    }
                    Severity::Info => {}
                }
            }
            validation_issues = outcome.issues.clone();
            if !outcome.is_valid() && options.mode == ValidationMode::Strict {
                tracing::info!(
                    errors = validation_errors,
                    "validation failed in strict mode"
                );
                return CalculationResult::failure(errors, validation_issues);
            }
        }

        if options.cancel.is_cancelled() {
            return CalculationResult::failure(vec![TaxError::Cancelled.to_string()], Vec::new());
        }

        // 2. Fingerprint.
        let fp = match fingerprint(request) {
            Ok(fp) => fp,
            Err(e) => return CalculationResult::failure(vec![e.to_string()], validation_issues),
        };

        // 3. Cache lookup.
        if options.use_cache {
            if let Some(breakdown) = self.cache.get(&fp) {
                tracing::debug!(fingerprint = %fp, "calculation cache hit");
                let metrics = CalculationMetrics {
                    cache_hit: true,
                    validation_errors,
                    validation_warnings,
                    latency_ms: start.elapsed().as_millis(),
                    filing_status,
                };
                return CalculationResult {
                    success: true,
                    breakdown: Some(breakdown),
                    errors,
                    warnings,
                    validation_issues,
                    cache_hit: true,
                    metrics: Some(metrics),
                };
            }
        }

        if options.cancel.is_cancelled() {
            return CalculationResult::failure(vec![TaxError::Cancelled.to_string()], Vec::new());
        }

        // 4. Compute.
        let breakdown = match self.engine.calculate(request) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                errors.push(e.to_string());
                return CalculationResult {
                    success: false,
                    breakdown: None,
                    errors,
                    warnings,
                    validation_issues,
                    cache_hit: false,
                    metrics: None,
                };
            }
        };

        // 5. Cache store. A cancelled computation must not populate the
        // cache.
        if options.use_cache && !options.cancel.is_cancelled() {
            self.cache
                .put(&fp, options.return_id.as_deref(), &breakdown);
        }

        let metrics = CalculationMetrics {
            cache_hit: false,
            validation_errors,
            validation_warnings,
            latency_ms: start.elapsed().as_millis(),
            filing_status,
        };
        tracing::info!(
            latency_ms = metrics.latency_ms,
            cache_hit = false,
            "calculation complete"
        );

        CalculationResult {
            success: true,
            breakdown: Some(breakdown),
            errors,
            warnings,
            validation_issues,
            cache_hit: false,
            metrics: Some(metrics),
        }
    }

    /// Drop cached results for a return. Call when return data changes
    /// outside the fingerprinted request.
    pub fn invalidate(&self, return_id: &str) -> bool {
        self.cache.invalidate(return_id)
    }

    /// Pre-compute and cache a result for faster later access.
    pub fn warm(&self, request: &CalculationRequest, return_id: &str) -> TaxResult<bool> {
        let options = ExecuteOptions {
            validate: false,
            return_id: Some(return_id.to_string()),
            ..Default::default()
        };
        Ok(self.execute(request, &options).success)
    }
}
