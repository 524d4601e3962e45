//! Contracts for external collaborators.
//!
//! The core only defines these seams; rendering, AI narrative
//! generation, and OCR ingestion are implemented outside. The knowledge
//! client is always invoked through the retry and circuit-breaker
//! wrappers.

use std::sync::Arc;

use serde_json::Value;

use taxcalc_core::{TaxError, TaxResult};
use taxcalc_resilience::{retry, CancelToken, CircuitBreakerRegistry, RetryConfig};

/// Renders a finalized report payload. Must not mutate the content or
/// produce side effects visible to the core.
pub trait ReportRenderer: Send + Sync {
    /// Produce rendered bytes (PDF) or text (HTML/XML) for a version's
    /// content, optionally themed per tenant.
    fn render(&self, content: &Value, tenant_theme: Option<&str>) -> TaxResult<Vec<u8>>;
}

/// A completion from the AI/knowledge service.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
}

/// The AI/knowledge contract: a single completion call.
pub trait KnowledgeClient: Send + Sync {
    fn complete(&self, prompt: &str, provider: &str) -> TaxResult<Completion>;
}

/// Ingests an uploaded document and maps recognized fields. OCR and
/// field mapping live outside the core.
pub trait DocumentIngestion: Send + Sync {
    /// Returns recognized fields as a JSON object keyed by field path.
    fn extract_fields(&self, document_bytes: &[u8], document_kind: &str) -> TaxResult<Value>;
}

/// Knowledge client wrapper applying retry and a named circuit breaker.
pub struct ResilientKnowledgeClient<K: KnowledgeClient> {
    inner: K,
    registry: Arc<CircuitBreakerRegistry>,
    circuit_name: String,
    max_attempts: u32,
}

impl<K: KnowledgeClient> ResilientKnowledgeClient<K> {
    pub fn new(inner: K, registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            inner,
            registry,
            circuit_name: "knowledge".into(),
            max_attempts: 3,
        }
    }

    pub fn with_circuit_name(mut self, name: impl Into<String>) -> Self {
        self.circuit_name = name.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Complete with retry inside the circuit breaker. A rejected
    /// request (open circuit) surfaces immediately without consuming
    /// retry attempts.
    pub fn complete(
        &self,
        prompt: &str,
        provider: &str,
        cancel: &CancelToken,
    ) -> TaxResult<Completion> {
        let breaker = self.registry.get(&self.circuit_name);
        breaker.allow_request()?;
        let config = RetryConfig::immediate(self.max_attempts);
        let result = retry(&config, cancel, || self.inner.complete(prompt, provider));
        match &result {
            Ok(_) => breaker.record_success(),
            // Exhausted retries count as one failure of the underlying
            // kind, not as a RetryExhausted wrapper.
            Err(TaxError::RetryExhausted { last_error, .. }) => breaker.record_failure(last_error),
            Err(err) => breaker.record_failure(err),
        }
        result
    }
}
