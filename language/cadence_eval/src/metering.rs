//! Computation and memory metering.
//!
//! Cancellation is cooperative: every value construction and field
//! access consumes at least one unit, and exceeding a limit raises a
//! fatal error that unwinds the whole transaction. The per-operation
//! weights are host policy; the gauge only counts.

use crate::errors::{EvalResult, RuntimeError};

/// What kind of allocation a memory charge pays for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MemoryKind {
    Primitive,
    String,
    Array,
    Dictionary,
    Composite,
    Reference,
    Capability,
    TypeValue,
}

/// The metered budget of one transaction.
#[derive(Debug, Default)]
pub struct MeterGauge {
    computation_used: u64,
    computation_limit: Option<u64>,
    memory_used: u64,
    memory_limit: Option<u64>,
}

impl MeterGauge {
    /// An unmetered gauge (no limits).
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_limits(computation: Option<u64>, memory: Option<u64>) -> Self {
        MeterGauge {
            computation_limit: computation,
            memory_limit: memory,
            ..Self::default()
        }
    }

    pub fn use_computation(&mut self, amount: u64) -> EvalResult<()> {
        self.computation_used = self.computation_used.saturating_add(amount);
        match self.computation_limit {
            Some(limit) if self.computation_used > limit => {
                Err(RuntimeError::ComputationLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    pub fn use_memory(&mut self, _kind: MemoryKind, amount: u64) -> EvalResult<()> {
        self.memory_used = self.memory_used.saturating_add(amount);
        match self.memory_limit {
            Some(limit) if self.memory_used > limit => {
                Err(RuntimeError::MemoryLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    pub fn computation_used(&self) -> u64 {
        self.computation_used
    }

    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computation_limit_enforced() {
        let mut gauge = MeterGauge::with_limits(Some(10), None);
        for _ in 0..10 {
            gauge.use_computation(1).unwrap();
        }
        let err = gauge.use_computation(1).unwrap_err();
        assert_eq!(err, RuntimeError::ComputationLimitExceeded { limit: 10 });
    }

    #[test]
    fn test_unlimited_gauge_counts() {
        let mut gauge = MeterGauge::unlimited();
        gauge.use_computation(1_000_000).unwrap();
        gauge.use_memory(MemoryKind::Array, 64).unwrap();
        assert_eq!(gauge.computation_used(), 1_000_000);
        assert_eq!(gauge.memory_used(), 64);
    }
}
