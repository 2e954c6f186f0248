//! Mathematical operations that can be dispatched by name.

mod factorial;
mod fibonacci;
mod power;

pub use factorial::FactorialOperation;
pub use fibonacci::FibonacciOperation;
pub use power::PowerOperation;

use crate::domain::{MathValue, Parameters};
use shared::OperationError;

/// Capability contract every registered operation satisfies.
///
/// Implementations must be pure: the same parameters always give the same
/// result, otherwise cached results would be wrong.
pub trait Operation: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn validate(&self, parameters: &Parameters) -> Result<(), OperationError>;

    fn compute(&self, parameters: &Parameters) -> Result<MathValue, OperationError>;
}

/// Bounds that keep every built-in operation finite.
#[derive(Clone, Copy, Debug)]
pub struct OperationLimits {
    pub fibonacci_max_n: u64,
    /// Results whose magnitude reaches this value are rejected.
    pub magnitude_ceiling: f64,
}

impl OperationLimits {
    pub const DEFAULT_FIBONACCI_MAX_N: u64 = 1000;
    pub const DEFAULT_MAGNITUDE_CEILING: f64 = 1e308;
}

/// A ceiling that is not a finite positive number would switch the guards
/// off, so it is replaced by the largest finite `f64`.
pub(crate) fn usable_ceiling(ceiling: f64) -> f64 {
    if ceiling.is_finite() && ceiling > 0.0 {
        ceiling
    } else {
        f64::MAX
    }
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            fibonacci_max_n: Self::DEFAULT_FIBONACCI_MAX_N,
            magnitude_ceiling: Self::DEFAULT_MAGNITUDE_CEILING,
        }
    }
}
