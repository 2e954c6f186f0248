use super::{Operation, usable_ceiling};
use crate::domain::{MathValue, Parameters};
use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, One};
use shared::OperationError;

/// `n!` by iterative multiplication, refusing to grow past a magnitude
/// ceiling.
#[derive(Debug, Clone)]
pub struct FactorialOperation {
    ceiling: BigUint,
}

impl FactorialOperation {
    pub const NAME: &'static str = "factorial";

    pub fn new(ceiling: f64) -> Self {
        let ceiling = BigUint::from_f64(usable_ceiling(ceiling)).unwrap_or_default();
        Self { ceiling }
    }

    fn input(&self, parameters: &Parameters) -> Result<u64, OperationError> {
        parameters.expect_only(&["n"])?;
        parameters.non_negative_integer("n")
    }
}

impl Operation for FactorialOperation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), OperationError> {
        self.input(parameters).map(|_| ())
    }

    fn compute(&self, parameters: &Parameters) -> Result<MathValue, OperationError> {
        let n = self.input(parameters)?;

        let mut product = BigUint::one();
        for i in 2..=n {
            product *= i;
            if product >= self.ceiling {
                return Err(OperationError::too_large("Factorial result too large"));
            }
        }
        Ok(MathValue::Integer(BigInt::from(product)))
    }
}
