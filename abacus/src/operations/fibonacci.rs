use super::Operation;
use crate::domain::{MathValue, Parameters};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use shared::OperationError;

/// The nth Fibonacci number, computed bottom-up in O(n) additions.
#[derive(Debug, Clone)]
pub struct FibonacciOperation {
    max_n: u64,
}

impl FibonacciOperation {
    pub const NAME: &'static str = "fibonacci";

    pub fn new(max_n: u64) -> Self {
        Self { max_n }
    }

    fn position(&self, parameters: &Parameters) -> Result<u64, OperationError> {
        parameters.expect_only(&["n"])?;
        let n = parameters.non_negative_integer("n")?;
        if n > self.max_n {
            return Err(OperationError::invalid(format!(
                "Fibonacci position must not exceed {}",
                self.max_n
            )));
        }
        Ok(n)
    }
}

pub(crate) fn fibonacci(n: u64) -> BigUint {
    let (mut a, mut b) = (BigUint::zero(), BigUint::one());
    for _ in 0..n {
        let next = &a + &b;
        a = std::mem::replace(&mut b, next);
    }
    a
}

impl Operation for FibonacciOperation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), OperationError> {
        self.position(parameters).map(|_| ())
    }

    fn compute(&self, parameters: &Parameters) -> Result<MathValue, OperationError> {
        let n = self.position(parameters)?;
        Ok(MathValue::Integer(BigInt::from(fibonacci(n))))
    }
}
