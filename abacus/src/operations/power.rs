use super::{Operation, usable_ceiling};
use crate::domain::{MathValue, Parameters};
use num_bigint::BigInt;
use serde_json::Number;
use shared::OperationError;

/// `base ^ exponent`.
///
/// An integer base with a non-negative integer exponent is computed exactly;
/// everything else goes through `f64`.
#[derive(Debug, Clone)]
pub struct PowerOperation {
    ceiling: f64,
}

impl PowerOperation {
    pub const NAME: &'static str = "power";

    pub fn new(ceiling: f64) -> Self {
        Self {
            ceiling: usable_ceiling(ceiling),
        }
    }

    fn operands<'a>(
        &self,
        parameters: &'a Parameters,
    ) -> Result<(&'a Number, &'a Number), OperationError> {
        parameters.expect_only(&["base", "exponent"])?;
        Ok((parameters.number("base")?, parameters.number("exponent")?))
    }

    fn too_large() -> OperationError {
        OperationError::too_large("Result too large to compute")
    }

    fn exact(&self, base: i64, exponent: u64) -> Result<MathValue, OperationError> {
        match base {
            0 => return Ok(MathValue::from(if exponent == 0 { 1i64 } else { 0 })),
            1 => return Ok(MathValue::from(1i64)),
            -1 => return Ok(MathValue::from(if exponent % 2 == 0 { 1i64 } else { -1 })),
            _ => {}
        }

        let magnitude = (base.unsigned_abs() as f64).log10() * exponent as f64;
        if magnitude >= self.ceiling.log10() {
            return Err(Self::too_large());
        }
        let exponent = u32::try_from(exponent).map_err(|_| Self::too_large())?;

        Ok(MathValue::Integer(BigInt::from(base).pow(exponent)))
    }

    fn real(&self, base: f64, exponent: f64) -> Result<MathValue, OperationError> {
        if base == 0.0 && exponent < 0.0 {
            return Err(OperationError::invalid(
                "0 cannot be raised to a negative power",
            ));
        }
        if base < 0.0 && exponent.fract() != 0.0 {
            return Err(OperationError::invalid("Complex results are not supported"));
        }

        let result = base.powf(exponent);
        if result.is_nan() {
            return Err(OperationError::invalid("Result is not a real number"));
        }
        if !result.is_finite() || result.abs() >= self.ceiling {
            return Err(Self::too_large());
        }
        Ok(MathValue::Real(result))
    }
}

impl Operation for PowerOperation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), OperationError> {
        self.operands(parameters).map(|_| ())
    }

    fn compute(&self, parameters: &Parameters) -> Result<MathValue, OperationError> {
        let (base, exponent) = self.operands(parameters)?;

        if let (Some(base), Some(exponent)) = (base.as_i64(), exponent.as_u64()) {
            return self.exact(base, exponent);
        }

        match (base.as_f64(), exponent.as_f64()) {
            (Some(base), Some(exponent)) => self.real(base, exponent),
            _ => Err(OperationError::invalid("base and exponent must be numbers")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationLimits;
    use std::str::FromStr;

    fn power() -> PowerOperation {
        PowerOperation::new(OperationLimits::DEFAULT_MAGNITUDE_CEILING)
    }

    fn params(base: serde_json::Value, exponent: serde_json::Value) -> Parameters {
        Parameters::from_json(serde_json::json!({"base": base, "exponent": exponent})).unwrap()
    }

    #[test]
    fn test_integer_power_is_exact() {
        let result = power().compute(&params(2.into(), 10.into())).unwrap();
        assert_eq!(result, MathValue::from(1024u64));

        let result = power().compute(&params(2.into(), 100.into())).unwrap();
        assert_eq!(
            result,
            MathValue::Integer(BigInt::from_str("1267650600228229401496703205376").unwrap())
        );
    }

    #[test]
    fn test_trivial_bases() {
        assert_eq!(
            power().compute(&params(0.into(), 0.into())).unwrap(),
            MathValue::from(1i64)
        );
        assert_eq!(
            power().compute(&params((-1).into(), 7.into())).unwrap(),
            MathValue::from(-1i64)
        );
        assert_eq!(
            power().compute(&params(1.into(), 1_000_000_000u64.into())).unwrap(),
            MathValue::from(1i64)
        );
    }

    #[test]
    fn test_real_power() {
        let result = power().compute(&params(2.0.into(), 0.5.into())).unwrap();
        match result {
            MathValue::Real(v) => assert!((v - 2f64.sqrt()).abs() < 1e-12),
            other => panic!("expected a real result, got {:?}", other),
        }

        let result = power().compute(&params(2.into(), (-2).into())).unwrap();
        assert_eq!(result, MathValue::Real(0.25));
    }

    #[test]
    fn test_negative_base_fractional_exponent_is_invalid() {
        let err = power()
            .compute(&params((-8).into(), (1.0 / 3.0).into()))
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidArgument(_)));
    }

    #[test]
    fn test_zero_to_negative_power_is_invalid() {
        let err = power().compute(&params(0.into(), (-1).into())).unwrap_err();
        assert!(matches!(err, OperationError::InvalidArgument(_)));
    }

    #[test]
    fn test_overflow_is_too_large() {
        let err = power().compute(&params(10.into(), 400.into())).unwrap_err();
        assert!(matches!(err, OperationError::ResultTooLarge(_)));

        let err = power().compute(&params(10.0.into(), 400.0.into())).unwrap_err();
        assert!(matches!(err, OperationError::ResultTooLarge(_)));

        let err = power()
            .compute(&params(2.into(), 10_000_000_000u64.into()))
            .unwrap_err();
        assert!(matches!(err, OperationError::ResultTooLarge(_)));
    }

    #[test]
    fn test_validate_rejects_missing_and_extra_parameters() {
        let missing = Parameters::new().with("base", 2);
        assert!(power().validate(&missing).is_err());

        let extra = Parameters::new()
            .with("base", 2)
            .with("exponent", 2)
            .with("modulus", 7);
        assert!(power().validate(&extra).is_err());
    }

    #[test]
    fn test_unusable_ceiling_still_bounds_results() {
        for ceiling in [f64::INFINITY, f64::NAN, -1.0, 0.0] {
            let power = PowerOperation::new(ceiling);
            let err = power
                .compute(&params(3.into(), 2_000_000u64.into()))
                .unwrap_err();
            assert!(matches!(err, OperationError::ResultTooLarge(_)), "{ceiling}");

            let err = power.compute(&params(3.0.into(), 2_000_000.5.into())).unwrap_err();
            assert!(matches!(err, OperationError::ResultTooLarge(_)), "{ceiling}");

            assert_eq!(
                power.compute(&params(2.into(), 10.into())).unwrap(),
                MathValue::from(1024u64)
            );
        }
    }
}
