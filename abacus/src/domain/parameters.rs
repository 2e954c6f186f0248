use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use shared::OperationError;
use std::collections::BTreeMap;

/// Named numeric inputs of an operation, kept sorted by name so that
/// serialization is canonical regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Number>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Number) -> Option<Number> {
        self.0.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Number>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Add a floating point parameter; NaN and infinities are rejected.
    pub fn with_real(
        mut self,
        name: impl Into<String>,
        value: f64,
    ) -> Result<Self, OperationError> {
        let name = name.into();
        let number = Number::from_f64(value).ok_or_else(|| {
            OperationError::invalid(format!("parameter '{}' must be a finite number", name))
        })?;
        self.insert(name, number);
        Ok(self)
    }

    /// Accept a JSON object whose values are all numbers.
    pub fn from_json(value: Value) -> Result<Self, OperationError> {
        let Value::Object(map) = value else {
            return Err(OperationError::invalid("parameters must be a JSON object"));
        };

        let mut parameters = Self::new();
        for (name, value) in map {
            match value {
                Value::Number(number) => {
                    parameters.insert(name, number);
                }
                _ => {
                    return Err(OperationError::invalid(format!(
                        "parameter '{}' must be a number",
                        name
                    )));
                }
            }
        }
        Ok(parameters)
    }

    pub fn get(&self, name: &str) -> Option<&Number> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Number)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON with keys in sorted order.
    pub fn canonical_json(&self) -> String {
        self.to_json().to_string()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, number)| (name.clone(), Value::Number(number.clone())))
            .collect();
        Value::Object(map)
    }

    pub fn number(&self, name: &str) -> Result<&Number, OperationError> {
        self.get(name)
            .ok_or_else(|| OperationError::invalid(format!("missing parameter '{}'", name)))
    }

    /// A parameter that must be a non-negative integer.
    pub fn non_negative_integer(&self, name: &str) -> Result<u64, OperationError> {
        let number = self.number(name)?;
        if let Some(value) = number.as_u64() {
            return Ok(value);
        }
        if number.as_i64().is_some() {
            return Err(OperationError::invalid(format!(
                "parameter '{}' must be non-negative",
                name
            )));
        }
        Err(OperationError::invalid(format!(
            "parameter '{}' must be an integer",
            name
        )))
    }

    /// Reject any parameter outside `allowed`.
    pub fn expect_only(&self, allowed: &[&str]) -> Result<(), OperationError> {
        match self.0.keys().find(|name| !allowed.contains(&name.as_str())) {
            Some(name) => Err(OperationError::invalid(format!(
                "unexpected parameter '{}'",
                name
            ))),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, Number)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, Number)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
