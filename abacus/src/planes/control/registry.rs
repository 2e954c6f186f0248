use crate::operations::{
    FactorialOperation, FibonacciOperation, Operation, OperationLimits, PowerOperation,
};
use shared::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

/// OperationRegistry is the single source of truth for which operations exist
#[derive(Clone, Default)]
pub struct OperationRegistry {
    // Maps operation name -> implementation, ordered by name
    operations: Arc<RwLock<BTreeMap<String, Arc<dyn Operation>>>>,
}

impl Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &"<RwLock<BTreeMap>>")
            .finish()
    }
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding power, fibonacci and factorial
    pub fn with_builtins(limits: OperationLimits) -> Self {
        let builtins: [Arc<dyn Operation>; 3] = [
            Arc::new(PowerOperation::new(limits.magnitude_ceiling)),
            Arc::new(FibonacciOperation::new(limits.fibonacci_max_n)),
            Arc::new(FactorialOperation::new(limits.magnitude_ceiling)),
        ];

        let operations: BTreeMap<String, Arc<dyn Operation>> = builtins
            .into_iter()
            .map(|operation| (operation.name().to_string(), operation))
            .collect();

        Self {
            operations: Arc::new(RwLock::new(operations)),
        }
    }

    /// Add an operation, replacing any previous one with the same name
    pub async fn register(&self, operation: Arc<dyn Operation>) -> Option<Arc<dyn Operation>> {
        let name = operation.name().to_string();
        let replaced = self
            .operations
            .write()
            .await
            .insert(name.clone(), operation);

        tracing::info!("Registered operation: {}", name);
        replaced
    }

    /// Look an operation up by name
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Operation>> {
        let operations = self.operations.read().await;
        operations
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    /// Registered names in sorted order
    pub async fn names(&self) -> Vec<String> {
        self.operations.read().await.keys().cloned().collect()
    }
}
