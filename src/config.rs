//! Bridge configuration.
//!
//! Configuration is plain data, deserializable from whatever format the
//! embedder uses. The process-wide [`Bridge`](crate::Bridge) is configured
//! once through [`init_bridge`](crate::init_bridge); later calls are ignored.

use serde::{Deserialize, Serialize};

/// Default largest surface width or height accepted from host code
pub const DEFAULT_MAX_DIMENSION: i32 = 32767;

/// When the pixel view of a surface is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    /// At construction, so the external memory is charged up front.
    #[default]
    Eager,
    /// On the first `data()` request.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Largest width or height accepted by the surface constructor.
    pub max_dimension: i32,

    pub materialization: Materialization,

    /// Cap on the bytes charged to the accountant. A surface whose view
    /// would exceed it fails to construct.
    pub max_external_memory: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            materialization: Materialization::default(),
            max_external_memory: None,
        }
    }
}

impl BridgeConfig {
    pub fn with_max_dimension(mut self, max_dimension: i32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_materialization(mut self, materialization: Materialization) -> Self {
        self.materialization = materialization;
        self
    }

    pub fn with_max_external_memory(mut self, bytes: u64) -> Self {
        self.max_external_memory = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_dimension, DEFAULT_MAX_DIMENSION);
        assert_eq!(config.materialization, Materialization::Eager);
        assert_eq!(config.max_external_memory, None);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{ "materialization": "lazy", "max_external_memory": 4096 }"#)
                .unwrap();

        assert_eq!(config.max_dimension, DEFAULT_MAX_DIMENSION);
        assert_eq!(config.materialization, Materialization::Lazy);
        assert_eq!(config.max_external_memory, Some(4096));
    }
}
