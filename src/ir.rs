//! Versioned envelope around a converted graph.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::GraphInfo;

pub const SUPPORTED_IR_VERSIONS: &[u32] = &[10, 11];
pub const DEFAULT_IR_VERSION: u32 = 11;

pub fn check_ir_version(version: u32) -> Result<(), GraphError> {
    if SUPPORTED_IR_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(GraphError::UnsupportedIrVersion {
            version,
            supported: SUPPORTED_IR_VERSIONS.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModel {
    pub ir_version: u32,
    /// Name of the converter that produced this model.
    pub format: String,
    pub graph: GraphInfo,
}

impl IrModel {
    pub fn new(ir_version: u32, format: &str, graph: GraphInfo) -> Result<Self, GraphError> {
        check_ir_version(ir_version)?;
        Ok(Self {
            ir_version,
            format: format.to_string(),
            graph,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        let model: IrModel = serde_json::from_slice(bytes)?;
        check_ir_version(model.ir_version)?;
        Ok(model)
    }
}
