use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float16,
    Float32,
    Int32,
    Uint32,
    Int8,
    Uint8,
    Int64,
    Uint64,
}

impl DataType {
    pub fn bytes_per_element(self) -> usize {
        match self {
            DataType::Float16 => 2,
            DataType::Float32 => 4,
            DataType::Int32 => 4,
            DataType::Uint32 => 4,
            DataType::Int8 => 1,
            DataType::Uint8 => 1,
            DataType::Int64 => 8,
            DataType::Uint64 => 8,
        }
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Float16 | DataType::Float32)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Int32 => "int32",
            DataType::Uint32 => "uint32",
            DataType::Int8 => "int8",
            DataType::Uint8 => "uint8",
            DataType::Int64 => "int64",
            DataType::Uint64 => "uint64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float16" | "f16" => Ok(DataType::Float16),
            "float32" | "f32" => Ok(DataType::Float32),
            "int32" => Ok(DataType::Int32),
            "uint32" => Ok(DataType::Uint32),
            "int8" => Ok(DataType::Int8),
            "uint8" => Ok(DataType::Uint8),
            "int64" => Ok(DataType::Int64),
            "uint64" => Ok(DataType::Uint64),
            _ => Err(GraphError::ParseValue {
                kind: "data type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandDescriptor {
    pub data_type: DataType,
    #[serde(default)]
    pub shape: Vec<u32>,
}

impl OperandDescriptor {
    pub fn new(data_type: DataType, shape: &[u32]) -> Self {
        Self {
            data_type,
            shape: shape.to_vec(),
        }
    }

    pub fn scalar(data_type: DataType) -> Self {
        Self {
            data_type,
            shape: Vec::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape_usize(&self) -> Vec<usize> {
        self.shape.iter().map(|&d| d as usize).collect()
    }

    pub fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim as usize))
    }

    pub fn byte_length(&self) -> Option<usize> {
        let elements = self.element_count()?;
        elements.checked_mul(self.data_type.bytes_per_element())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    Input,
    Constant,
    Output,
    Intermediate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    pub descriptor: OperandDescriptor,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub input_operands: Vec<u32>,
    pub output_operand: u32,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub label: Option<String>,
}

impl Operation {
    pub fn display_name(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.op_type.clone())
    }

    /// Integer list attribute such as `axes`.
    pub fn attr_i64_list(&self, key: &str) -> Option<Vec<i64>> {
        self.attributes
            .get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_i64())
            .collect()
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key)?.as_bool()
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        let v = self.attributes.get(key)?;
        if let Some(n) = v.as_f64() {
            return Some(n);
        }
        match v.as_str()?.trim().to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
            "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
            other => other.parse::<f64>().ok(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantData {
    #[serde_as(as = "Base64")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInfo {
    pub operands: Vec<Operand>,
    #[serde(default)]
    pub input_operands: Vec<u32>,
    #[serde(default)]
    pub output_operands: Vec<u32>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub constant_operand_ids_to_handles: HashMap<u32, ConstantData>,
}

impl GraphInfo {
    pub fn operand(&self, id: u32) -> Option<&Operand> {
        self.operands.get(id as usize)
    }

    pub fn operand_or_err(&self, id: u32, context: &str) -> Result<&Operand, GraphError> {
        self.operand(id)
            .ok_or_else(|| GraphError::InvalidOperandReference {
                context: context.to_string(),
                operand: id,
            })
    }

    /// Name used for an operand in tensor maps: the declared name, or
    /// `operand_<id>` for anonymous intermediates.
    pub fn operand_name(&self, id: u32) -> String {
        self.operand(id)
            .and_then(|op| op.name.clone())
            .unwrap_or_else(|| format!("operand_{id}"))
    }

    pub fn count_operations(&self, op_type: &str) -> usize {
        self.operations
            .iter()
            .filter(|op| op.op_type == op_type)
            .count()
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, GraphError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
