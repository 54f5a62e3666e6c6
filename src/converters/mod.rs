use std::collections::HashMap;

use crate::error::GraphError;
use crate::graph::GraphInfo;
use crate::ir::{IrModel, check_ir_version};

mod decompose;
mod webnn;

pub use decompose::DecomposeConverter;
pub use webnn::WebnnConverter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub ir_version: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            ir_version: crate::ir::DEFAULT_IR_VERSION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedGraph {
    pub format: &'static str,
    pub content_type: &'static str,
    pub ir_version: u32,
    pub data: Vec<u8>,
}

impl ConvertedGraph {
    /// File name used when the artifact is written next to the source graph.
    pub fn file_name(&self) -> String {
        format!("model.{}.ir.json", self.format)
    }

    pub fn to_model(&self) -> Result<IrModel, GraphError> {
        IrModel::from_bytes(&self.data)
    }
}

/// A frontend that ingests a WebNN graph and emits an IR model.
pub trait GraphConverter {
    fn format(&self) -> &'static str;

    fn lower(&self, graph: &GraphInfo) -> Result<GraphInfo, GraphError>;

    fn convert(
        &self,
        graph: &GraphInfo,
        options: &ConvertOptions,
    ) -> Result<ConvertedGraph, GraphError> {
        check_ir_version(options.ir_version)?;
        let lowered = self.lower(graph)?;
        let model = IrModel::new(options.ir_version, self.format(), lowered)?;
        Ok(ConvertedGraph {
            format: self.format(),
            content_type: "application/json",
            ir_version: options.ir_version,
            data: model.to_bytes()?,
        })
    }
}

pub struct ConverterRegistry {
    converters: HashMap<&'static str, Box<dyn GraphConverter + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WebnnConverter));
        registry.register(Box::new(DecomposeConverter));
        registry
    }

    pub fn register(&mut self, converter: Box<dyn GraphConverter + Send + Sync>) {
        self.converters.insert(converter.format(), converter);
    }

    pub fn formats(&self) -> Vec<&'static str> {
        let mut formats: Vec<_> = self.converters.keys().copied().collect();
        formats.sort_unstable();
        formats
    }

    pub fn convert(
        &self,
        format: &str,
        graph: &GraphInfo,
        options: &ConvertOptions,
    ) -> Result<ConvertedGraph, GraphError> {
        let converter =
            self.converters
                .get(format)
                .ok_or_else(|| GraphError::UnknownConverter {
                    format: format.to_string(),
                })?;
        converter.convert(graph, options)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Frontend selected by the legacy flag.
pub fn frontend_format(use_legacy_frontend: bool) -> &'static str {
    if use_legacy_frontend {
        WebnnConverter::FORMAT
    } else {
        DecomposeConverter::FORMAT
    }
}
