use std::fs;
use std::path::Path;

use crate::error::GraphError;
use crate::graph::GraphInfo;
use crate::ir::IrModel;

/// Load a WebNN graph description from a `.json` file.
pub fn load_graph_from_path(path: &Path) -> Result<GraphInfo, GraphError> {
    let bytes = fs::read(path).map_err(|err| GraphError::io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|source| GraphError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a converted model and check its IR version.
pub fn load_ir_model_from_path(path: &Path) -> Result<IrModel, GraphError> {
    let bytes = fs::read(path).map_err(|err| GraphError::io(path, err))?;
    IrModel::from_bytes(&bytes)
}

pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), GraphError> {
    fs::write(path, bytes).map_err(|err| GraphError::export(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::{DataType, OperandDescriptor};

    #[test]
    fn graph_survives_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = GraphBuilder::new();
        let x = builder
            .input("images", OperandDescriptor::new(DataType::Float32, &[5, 5, 3]))
            .unwrap();
        let s = builder
            .input("scale", OperandDescriptor::scalar(DataType::Float32))
            .unwrap();
        let y = builder.adjust_saturation(x, s).unwrap();
        let graph = builder.build(&[("output", y)]).unwrap();

        let path = dir.path().join("model.webnn.json");
        write_artifact(&path, &graph.to_json_bytes().unwrap()).unwrap();
        let loaded = load_graph_from_path(&path).unwrap();
        assert_eq!(loaded.operations.len(), 1);
        assert_eq!(loaded.operand_name(0), "images");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_graph_from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, GraphError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        write_artifact(&path, b"{\"operands\": [").unwrap();
        let err = load_graph_from_path(&path).unwrap_err();
        assert!(matches!(err, GraphError::Parse { .. }));
    }

    #[test]
    fn write_into_missing_directory_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_artifact(&dir.path().join("nope").join("x.json"), b"{}").unwrap_err();
        assert!(matches!(err, GraphError::Export { .. }));
    }
}
