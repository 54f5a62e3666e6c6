use crate::error::GraphError;

/// Numpy-style bidirectional broadcast of two shapes.
pub fn broadcast_shapes(lhs: &[u32], rhs: &[u32]) -> Result<Vec<u32>, GraphError> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0u32; rank];
    for i in 0..rank {
        let l = dim_from_back(lhs, rank, i);
        let r = dim_from_back(rhs, rank, i);
        out[i] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(GraphError::IncompatibleShapes {
                    lhs: lhs.to_vec(),
                    rhs: rhs.to_vec(),
                });
            }
        };
    }
    Ok(out)
}

fn dim_from_back(shape: &[u32], rank: usize, i: usize) -> u32 {
    let offset = rank - shape.len();
    if i < offset { 1 } else { shape[i - offset] }
}

/// Resolve a possibly negative axis against `rank`.
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = rank as i64;
    let resolved = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&resolved).then_some(resolved as usize)
}

/// Output shape of a reduction over `axes`.
pub fn infer_reduce_shape(
    shape: &[u32],
    axes: &[usize],
    keep_dimensions: bool,
) -> Vec<u32> {
    shape
        .iter()
        .enumerate()
        .filter_map(|(axis, &dim)| {
            if !axes.contains(&axis) {
                Some(dim)
            } else if keep_dimensions {
                Some(1)
            } else {
                None
            }
        })
        .collect()
}
