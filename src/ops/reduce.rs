use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Max,
    Min,
}

impl ReduceOp {
    pub fn from_op_type(op_type: &str) -> Option<Self> {
        match op_type {
            "reduceMax" => Some(ReduceOp::Max),
            "reduceMin" => Some(ReduceOp::Min),
            _ => None,
        }
    }

    fn identity(self) -> f32 {
        match self {
            ReduceOp::Max => f32::NEG_INFINITY,
            ReduceOp::Min => f32::INFINITY,
        }
    }

    fn combine(self, acc: f32, x: f32) -> f32 {
        if acc.is_nan() || x.is_nan() {
            return f32::NAN;
        }
        match self {
            ReduceOp::Max => acc.max(x),
            ReduceOp::Min => acc.min(x),
        }
    }
}

/// Reduce `input` over the already-normalized `axes`.
pub fn reduce(
    op: ReduceOp,
    input: &[f32],
    shape: &[usize],
    axes: &[usize],
    keep_dimensions: bool,
) -> Result<(Vec<f32>, Vec<usize>), GraphError> {
    if let Some(&axis) = axes.iter().find(|&&axis| axis >= shape.len()) {
        return Err(GraphError::invalid_operation(
            "reduce",
            format!("axis {axis} out of range for rank {}", shape.len()),
        ));
    }

    let kept: Vec<usize> = shape
        .iter()
        .enumerate()
        .map(|(axis, &dim)| if axes.contains(&axis) { 1 } else { dim })
        .collect();
    let mut strides = vec![0usize; shape.len()];
    let mut acc = 1usize;
    for axis in (0..shape.len()).rev() {
        strides[axis] = if axes.contains(&axis) { 0 } else { acc };
        acc *= kept[axis];
    }

    let mut out = vec![op.identity(); acc];
    let mut index = vec![0usize; shape.len()];
    let mut offset = 0usize;
    for &x in input {
        out[offset] = op.combine(out[offset], x);
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < shape[axis] {
                break;
            }
            offset -= strides[axis] * index[axis];
            index[axis] = 0;
        }
    }

    let out_shape = if keep_dimensions {
        kept
    } else {
        shape
            .iter()
            .enumerate()
            .filter(|(axis, _)| !axes.contains(axis))
            .map(|(_, &dim)| dim)
            .collect()
    };
    Ok((out, out_shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_last_axis_keeping_dims() {
        let input = [0.1, 0.9, 0.5, 0.3, 0.2, 0.8];
        let (out, shape) = reduce(ReduceOp::Max, &input, &[2, 3], &[1], true).unwrap();
        assert_eq!(shape, vec![2, 1]);
        assert_eq!(out, vec![0.9, 0.8]);

        let (out, shape) = reduce(ReduceOp::Min, &input, &[2, 3], &[1], false).unwrap();
        assert_eq!(shape, vec![2]);
        assert_eq!(out, vec![0.1, 0.2]);
    }

    #[test]
    fn reduces_leading_axis() {
        let input = [1.0, 5.0, 3.0, 4.0, 2.0, 6.0];
        let (out, shape) = reduce(ReduceOp::Max, &input, &[2, 3], &[0], true).unwrap();
        assert_eq!(shape, vec![1, 3]);
        assert_eq!(out, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn propagates_nan() {
        let (out, _) = reduce(ReduceOp::Min, &[0.5, f32::NAN, 0.1], &[3], &[0], false).unwrap();
        assert!(out[0].is_nan());
    }

    #[test]
    fn rejects_axis_out_of_range() {
        assert!(reduce(ReduceOp::Max, &[0.0; 3], &[3], &[1], true).is_err());
    }
}
