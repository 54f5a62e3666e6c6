use crate::error::GraphError;
use crate::shape_inference::broadcast_shapes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Mul,
    Div,
    Min,
    Greater,
}

impl BinaryOp {
    pub fn from_op_type(op_type: &str) -> Option<Self> {
        match op_type {
            "sub" => Some(BinaryOp::Sub),
            "mul" => Some(BinaryOp::Mul),
            "div" => Some(BinaryOp::Div),
            "min" => Some(BinaryOp::Min),
            "greater" => Some(BinaryOp::Greater),
            _ => None,
        }
    }

    fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Min => {
                if a.is_nan() || b.is_nan() {
                    f32::NAN
                } else {
                    a.min(b)
                }
            }
            BinaryOp::Greater => {
                if a > b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

pub(crate) fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, GraphError> {
    let lhs: Vec<u32> = lhs.iter().map(|&d| d as u32).collect();
    let rhs: Vec<u32> = rhs.iter().map(|&d| d as u32).collect();
    Ok(broadcast_shapes(&lhs, &rhs)?
        .into_iter()
        .map(|d| d as usize)
        .collect())
}

/// For every element of `out_shape`, the linear offset of the element of a
/// tensor shaped `in_shape` that broadcasts onto it.
pub(crate) fn broadcast_offsets(in_shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let rank = out_shape.len();
    let pad = rank - in_shape.len();
    let mut strides = vec![0usize; rank];
    let mut acc = 1usize;
    for axis in (0..in_shape.len()).rev() {
        strides[axis + pad] = if in_shape[axis] == 1 { 0 } else { acc };
        acc *= in_shape[axis];
    }

    let total: usize = out_shape.iter().product();
    let mut offsets = Vec::with_capacity(total);
    let mut index = vec![0usize; rank];
    let mut offset = 0usize;
    for _ in 0..total {
        offsets.push(offset);
        for axis in (0..rank).rev() {
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < out_shape[axis] {
                break;
            }
            offset -= strides[axis] * index[axis];
            index[axis] = 0;
        }
    }
    offsets
}

pub fn binary(
    op: BinaryOp,
    a: &[f32],
    a_shape: &[usize],
    b: &[f32],
    b_shape: &[usize],
) -> Result<(Vec<f32>, Vec<usize>), GraphError> {
    let out_shape = broadcast_shape(a_shape, b_shape)?;
    let a_offsets = broadcast_offsets(a_shape, &out_shape);
    let b_offsets = broadcast_offsets(b_shape, &out_shape);
    let out = a_offsets
        .iter()
        .zip(&b_offsets)
        .map(|(&i, &j)| op.apply(a[i], b[j]))
        .collect();
    Ok((out, out_shape))
}

/// Clamp that propagates NaN instead of replacing it.
pub fn clamp(input: &[f32], min_value: f32, max_value: f32) -> Result<Vec<f32>, GraphError> {
    if min_value > max_value {
        return Err(GraphError::invalid_operation(
            "clamp",
            format!("minValue {min_value} exceeds maxValue {max_value}"),
        ));
    }
    Ok(input
        .iter()
        .map(|&x| {
            if x < min_value {
                min_value
            } else if x > max_value {
                max_value
            } else {
                x
            }
        })
        .collect())
}

pub fn where_select(
    condition: (&[f32], &[usize]),
    true_value: (&[f32], &[usize]),
    false_value: (&[f32], &[usize]),
) -> Result<(Vec<f32>, Vec<usize>), GraphError> {
    let out_shape = broadcast_shape(
        &broadcast_shape(condition.1, true_value.1)?,
        false_value.1,
    )?;
    let c = broadcast_offsets(condition.1, &out_shape);
    let t = broadcast_offsets(true_value.1, &out_shape);
    let f = broadcast_offsets(false_value.1, &out_shape);
    let out = (0..c.len())
        .map(|i| {
            if condition.0[c[i]] != 0.0 {
                true_value.0[t[i]]
            } else {
                false_value.0[f[i]]
            }
        })
        .collect();
    Ok((out, out_shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_for_trailing_singleton() {
        assert_eq!(broadcast_offsets(&[2, 1], &[2, 3]), vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn offsets_for_scalar_and_identity() {
        assert_eq!(broadcast_offsets(&[], &[2, 2]), vec![0, 0, 0, 0]);
        assert_eq!(broadcast_offsets(&[2, 2], &[2, 2]), vec![0, 1, 2, 3]);
        assert_eq!(broadcast_offsets(&[], &[]), vec![0]);
    }

    #[test]
    fn offsets_for_leading_singleton() {
        assert_eq!(broadcast_offsets(&[1, 3], &[2, 3]), vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn binary_sub_broadcasts_column() {
        let (out, shape) = binary(
            BinaryOp::Sub,
            &[1.0, 2.0],
            &[2, 1],
            &[0.5, 1.0, 1.5, 0.0, 1.0, 2.0],
            &[2, 3],
        )
        .unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(out, vec![0.5, 0.0, -0.5, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn greater_yields_mask() {
        let (out, _) = binary(BinaryOp::Greater, &[0.0, 0.3], &[2], &[0.0], &[]).unwrap();
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn min_propagates_nan() {
        let (out, _) = binary(BinaryOp::Min, &[f32::NAN, 1.0], &[2], &[0.5], &[]).unwrap();
        assert!(out[0].is_nan());
        assert_eq!(out[1], 0.5);
    }

    #[test]
    fn clamp_keeps_nan() {
        let out = clamp(&[-1.0, 0.5, 2.0, f32::NAN], 0.0, 1.0).unwrap();
        assert_eq!(&out[..3], &[0.0, 0.5, 1.0]);
        assert!(out[3].is_nan());
        assert!(clamp(&[0.0], 1.0, 0.0).is_err());
    }

    #[test]
    fn where_selects_and_broadcasts() {
        let (out, shape) = where_select(
            (&[1.0, 0.0][..], &[2, 1][..]),
            (&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0][..], &[2, 3][..]),
            (&[f32::NAN, 9.0][..], &[2, 1][..]),
        )
        .unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 9.0, 9.0, 9.0]);
    }
}
