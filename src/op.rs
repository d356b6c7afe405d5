//! Reduction operators.

/// Reduction operations, lowered by the C shim to the matching `MPI_Op`.
///
/// Discriminants match the `INFERMPI_OP_*` defines in `csrc/infermpi.h`.
/// `MinLoc`/`MaxLoc` expect value-index pair types, which no
/// [`MpiDatatype`](crate::MpiDatatype) currently models; the runtime rejects
/// them for scalar tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReduceOp {
    /// `MPI_OP_NULL`
    NullOp = 0,
    /// Maximum value
    Max = 1,
    /// Minimum value
    Min = 2,
    /// Sum of values
    Sum = 3,
    /// Product of values
    Prod = 4,
    /// Logical and
    Land = 5,
    /// Bitwise and
    Band = 6,
    /// Logical or
    Lor = 7,
    /// Bitwise or
    Bor = 8,
    /// Logical xor
    Lxor = 9,
    /// Bitwise xor
    Bxor = 10,
    /// Minimum value and the rank holding it
    MinLoc = 11,
    /// Maximum value and the rank holding it
    MaxLoc = 12,
    /// Replace (one-sided accumulate semantics)
    Replace = 13,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_values_match_c_defines() {
        let ops = [
            ReduceOp::NullOp,
            ReduceOp::Max,
            ReduceOp::Min,
            ReduceOp::Sum,
            ReduceOp::Prod,
            ReduceOp::Land,
            ReduceOp::Band,
            ReduceOp::Lor,
            ReduceOp::Bor,
            ReduceOp::Lxor,
            ReduceOp::Bxor,
            ReduceOp::MinLoc,
            ReduceOp::MaxLoc,
            ReduceOp::Replace,
        ];
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(*op as i32, i as i32, "{op:?}");
        }
    }
}
