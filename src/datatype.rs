//! Element datatypes and their wire tags.
//!
//! [`MpiDatatype`] is a sealed trait mapping a Rust element type to the
//! [`DatatypeTag`] the C shim lowers to an `MPI_Datatype`. The mapping is
//! resolved at compile time: passing a slice of any other type to a typed
//! operation does not compile. Arbitrary plain-old-data can still travel as
//! bytes through the `*_pod` operations on
//! [`Communicator`](crate::Communicator).
//!
//! # Supported Types
//!
//! | Rust Type        | Tag      | MPI datatype   |
//! |------------------|----------|----------------|
//! | [`Byte`]         | `Byte`   | `MPI_BYTE`     |
//! | [`half::f16`]    | `Half`   | `MPI_UINT16_T` |
//! | `f32`            | `Float`  | `MPI_FLOAT`    |
//! | `f64`            | `Double` | `MPI_DOUBLE`   |
//! | `bool`           | `Bool`   | `MPI_C_BOOL`   |
//! | `i8`             | `Int8`   | `MPI_INT8_T`   |
//! | `u8`             | `UInt8`  | `MPI_UINT8_T`  |
//! | `i32`            | `Int32`  | `MPI_INT32_T`  |
//! | `u32`            | `UInt32` | `MPI_UINT32_T` |
//! | `i64`            | `Int64`  | `MPI_INT64_T`  |
//! | `u64`            | `UInt64` | `MPI_UINT64_T` |
//! | [`Fp8E4M3`]      | `Fp8`    | `MPI_UINT8_T`  |
//! | [`half::bf16`]   | `Bf16`   | `MPI_UINT16_T` |
//! | [`MpiChar`]      | `Char`   | `MPI_CHAR`     |
//!
//! `Fp8E4M3` needs the `fp8` feature and `bf16` the `bf16` feature. The
//! reduced-precision formats travel as unsigned integers of the same width,
//! so they can be broadcast and exchanged but arithmetic reductions on them
//! are meaningless.

use bytemuck::{Pod, Zeroable};
use std::os::raw::c_char;

mod sealed {
    pub trait Sealed {}
}

/// Tag values matching the `INFERMPI_*` datatype defines in `csrc/infermpi.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// Untyped byte (`MPI_BYTE`)
    Byte = 0,
    /// IEEE 754 binary16
    Half = 1,
    /// 32-bit float (`MPI_FLOAT`)
    Float = 2,
    /// 64-bit float (`MPI_DOUBLE`)
    Double = 3,
    /// Boolean (`MPI_C_BOOL`)
    Bool = 4,
    /// 8-bit signed integer
    Int8 = 5,
    /// 8-bit unsigned integer
    UInt8 = 6,
    /// 32-bit signed integer
    Int32 = 7,
    /// 32-bit unsigned integer
    UInt32 = 8,
    /// 64-bit signed integer
    Int64 = 9,
    /// 64-bit unsigned integer
    UInt64 = 10,
    /// 8-bit float, E4M3 layout
    Fp8 = 11,
    /// bfloat16
    Bf16 = 12,
    /// C `char` (`MPI_CHAR`)
    Char = 13,
}

impl DatatypeTag {
    /// All tags, in discriminant order.
    pub const ALL: [DatatypeTag; 14] = [
        DatatypeTag::Byte,
        DatatypeTag::Half,
        DatatypeTag::Float,
        DatatypeTag::Double,
        DatatypeTag::Bool,
        DatatypeTag::Int8,
        DatatypeTag::UInt8,
        DatatypeTag::Int32,
        DatatypeTag::UInt32,
        DatatypeTag::Int64,
        DatatypeTag::UInt64,
        DatatypeTag::Fp8,
        DatatypeTag::Bf16,
        DatatypeTag::Char,
    ];

    /// Size of one element on the wire.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DatatypeTag::Byte
            | DatatypeTag::Bool
            | DatatypeTag::Int8
            | DatatypeTag::UInt8
            | DatatypeTag::Fp8
            | DatatypeTag::Char => 1,
            DatatypeTag::Half | DatatypeTag::Bf16 => 2,
            DatatypeTag::Float | DatatypeTag::Int32 | DatatypeTag::UInt32 => 4,
            DatatypeTag::Double | DatatypeTag::Int64 | DatatypeTag::UInt64 => 8,
        }
    }
}

/// Trait for element types usable in typed MPI operations.
///
/// This is a **sealed trait**: the set of implementors is closed, and each
/// implementor has exactly one tag.
///
/// # Example
///
/// ```no_run
/// use infermpi::Mpi;
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let mut logits = vec![half::f16::ZERO; 32];
/// world.bcast(&mut logits, 0);
///
/// let mut token_ids = vec![0i32; 8];
/// world.bcast(&mut token_ids, 0);
/// ```
pub trait MpiDatatype: sealed::Sealed + Copy + Default + Send + 'static {
    /// Tag passed to the C shim.
    const TAG: DatatypeTag;
}

macro_rules! impl_mpi_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl MpiDatatype for $ty {
            const TAG: DatatypeTag = $tag;
        }
    };
}

/// An untyped byte, distinct from `u8` so that it maps to `MPI_BYTE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Byte(pub u8);

/// A C `char`, distinct from `i8`/`u8` so that it maps to `MPI_CHAR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct MpiChar(pub c_char);

impl MpiChar {
    /// Reinterpret an ASCII byte.
    pub const fn from_ascii(b: u8) -> Self {
        MpiChar(b as c_char)
    }

    /// The raw byte value.
    pub const fn to_byte(self) -> u8 {
        self.0 as u8
    }
}

/// An 8-bit float in E4M3 layout (1 sign, 4 exponent, 3 mantissa bits).
///
/// Only the bit pattern is carried; conversion to and from wider floats is
/// left to the numeric code that produces the values.
#[cfg(feature = "fp8")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Fp8E4M3(pub u8);

#[cfg(feature = "fp8")]
impl Fp8E4M3 {
    /// Wrap a raw bit pattern.
    pub const fn from_bits(bits: u8) -> Self {
        Fp8E4M3(bits)
    }

    /// The raw bit pattern.
    pub const fn to_bits(self) -> u8 {
        self.0
    }
}

impl_mpi_datatype!(Byte, DatatypeTag::Byte);
impl_mpi_datatype!(half::f16, DatatypeTag::Half);
impl_mpi_datatype!(f32, DatatypeTag::Float);
impl_mpi_datatype!(f64, DatatypeTag::Double);
impl_mpi_datatype!(bool, DatatypeTag::Bool);
impl_mpi_datatype!(i8, DatatypeTag::Int8);
impl_mpi_datatype!(u8, DatatypeTag::UInt8);
impl_mpi_datatype!(i32, DatatypeTag::Int32);
impl_mpi_datatype!(u32, DatatypeTag::UInt32);
impl_mpi_datatype!(i64, DatatypeTag::Int64);
impl_mpi_datatype!(u64, DatatypeTag::UInt64);
impl_mpi_datatype!(MpiChar, DatatypeTag::Char);
#[cfg(feature = "fp8")]
impl_mpi_datatype!(Fp8E4M3, DatatypeTag::Fp8);
#[cfg(feature = "bf16")]
impl_mpi_datatype!(half::bf16, DatatypeTag::Bf16);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::mem::size_of;

    fn tag_of<T: MpiDatatype>() -> DatatypeTag {
        T::TAG
    }

    #[test]
    fn tag_values_match_c_defines() {
        for (i, tag) in DatatypeTag::ALL.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn each_type_maps_to_its_own_tag() {
        let mut tags = vec![
            tag_of::<Byte>(),
            tag_of::<half::f16>(),
            tag_of::<f32>(),
            tag_of::<f64>(),
            tag_of::<bool>(),
            tag_of::<i8>(),
            tag_of::<u8>(),
            tag_of::<i32>(),
            tag_of::<u32>(),
            tag_of::<i64>(),
            tag_of::<u64>(),
            tag_of::<MpiChar>(),
        ];
        #[cfg(feature = "fp8")]
        tags.push(tag_of::<Fp8E4M3>());
        #[cfg(feature = "bf16")]
        tags.push(tag_of::<half::bf16>());

        let unique: HashSet<_> = tags.iter().copied().collect();
        assert_eq!(unique.len(), tags.len(), "two types share a tag: {tags:?}");

        assert_eq!(tag_of::<Byte>(), DatatypeTag::Byte);
        assert_eq!(tag_of::<u8>(), DatatypeTag::UInt8);
        assert_eq!(tag_of::<half::f16>(), DatatypeTag::Half);
        assert_eq!(tag_of::<MpiChar>(), DatatypeTag::Char);
    }

    #[test]
    fn mapping_is_stable_across_calls() {
        assert_eq!(tag_of::<f32>(), tag_of::<f32>());
        assert_eq!(<f64 as MpiDatatype>::TAG, DatatypeTag::Double);
        assert_eq!(<i64 as MpiDatatype>::TAG as i32, 9);
    }

    #[test]
    fn wire_size_matches_rust_layout() {
        fn check<T: MpiDatatype>() {
            assert_eq!(
                T::TAG.size_in_bytes(),
                size_of::<T>(),
                "{:?} wire size differs from Rust size",
                T::TAG
            );
        }
        check::<Byte>();
        check::<half::f16>();
        check::<f32>();
        check::<f64>();
        check::<bool>();
        check::<i8>();
        check::<u8>();
        check::<i32>();
        check::<u32>();
        check::<i64>();
        check::<u64>();
        check::<MpiChar>();
        #[cfg(feature = "fp8")]
        check::<Fp8E4M3>();
        #[cfg(feature = "bf16")]
        check::<half::bf16>();
    }

    #[test]
    fn char_round_trips_ascii() {
        let c = MpiChar::from_ascii(b'q');
        assert_eq!(c.to_byte(), b'q');
        assert_eq!(MpiChar::default().to_byte(), 0);
    }

    #[cfg(feature = "fp8")]
    #[test]
    fn fp8_keeps_bit_pattern() {
        let x = Fp8E4M3::from_bits(0b0_0111_000);
        assert_eq!(x.to_bits(), 0x38);
        assert_eq!(bytemuck::bytes_of(&x), &[0x38]);
    }
}
