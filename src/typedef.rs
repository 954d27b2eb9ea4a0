//! Voxel data types defined by the NIfTI-1 standard.
//!
//! Frame streaming never interprets voxel values, but it needs to know how
//! many bytes a voxel takes, which is what [`NiftiType::size_of`] is for.
//!
//! [`NiftiType::size_of`]: ./enum.NiftiType.html#method.size_of

use crate::error::{PipelineError, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Data type for representing a NIfTI value type in a volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
#[repr(i16)]
pub enum NiftiType {
    /// unsigned char.
    // NIFTI_TYPE_UINT8           2
    Uint8 = 2,
    /// signed short.
    // NIFTI_TYPE_INT16           4
    Int16 = 4,
    /// signed int.
    // NIFTI_TYPE_INT32           8
    Int32 = 8,
    /// 32 bit float.
    // NIFTI_TYPE_FLOAT32        16
    Float32 = 16,
    /// 64 bit complex = 2 32 bit floats.
    // NIFTI_TYPE_COMPLEX64      32
    Complex64 = 32,
    /// 64 bit float = double.
    // NIFTI_TYPE_FLOAT64        64
    Float64 = 64,
    /// 3 8 bit bytes.
    // NIFTI_TYPE_RGB24         128
    Rgb24 = 128,
    /// signed char.
    // NIFTI_TYPE_INT8          256
    Int8 = 256,
    /// unsigned short.
    // NIFTI_TYPE_UINT16        512
    Uint16 = 512,
    /// unsigned int.
    // NIFTI_TYPE_UINT32        768
    Uint32 = 768,
    /// signed long long.
    // NIFTI_TYPE_INT64        1024
    Int64 = 1024,
    /// unsigned long long.
    // NIFTI_TYPE_UINT64       1280
    Uint64 = 1280,
    /// 128 bit float = long double.
    // NIFTI_TYPE_FLOAT128     1536
    Float128 = 1536,
    /// 128 bit complex = 2 64 bit floats.
    // NIFTI_TYPE_COMPLEX128   1792
    Complex128 = 1792,
    /// 256 bit complex = 2 128 bit floats
    // NIFTI_TYPE_COMPLEX256   2048
    Complex256 = 2048,
    /// 4 8 bit bytes.
    // NIFTI_TYPE_RGBA32       2304
    Rgba32 = 2304,
}

impl NiftiType {
    /// Validate a raw `datatype` header code.
    pub fn from_code(code: i16) -> Result<Self> {
        FromPrimitive::from_i16(code).ok_or(PipelineError::InvalidCode("datatype", code))
    }

    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use NiftiType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Rgb24 => 3,
            Int32 | Uint32 | Float32 | Rgba32 => 4,
            Int64 | Uint64 | Float64 | Complex64 => 8,
            Float128 | Complex128 => 16,
            Complex256 => 32,
        }
    }

    /// The value of the `bitpix` header field for this data type.
    pub fn bitpix(self) -> i16 {
        (self.size_of() * 8) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::NiftiType;

    #[test]
    fn codes() {
        assert_eq!(NiftiType::from_code(16).unwrap(), NiftiType::Float32);
        assert_eq!(NiftiType::from_code(2304).unwrap(), NiftiType::Rgba32);
        assert!(NiftiType::from_code(0).is_err());
        assert!(NiftiType::from_code(3).is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(NiftiType::Uint8.size_of(), 1);
        assert_eq!(NiftiType::Rgb24.bitpix(), 24);
        assert_eq!(NiftiType::Complex64.size_of(), 8);
        assert_eq!(NiftiType::Float64.bitpix(), 64);
    }
}
