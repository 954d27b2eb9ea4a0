//! Frame types: the unit of data moved through the pipeline.
//!
//! A frame is one 3D slab of raw voxel data (a single time point of a single
//! component). The reader lends each frame to the handler as a [`FrameView`],
//! which borrows the reader's reusable buffer. Transforms produce
//! [`OwnedFrame`]s, which may have a different shape and data type than their
//! input (e.g. after reslicing).
//!
//! [`FrameView`]: ./struct.FrameView.html
//! [`OwnedFrame`]: ./struct.OwnedFrame.html

use crate::error::{PipelineError, Result};
use crate::typedef::NiftiType;
use bytemuck::Pod;
use std::mem::size_of;

#[cfg(feature = "ndarray_volumes")]
use ndarray::{Array3, ShapeBuilder};

/// Spatial extent and voxel type of a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameShape {
    dim: [u16; 3],
    datatype: NiftiType,
}

impl FrameShape {
    /// Create a frame shape from its `(x, y, z)` extents and data type.
    pub fn new(dim: [u16; 3], datatype: NiftiType) -> Self {
        FrameShape { dim, datatype }
    }

    /// The `(x, y, z)` extents of the frame.
    pub fn dim(&self) -> [u16; 3] {
        self.dim
    }

    /// The voxel data type.
    pub fn datatype(&self) -> NiftiType {
        self.datatype
    }

    /// Number of voxels in the frame.
    pub fn voxel_count(&self) -> usize {
        self.dim.iter().map(|d| usize::from(*d)).product()
    }

    /// Number of bytes in the frame.
    pub fn byte_len(&self) -> usize {
        self.voxel_count() * self.datatype.size_of()
    }

    fn check_element<T>(&self) -> Result<()> {
        if size_of::<T>() == self.datatype.size_of() {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedDataType(self.datatype))
        }
    }
}

/// A non-owning view of one frame, valid for the duration of a single
/// frame handler call.
#[derive(Debug, Copy, Clone)]
pub struct FrameView<'a> {
    index: usize,
    shape: FrameShape,
    data: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Create a view over raw frame bytes.
    ///
    /// # Errors
    ///
    /// - `PipelineError::FrameShapeMismatch` if `data` does not hold exactly
    ///   one frame of the given shape.
    pub fn new(index: usize, shape: FrameShape, data: &'a [u8]) -> Result<Self> {
        if data.len() != shape.byte_len() {
            return Err(PipelineError::FrameShapeMismatch(shape.byte_len(), data.len()));
        }
        Ok(FrameView { index, shape, data })
    }

    /// The frame's position in its volume.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The frame's shape.
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// The raw voxel bytes, in file order.
    pub fn raw_data(&self) -> &'a [u8] {
        self.data
    }

    /// Reinterpret the raw bytes as voxels of type `T` without copying.
    /// Returns `None` if `T` does not match the frame's voxel size, or if the
    /// underlying buffer is not suitably aligned for `T`.
    pub fn voxels<T: Pod>(&self) -> Option<&'a [T]> {
        self.shape.check_element::<T>().ok()?;
        bytemuck::try_cast_slice(self.data).ok()
    }

    /// Copy the voxels into a new vector of type `T`, whatever the buffer's
    /// alignment.
    pub fn to_voxel_vec<T: Pod>(&self) -> Result<Vec<T>> {
        self.shape.check_element::<T>()?;
        Ok(bytemuck::allocation::pod_collect_to_vec(self.data))
    }

    /// Copy the frame into an owned frame, detaching it from the
    /// reader's buffer.
    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            shape: self.shape,
            data: self.data.to_vec(),
        }
    }

    /// Copy the frame into a 3D array in column major (Fortran) order, which
    /// is the order of voxels on disk.
    #[cfg(feature = "ndarray_volumes")]
    pub fn to_ndarray<T: Pod>(&self) -> Result<Array3<T>> {
        let [x, y, z] = self.shape.dim;
        let voxels = self.to_voxel_vec::<T>()?;
        let shape = (usize::from(x), usize::from(y), usize::from(z)).f();
        // the length was validated on construction
        Array3::from_shape_vec(shape, voxels)
            .map_err(|_| PipelineError::FrameShapeMismatch(self.shape.byte_len(), self.data.len()))
    }
}

/// A frame that owns its voxel data, typically the output of a transform.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedFrame {
    shape: FrameShape,
    data: Vec<u8>,
}

impl OwnedFrame {
    /// Create an owned frame from raw bytes.
    pub fn new(shape: FrameShape, data: Vec<u8>) -> Result<Self> {
        if data.len() != shape.byte_len() {
            return Err(PipelineError::FrameShapeMismatch(shape.byte_len(), data.len()));
        }
        Ok(OwnedFrame { shape, data })
    }

    /// Create an owned frame from typed voxels. `T` must match the size of
    /// `datatype`.
    pub fn from_voxels<T: Pod>(dim: [u16; 3], datatype: NiftiType, voxels: &[T]) -> Result<Self> {
        let shape = FrameShape::new(dim, datatype);
        shape.check_element::<T>()?;
        OwnedFrame::new(shape, bytemuck::cast_slice(voxels).to_vec())
    }

    /// Create an owned frame from a 3D array, storing it in column major
    /// order.
    #[cfg(feature = "ndarray_volumes")]
    pub fn from_ndarray<T: Pod>(array: &Array3<T>, datatype: NiftiType) -> Result<Self> {
        let (x, y, z) = array.dim();
        let dim = [x as u16, y as u16, z as u16];
        let voxels: Vec<T> = array.t().iter().copied().collect();
        OwnedFrame::from_voxels(dim, datatype, &voxels)
    }

    /// The frame's shape.
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// The raw voxel bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Move the raw voxel bytes out of the frame.
    pub fn into_raw_data(self) -> Vec<u8> {
        self.data
    }

    /// Borrow this frame as a view with the given index.
    pub fn view(&self, index: usize) -> FrameView<'_> {
        FrameView {
            index,
            shape: self.shape,
            data: &self.data,
        }
    }
}
