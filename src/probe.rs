//! Header probing: learn the frame layout of a volume without touching its
//! voxel data.
//!
//! Only the first `vox_offset` bytes of the (possibly gzip-decoded) file are
//! ever read, so probing a multi-gigabyte time series is as cheap as probing
//! a single volume.

use crate::error::{PipelineError, Result};
use crate::frame::FrameShape;
use crate::header::{NiftiHeader, HEADER_SIZE, MAGIC_CODE_NI1, MIN_VOX_OFFSET};
use crate::typedef::NiftiType;
use crate::util::open_file_maybe_gz;
use std::io::{self, Read};
use std::path::Path;

/// Highest volume rank a frame stream can describe:
/// three spatial axes, time and components.
pub const MAX_RANK: u16 = 5;

/// The layout of a volume, as learned from its header.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHeaderInfo {
    dimensions: [usize; 5],
    datatype: NiftiType,
    frame_byte_size: usize,
    header_byte_length: usize,
    byte_order_swapped: bool,
    header: NiftiHeader,
    extension_bytes: Vec<u8>,
}

impl VolumeHeaderInfo {
    /// Build the volume layout from an already parsed header. The extension
    /// bytes are everything between the 348-byte header and the voxel data.
    pub fn from_header(header: NiftiHeader, extension_bytes: Vec<u8>) -> Result<Self> {
        if &header.magic == MAGIC_CODE_NI1 {
            return Err(PipelineError::NoVolumeData);
        }
        let rank = header.rank();
        if rank == 0 {
            return Err(PipelineError::InconsistentDim(0, rank));
        }
        if rank > MAX_RANK {
            return Err(PipelineError::UnsupportedDimensionality(rank));
        }
        let mut dimensions = [1; 5];
        for (i, d) in header.dim[1..=usize::from(rank)].iter().enumerate() {
            if *d == 0 {
                return Err(PipelineError::InconsistentDim(i as u8 + 1, *d));
            }
            dimensions[i] = usize::from(*d);
        }
        let datatype = header.data_type()?;
        let frame_byte_size = dimensions[..3]
            .iter()
            .try_fold(datatype.size_of(), |acc, d| acc.checked_mul(*d))
            .ok_or(PipelineError::FrameSizeOverflow)?;
        let header_byte_length = voxel_offset(&header);
        if extension_bytes.len() != header_byte_length - HEADER_SIZE {
            return Err(PipelineError::InvalidFormat);
        }

        Ok(VolumeHeaderInfo {
            dimensions,
            datatype,
            frame_byte_size,
            header_byte_length,
            byte_order_swapped: header.is_byte_swapped(),
            header,
            extension_bytes,
        })
    }

    /// Volume extents as `(x, y, z, t, components)`. Axes beyond the
    /// volume's rank are reported as 1.
    pub fn dimensions(&self) -> [usize; 5] {
        self.dimensions
    }

    /// The voxel data type.
    pub fn datatype(&self) -> NiftiType {
        self.datatype
    }

    /// Size of a single voxel, in bytes.
    pub fn voxel_byte_size(&self) -> usize {
        self.datatype.size_of()
    }

    /// Number of bytes preceding the first frame, header and extensions
    /// included.
    pub fn header_byte_length(&self) -> usize {
        self.header_byte_length
    }

    /// Whether the file is stored in the opposite byte order of this system.
    pub fn byte_order_swapped(&self) -> bool {
        self.byte_order_swapped
    }

    /// Number of voxels in one 3D frame.
    pub fn voxels_per_frame(&self) -> usize {
        self.dimensions[..3].iter().product()
    }

    /// Number of bytes in one 3D frame.
    pub fn frame_byte_size(&self) -> usize {
        self.frame_byte_size
    }

    /// Number of frames in the volume (time points times components).
    pub fn num_frames(&self) -> usize {
        self.dimensions[3] * self.dimensions[4]
    }

    /// The shape shared by every frame of this volume.
    pub fn frame_shape(&self) -> FrameShape {
        let [x, y, z, _, _] = self.dimensions;
        FrameShape::new([x as u16, y as u16, z as u16], self.datatype)
    }

    /// The parsed header, usable as a template for output volumes.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// The raw bytes between the 348-byte header and the voxel data
    /// (extender and extensions).
    pub fn extension_bytes(&self) -> &[u8] {
        &self.extension_bytes
    }
}

/// Reads volume headers and validates them for frame streaming.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderProbe;

impl HeaderProbe {
    /// Read the volume layout of the file at `path`, rejecting byte-swapped
    /// sources before any frame processing can begin.
    ///
    /// # Errors
    ///
    /// - `PipelineError::HeaderRead` if the file cannot be opened or its
    ///   header cannot be parsed.
    /// - `PipelineError::UnsupportedByteOrder` if the file is byte-swapped.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VolumeHeaderInfo> {
        let path = path.as_ref();
        let info = Self::inspect(path)?;
        if info.byte_order_swapped() {
            return Err(PipelineError::UnsupportedByteOrder(
                path.to_path_buf(),
                info.header().endianness,
            ));
        }
        Ok(info)
    }

    /// Read the volume layout of the file at `path` without checking its
    /// byte order. If the file's name ends with ".gz", it is decompressed on
    /// the fly, but only up to the end of the header.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<VolumeHeaderInfo> {
        let path = path.as_ref();
        let info = open_file_maybe_gz(path)
            .map_err(PipelineError::from)
            .and_then(Self::inspect_reader)
            .map_err(|e| PipelineError::header_read(path, e))?;
        log::debug!(
            "{}: dimensions {:?}, {:?} voxels, header of {} bytes",
            path.display(),
            info.dimensions(),
            info.datatype(),
            info.header_byte_length()
        );
        Ok(info)
    }

    /// Read the volume layout from a byte stream positioned at the start of
    /// the header. The stream is left positioned at the first frame.
    pub fn inspect_reader<R: Read>(mut source: R) -> Result<VolumeHeaderInfo> {
        let header = NiftiHeader::from_reader(&mut source)?;
        if &header.magic == MAGIC_CODE_NI1 {
            return Err(PipelineError::NoVolumeData);
        }
        let len = voxel_offset(&header) - HEADER_SIZE;
        let mut extension_bytes = Vec::new();
        let _ = source
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut extension_bytes)?;
        if extension_bytes.len() < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        VolumeHeaderInfo::from_header(header, extension_bytes)
    }
}

fn voxel_offset(header: &NiftiHeader) -> usize {
    let offset = header.vox_offset as usize;
    if offset < MIN_VOX_OFFSET {
        MIN_VOX_OFFSET
    } else {
        offset
    }
}
