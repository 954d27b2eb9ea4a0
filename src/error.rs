//! Types for error handling go here.

use crate::typedef::NiftiType;
use byteordered::Endianness;
use quick_error::quick_error;
use std::error::Error as StdError;
use std::io::Error as IOError;
use std::path::PathBuf;

/// A boxed error raised by user code, such as a frame handler.
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum PipelineError {
        /// The volume header could not be opened, read or parsed.
        HeaderRead(path: PathBuf, cause: Box<PipelineError>) {
            display("could not read volume header of {}: {}", path.display(), cause)
            source(&**cause)
        }
        /// The source file is stored in the opposite byte order of this
        /// system, which is not supported for frame streaming.
        UnsupportedByteOrder(path: PathBuf, endianness: Endianness) {
            display("{} is stored in {:?} endian byte order, which is not supported",
                path.display(), endianness)
        }
        /// An invalid NIfTI-1 file was read.
        InvalidFormat {
            display("invalid NIfTI-1 file")
        }
        /// An invalid code was found in a header field.
        InvalidCode(typename: &'static str, code: i16) {
            display("invalid code `{}` for header field {}", code, typename)
        }
        /// The header describes a detached volume (`.hdr`/`.img` pair), so
        /// no voxel data follows it in the same stream.
        NoVolumeData {
            display("no volume data available in the same file as the header")
        }
        /// The volume has more than five dimensions.
        UnsupportedDimensionality(rank: u16) {
            display("unsupported volume rank {} (at most 5 dimensions)", rank)
        }
        /// Inconsistent or invalid volume dimensions.
        InconsistentDim(index: u8, value: u16) {
            display("inconsistent value `{}` in dimension index {}", value, index)
        }
        /// The data type cannot be used in a frame.
        UnsupportedDataType(t: NiftiType) {
            display("unsupported data type {:?}", t)
        }
        /// The frame or volume size declared by the header does not fit in
        /// the address space.
        FrameSizeOverflow {
            display("frame size declared by the header overflows")
        }
        /// The buffer holding one frame could not be allocated.
        FrameAllocation(bytes: usize) {
            display("could not allocate a frame buffer of {} bytes", bytes)
        }
        /// An option was given an unusable value.
        InvalidOption(name: &'static str, reason: &'static str) {
            display("invalid option `{}`: {}", name, reason)
        }
        /// A read, decompression or seek operation failed while streaming.
        StreamIo(err: IOError) {
            from()
            source(err)
            display("I/O error while streaming: {}", err)
        }
        /// The frame handler failed.
        Handler(err: BoxedError) {
            source(&**err)
            display("frame handler failed: {}", err)
        }
        /// A frame could not be appended to the temporary output file.
        WriteFrame(index: usize, err: IOError) {
            source(err)
            display("could not write frame #{}: {}", index, err)
        }
        /// The output file could not be closed, compressed or copied into place.
        WriteFinalize(path: PathBuf, err: IOError) {
            source(err)
            display("could not finalize {}: {}", path.display(), err)
        }
        /// A frame was given to the writer out of sequence.
        FrameOutOfOrder(expected: usize, got: usize) {
            display("expected frame #{}, got frame #{}", expected, got)
        }
        /// A frame does not have the shape of the first frame written.
        FrameShapeMismatch(expected: usize, got: usize) {
            display("frame holds {} bytes, but {} were expected", got, expected)
        }
        /// The writer already produced its last frame.
        WriterFinished {
            display("the output file is already complete")
        }
        /// Streaming ended before the output received all of its frames.
        IncompleteOutput(written: usize, expected: usize) {
            display("output incomplete: {} of {} frames written", written, expected)
        }
    }
}

impl PipelineError {
    /// Wrap an arbitrary error raised by a frame handler or transform.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<BoxedError>,
    {
        PipelineError::Handler(err.into())
    }

    pub(crate) fn header_read<P: Into<PathBuf>>(path: P, cause: PipelineError) -> Self {
        PipelineError::HeaderRead(path.into(), Box::new(cause))
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, PipelineError>;
