//! Frame-by-frame streaming of NIfTI-1 time series too large to be decoded
//! into memory at once.
//!
//! A volume is read as a (possibly gzip-compressed) byte stream, reassembled
//! into one 3D frame at a time, handed to a caller-supplied handler, and
//! optionally written back out to a new volume frame by frame:
//!
//! - [`HeaderProbe`] learns the frame layout of a file from its header alone.
//! - [`FrameStreamReader`] delivers the frames of a file, in order, to a
//!   [`FrameProcessor`].
//! - [`FrameWriter`] builds an output volume incrementally in a temporary
//!   file and moves it into place (compressing it if requested) after the
//!   last frame.
//! - [`TransformDriver`] and [`process_file`] connect the two through a
//!   per-frame [`FrameTransform`].
//!
//! Only single-file volumes (".nii" and ".nii.gz") stored in the system's
//! native byte order are supported.
//!
//! # Example
//!
//! ```no_run
//! use nifti_framestream::{process_file, FrameView, OwnedFrame, StreamOptions, WriterOptions};
//! # use nifti_framestream::Result;
//!
//! # fn run() -> Result<()> {
//! let threshold = |_index: usize, frame: FrameView<'_>| {
//!     let data = frame.raw_data().iter().map(|&v| if v > 100 { v } else { 0 }).collect();
//!     OwnedFrame::new(frame.shape(), data)
//! };
//! process_file(
//!     "series.nii.gz",
//!     "series_thresholded.nii.gz",
//!     threshold,
//!     StreamOptions::new(),
//!     WriterOptions::new(),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! [`HeaderProbe`]: ./probe/struct.HeaderProbe.html
//! [`FrameStreamReader`]: ./reader/struct.FrameStreamReader.html
//! [`FrameProcessor`]: ./reader/trait.FrameProcessor.html
//! [`FrameWriter`]: ./writer/struct.FrameWriter.html
//! [`TransformDriver`]: ./driver/struct.TransformDriver.html
//! [`process_file`]: ./driver/fn.process_file.html
//! [`FrameTransform`]: ./driver/trait.FrameTransform.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

pub mod driver;
pub mod error;
pub mod frame;
pub mod header;
pub mod probe;
pub mod reader;
pub mod typedef;
mod util;
pub mod writer;

pub use byteordered::Endianness;
pub use driver::{process_file, FrameTransform, IdentityTransform, TransformDriver};
pub use error::{PipelineError, Result};
pub use flate2::Compression;
pub use frame::{FrameShape, FrameView, OwnedFrame};
pub use header::NiftiHeader;
pub use probe::{HeaderProbe, VolumeHeaderInfo};
pub use reader::{
    FrameProcessor, FrameStreamReader, RunEnd, RunSummary, StreamCursor, StreamOptions,
};
pub use typedef::NiftiType;
pub use util::is_gz_file;
pub use writer::{compress_file, copy_file, FrameWriter, OutputFileHandle, WriterOptions};
