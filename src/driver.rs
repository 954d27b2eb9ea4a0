//! Pipelines connecting a frame stream to a frame writer through a
//! per-frame transform.
//!
//! [`TransformDriver`] is the typical [`FrameProcessor`]: it applies a
//! [`FrameTransform`] to every frame and forwards the result to a
//! [`FrameWriter`], reporting the stream as finished as soon as the output
//! file is complete. [`process_file`] wires everything together for the
//! common case of one input file and one output file.
//!
//! ```no_run
//! use nifti_framestream::{process_file, IdentityTransform, StreamOptions, WriterOptions};
//! # use nifti_framestream::Result;
//!
//! # fn run() -> Result<()> {
//! // recompress the second half of a 200-frame series
//! let options = StreamOptions::new().frame_offset(100);
//! process_file("bold.nii", "bold_b.nii.gz", IdentityTransform, options, WriterOptions::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TransformDriver`]: ./struct.TransformDriver.html
//! [`FrameProcessor`]: ../reader/trait.FrameProcessor.html
//! [`FrameTransform`]: ./trait.FrameTransform.html
//! [`FrameWriter`]: ../writer/struct.FrameWriter.html
//! [`process_file`]: ./fn.process_file.html

use crate::error::{PipelineError, Result};
use crate::frame::{FrameView, OwnedFrame};
use crate::probe::HeaderProbe;
use crate::reader::{FrameProcessor, FrameStreamReader, RunSummary, StreamOptions};
use crate::writer::{FrameWriter, WriterOptions};
use std::fmt;
use std::path::Path;

/// A per-frame voxel transform, such as reslicing or motion correction.
pub trait FrameTransform {
    /// Produce the output frame for input frame `index`.
    fn transform(&mut self, index: usize, frame: FrameView<'_>) -> Result<OwnedFrame>;
}

impl<F> FrameTransform for F
where
    F: FnMut(usize, FrameView<'_>) -> Result<OwnedFrame>,
{
    fn transform(&mut self, index: usize, frame: FrameView<'_>) -> Result<OwnedFrame> {
        self(index, frame)
    }
}

/// A transform which copies every frame unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl FrameTransform for IdentityTransform {
    fn transform(&mut self, _index: usize, frame: FrameView<'_>) -> Result<OwnedFrame> {
        Ok(frame.to_owned_frame())
    }
}

/// Frame handler which transforms each frame and writes the result.
pub struct TransformDriver<T> {
    transform: T,
    writer: FrameWriter,
    first_index: usize,
}

impl<T> fmt::Debug for TransformDriver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDriver")
            .field("writer", &self.writer)
            .field("first_index", &self.first_index)
            .finish()
    }
}

impl<T> TransformDriver<T>
where
    T: FrameTransform,
{
    /// Create a driver writing into `writer`. `first_index` is the index of
    /// the first source frame, which becomes frame 0 of the output.
    pub fn new(transform: T, writer: FrameWriter, first_index: usize) -> Self {
        TransformDriver {
            transform,
            writer,
            first_index,
        }
    }

    /// The output writer.
    pub fn writer(&self) -> &FrameWriter {
        &self.writer
    }

    /// Recover the transform and the writer.
    pub fn into_parts(self) -> (T, FrameWriter) {
        (self.transform, self.writer)
    }
}

impl<T> FrameProcessor for TransformDriver<T>
where
    T: FrameTransform,
{
    fn process_frame(&mut self, index: usize, frame: FrameView<'_>) -> Result<bool> {
        let output_index = index.checked_sub(self.first_index).ok_or(
            PipelineError::FrameOutOfOrder(self.first_index, index),
        )?;
        let output = self.transform.transform(index, frame)?;
        self.writer.write_owned(output_index, &output)
    }
}

/// Stream the volume at `input` through `transform` into a new volume at
/// `output`. Only the frame window selected by `stream_options` is
/// processed; the output holds exactly those frames (or fewer, with
/// `WriterOptions::partial_frames`).
///
/// # Errors
///
/// Besides the errors of reading, transforming and writing,
/// `PipelineError::IncompleteOutput` is returned if the input ended before
/// every output frame was written. No output file is left behind in that
/// case.
pub fn process_file<P, Q, T>(
    input: P,
    output: Q,
    transform: T,
    stream_options: StreamOptions,
    writer_options: WriterOptions,
) -> Result<RunSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    T: FrameTransform,
{
    let input = input.as_ref();
    let info = HeaderProbe::probe(input)?;
    let (offset, count) = stream_options.window(&info)?;
    let writer = FrameWriter::new(output.as_ref(), &info, count, writer_options)?;
    let mut driver = TransformDriver::new(transform, writer, offset);

    let summary = FrameStreamReader::new(stream_options).run_with_info(input, &info, &mut driver)?;
    let writer = driver.writer();
    if !writer.is_finished() {
        return Err(PipelineError::IncompleteOutput(
            writer.frames_written(),
            writer.frames_to_write(),
        ));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameShape;
    use crate::header::NiftiHeader;
    use crate::typedef::NiftiType;
    use tempfile::tempdir;

    fn writer(path: &Path, frames: usize) -> FrameWriter {
        let header = NiftiHeader {
            dim: [4, 2, 1, 1, frames as u16, 1, 1, 1],
            datatype: NiftiType::Uint8 as i16,
            bitpix: 8,
            ..NiftiHeader::default()
        };
        FrameWriter::from_header(path, header, Vec::new(), frames, WriterOptions::new()).unwrap()
    }

    #[test]
    fn driver_reports_completion_of_output() {
        let dir = tempdir().unwrap();
        let shape = FrameShape::new([2, 1, 1], NiftiType::Uint8);
        let invert = |_: usize, frame: FrameView<'_>| {
            let data = frame.raw_data().iter().map(|v| 255 - v).collect();
            OwnedFrame::new(frame.shape(), data)
        };
        let mut driver = TransformDriver::new(invert, writer(&dir.path().join("o.nii"), 2), 4);

        let input = [0u8, 10];
        let view = FrameView::new(4, shape, &input).unwrap();
        assert!(!driver.process_frame(4, view).unwrap());
        let view = FrameView::new(5, shape, &input).unwrap();
        assert!(driver.process_frame(5, view).unwrap());

        let bytes = std::fs::read(dir.path().join("o.nii")).unwrap();
        assert_eq!(&bytes[352..], &[255, 245, 255, 245]);
    }

    #[test]
    fn driver_rejects_frames_before_window() {
        let dir = tempdir().unwrap();
        let shape = FrameShape::new([2, 1, 1], NiftiType::Uint8);
        let mut driver =
            TransformDriver::new(IdentityTransform, writer(&dir.path().join("o.nii"), 2), 3);
        let view = FrameView::new(1, shape, &[0, 0]).unwrap();
        match driver.process_frame(1, view) {
            Err(PipelineError::FrameOutOfOrder(3, 1)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn transform_errors_propagate() {
        let dir = tempdir().unwrap();
        let shape = FrameShape::new([2, 1, 1], NiftiType::Uint8);
        let failing =
            |_: usize, _: FrameView<'_>| -> Result<OwnedFrame> { Err(PipelineError::handler("no")) };
        let mut driver = TransformDriver::new(failing, writer(&dir.path().join("o.nii"), 2), 0);
        let view = FrameView::new(0, shape, &[0, 0]).unwrap();
        match driver.process_frame(0, view) {
            Err(PipelineError::Handler(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(driver.writer().frames_written(), 0);
    }
}
