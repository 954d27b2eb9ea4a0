//! Streamed, frame-by-frame reading of large volumes.
//!
//! This API reassembles the (possibly gzip-decoded) byte stream of a volume
//! into fixed-size frame buffers and hands each complete frame to a
//! [`FrameProcessor`], in file order. Only one frame buffer exists for the
//! whole run: the handler receives a [`FrameView`] borrowing it, and the
//! next chunk of the stream is only read after the handler has returned, so
//! a frame can never be overwritten while it is being processed.
//!
//! # Examples
//!
//! ```no_run
//! use nifti_framestream::{FrameStreamReader, FrameView, StreamOptions};
//! # use nifti_framestream::Result;
//!
//! # fn run() -> Result<()> {
//! let mut means = Vec::new();
//! let reader = FrameStreamReader::new(StreamOptions::new().frame_offset(10).total_frames(5));
//! reader.run("bold.nii.gz", &mut |_index: usize, frame: FrameView<'_>| {
//!     let data = frame.raw_data();
//!     means.push(data.iter().map(|&v| f64::from(v)).sum::<f64>() / data.len() as f64);
//!     Ok(false)
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! [`FrameProcessor`]: ./trait.FrameProcessor.html
//! [`FrameView`]: ../frame/struct.FrameView.html

use crate::error::{PipelineError, Result};
use crate::frame::FrameView;
use crate::probe::{HeaderProbe, VolumeHeaderInfo};
use crate::util::open_file_maybe_gz;
use std::cmp::min;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default number of bytes requested from the byte stream at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Receiver of the frames of a stream.
pub trait FrameProcessor {
    /// Process one frame. `frame` is only valid for the duration of this
    /// call. Returning `true` stops the stream: no further frames are read
    /// or delivered.
    fn process_frame(&mut self, index: usize, frame: FrameView<'_>) -> Result<bool>;
}

impl<F> FrameProcessor for F
where
    F: FnMut(usize, FrameView<'_>) -> Result<bool>,
{
    fn process_frame(&mut self, index: usize, frame: FrameView<'_>) -> Result<bool> {
        self(index, frame)
    }
}

/// Options for streaming the frames of a volume.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    total_frames: Option<usize>,
    frame_offset: Option<usize>,
    chunk_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            total_frames: None,
            frame_offset: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamOptions {
    /// Stream every frame of the volume.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver at most `total_frames` frames. By default, all frames from the
    /// offset to the end of the volume are delivered.
    pub fn total_frames(mut self, total_frames: usize) -> Self {
        self.total_frames = Some(total_frames);
        self
    }

    /// Start delivering at frame `frame_offset`. Preceding frames are still
    /// decoded from the stream, but not delivered.
    pub fn frame_offset(mut self, frame_offset: usize) -> Self {
        self.frame_offset = Some(frame_offset);
        self
    }

    /// Number of bytes requested from the byte stream at a time.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Frame window limit, if any.
    pub fn get_total_frames(&self) -> Option<usize> {
        self.total_frames
    }

    /// Index of the first frame to deliver.
    pub fn get_frame_offset(&self) -> usize {
        self.frame_offset.unwrap_or(0)
    }

    /// Number of bytes requested from the byte stream at a time.
    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Resolve the frame window `(offset, count)` for the given volume.
    pub fn window(&self, info: &VolumeHeaderInfo) -> Result<(usize, usize)> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidOption("chunk_size", "must be positive"));
        }
        let offset = self.get_frame_offset();
        let available = info.num_frames();
        if offset >= available {
            return Err(PipelineError::InvalidOption(
                "frame_offset",
                "beyond the last frame of the volume",
            ));
        }
        let count = match self.total_frames {
            Some(0) => {
                return Err(PipelineError::InvalidOption(
                    "total_frames",
                    "must be positive",
                ))
            }
            Some(total) => min(total, available - offset),
            None => available - offset,
        };
        Ok((offset, count))
    }
}

/// Outcome of a call to [`StreamCursor::fill`].
///
/// [`StreamCursor::fill`]: ./struct.StreamCursor.html#method.fill
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fill {
    /// The chunk was fully consumed and the frame buffer is not full yet.
    Exhausted,
    /// The frame buffer is full. No more bytes will be taken until
    /// [`complete_frame`] is called.
    ///
    /// [`complete_frame`]: ./struct.StreamCursor.html#method.complete_frame
    FrameReady,
}

/// The byte bookkeeping of a frame stream, free of any I/O.
///
/// The cursor first skips a fixed number of leading bytes (the header and
/// any frames before the window), then copies chunk bytes into a frame
/// buffer until it is full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    chunk_offset: usize,
    bytes_accumulated: usize,
    frame_index: usize,
    done: bool,
    frame_byte_size: usize,
    skip_remaining: u64,
    frames_left: usize,
    bytes_consumed: u64,
}

impl StreamCursor {
    /// Create a cursor which skips `skip_bytes` and then assembles
    /// `total_frames` frames of `frame_byte_size` bytes, numbering them from
    /// `first_index`.
    ///
    /// # Panics
    ///
    /// Panics if `frame_byte_size` is zero.
    pub fn new(
        frame_byte_size: usize,
        skip_bytes: u64,
        first_index: usize,
        total_frames: usize,
    ) -> Self {
        assert!(frame_byte_size > 0, "frames cannot be empty");
        StreamCursor {
            chunk_offset: 0,
            bytes_accumulated: 0,
            frame_index: first_index,
            done: total_frames == 0,
            frame_byte_size,
            skip_remaining: skip_bytes,
            frames_left: total_frames,
            bytes_consumed: 0,
        }
    }

    /// Prepare for a new chunk.
    pub fn begin_chunk(&mut self) {
        self.chunk_offset = 0;
    }

    /// Consume bytes of `chunk` from the current chunk offset into `frame`,
    /// which must be `frame_byte_size` bytes long and is expected to be the
    /// same buffer for the whole run.
    pub fn fill(&mut self, chunk: &[u8], frame: &mut [u8]) -> Fill {
        debug_assert_eq!(frame.len(), self.frame_byte_size);
        if self.bytes_accumulated == self.frame_byte_size {
            return Fill::FrameReady;
        }
        if self.done {
            return Fill::Exhausted;
        }

        if self.skip_remaining > 0 {
            let available = (chunk.len() - self.chunk_offset) as u64;
            let n = min(available, self.skip_remaining) as usize;
            self.chunk_offset += n;
            self.skip_remaining -= n as u64;
            self.bytes_consumed += n as u64;
            if self.skip_remaining > 0 {
                return Fill::Exhausted;
            }
        }

        let n = min(
            self.frame_byte_size - self.bytes_accumulated,
            chunk.len() - self.chunk_offset,
        );
        frame[self.bytes_accumulated..self.bytes_accumulated + n]
            .copy_from_slice(&chunk[self.chunk_offset..self.chunk_offset + n]);
        self.chunk_offset += n;
        self.bytes_accumulated += n;
        self.bytes_consumed += n as u64;

        if self.bytes_accumulated == self.frame_byte_size {
            Fill::FrameReady
        } else {
            Fill::Exhausted
        }
    }

    /// Release the current frame after its handler returned, moving on to
    /// the next one. `finished` is the handler's result.
    ///
    /// Calling this without a ready frame is a logic error, caught by debug
    /// assertions. Once the window is exhausted, the cursor stays done.
    pub fn complete_frame(&mut self, finished: bool) {
        debug_assert_eq!(self.bytes_accumulated, self.frame_byte_size);
        debug_assert!(self.frames_left > 0, "no frame left in the window");
        self.bytes_accumulated = 0;
        self.frame_index += 1;
        self.frames_left = self.frames_left.saturating_sub(1);
        if finished || self.frames_left == 0 {
            self.done = true;
        }
    }

    /// Position inside the current chunk.
    pub fn chunk_offset(&self) -> usize {
        self.chunk_offset
    }

    /// Bytes written into the current frame buffer so far.
    pub fn bytes_accumulated(&self) -> usize {
        self.bytes_accumulated
    }

    /// Index of the frame being assembled.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Whether no more frames will be assembled.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of frames still to be delivered.
    pub fn frames_left(&self) -> usize {
        self.frames_left
    }

    /// Leading bytes still to be skipped.
    pub fn skip_remaining(&self) -> u64 {
        self.skip_remaining
    }

    /// Total bytes taken from the stream so far, skipped bytes included.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }
}

/// Why a run stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// The handler reported that it was finished.
    Finished,
    /// Every frame of the requested window was delivered.
    WindowExhausted,
    /// The byte stream ended.
    EndOfStream,
}

/// Report of a completed run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of frames delivered to the handler.
    pub frames_processed: usize,
    /// Bytes consumed from the decoded stream: the header, skipped frames
    /// and delivered frames.
    pub bytes_consumed: u64,
    /// Bytes of an incomplete frame left when the stream ended.
    pub trailing_bytes: usize,
    /// Why the run stopped.
    pub end: RunEnd,
}

/// Reads a volume frame by frame, feeding each frame to a handler.
#[derive(Debug, Clone, Default)]
pub struct FrameStreamReader {
    options: StreamOptions,
}

impl FrameStreamReader {
    /// Create a reader with the given options.
    pub fn new(options: StreamOptions) -> Self {
        FrameStreamReader { options }
    }

    /// The options of this reader.
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Stream the frames of the volume file at `path` into `handler`. If the
    /// file's name ends with ".gz", it is decompressed on the fly.
    ///
    /// # Errors
    ///
    /// - `PipelineError::HeaderRead` or `PipelineError::UnsupportedByteOrder`
    ///   before any frame is read.
    /// - `PipelineError::StreamIo` if reading or decompressing fails.
    /// - Any error returned by the handler, unchanged.
    pub fn run<P, H>(&self, path: P, handler: &mut H) -> Result<RunSummary>
    where
        P: AsRef<Path>,
        H: FrameProcessor + ?Sized,
    {
        let path = path.as_ref();
        let info = HeaderProbe::probe(path)?;
        self.run_with_info(path, &info, handler)
    }

    /// Stream the frames of the volume file at `path`, whose header was
    /// already probed into `info`.
    pub fn run_with_info<P, H>(
        &self,
        path: P,
        info: &VolumeHeaderInfo,
        handler: &mut H,
    ) -> Result<RunSummary>
    where
        P: AsRef<Path>,
        H: FrameProcessor + ?Sized,
    {
        let path = path.as_ref();
        log::info!("streaming frames from {}", path.display());
        let source = open_file_maybe_gz(path)?;
        self.run_reader(source, info, handler)
    }

    /// Stream frames from a decoded byte stream positioned at the start of
    /// the volume header described by `info`.
    pub fn run_reader<R, H>(
        &self,
        mut source: R,
        info: &VolumeHeaderInfo,
        handler: &mut H,
    ) -> Result<RunSummary>
    where
        R: Read,
        H: FrameProcessor + ?Sized,
    {
        let (offset, count) = self.options.window(info)?;
        let frame_byte_size = info.frame_byte_size();
        let shape = info.frame_shape();
        let skip = (offset as u64)
            .checked_mul(frame_byte_size as u64)
            .and_then(|n| n.checked_add(info.header_byte_length() as u64))
            .ok_or(PipelineError::FrameSizeOverflow)?;
        log::info!(
            "delivering frames {}..{} of {} bytes each",
            offset,
            offset + count,
            frame_byte_size
        );

        let mut cursor = StreamCursor::new(frame_byte_size, skip, offset, count);
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(frame_byte_size)
            .map_err(|_| PipelineError::FrameAllocation(frame_byte_size))?;
        frame.resize(frame_byte_size, 0);
        let mut chunk = vec![0; self.options.chunk_size];
        let mut frames_processed = 0;

        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let data = &chunk[..n];
            cursor.begin_chunk();
            while cursor.fill(data, &mut frame) == Fill::FrameReady {
                let index = cursor.frame_index();
                let view = FrameView::new(index, shape, &frame)?;
                log::debug!("frame #{} complete", index);
                let finished = handler.process_frame(index, view)?;
                frames_processed += 1;
                cursor.complete_frame(finished);
                if cursor.is_done() {
                    let end = if finished {
                        RunEnd::Finished
                    } else {
                        RunEnd::WindowExhausted
                    };
                    log::info!("stopped after {} frames ({:?})", frames_processed, end);
                    return Ok(RunSummary {
                        frames_processed,
                        bytes_consumed: cursor.bytes_consumed(),
                        trailing_bytes: 0,
                        end,
                    });
                }
            }
        }

        let trailing_bytes = cursor.bytes_accumulated();
        if trailing_bytes > 0 || cursor.skip_remaining() > 0 {
            log::warn!(
                "stream ended after {} frames with {} bytes of an incomplete frame",
                frames_processed,
                trailing_bytes
            );
        } else {
            log::info!("stream ended after {} frames", frames_processed);
        }
        Ok(RunSummary {
            frames_processed,
            bytes_consumed: cursor.bytes_consumed(),
            trailing_bytes,
            end: RunEnd::EndOfStream,
        })
    }
}
