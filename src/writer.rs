//! Incremental, frame-by-frame writing of volumes.
//!
//! Frames are appended to a temporary file placed next to the destination.
//! The header is written along with the first frame, and once the last frame
//! arrives the temporary file is closed and either gzip-compressed into the
//! destination (if its name ends with ".gz") or copied there verbatim. The
//! temporary file is removed in every case, including when writing fails or
//! the writer is dropped before completion.

use crate::error::{PipelineError, Result};
use crate::frame::{FrameShape, FrameView, OwnedFrame};
use crate::header::{NiftiHeader, HEADER_SIZE, MAGIC_CODE_NIP1};
use crate::probe::VolumeHeaderInfo;
use crate::util::is_gz_file;
use byteordered::Endianness;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Options for writing an output volume.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    partial_frames: Option<usize>,
    compression: Compression,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            partial_frames: None,
            compression: Compression::default(),
        }
    }
}

impl WriterOptions {
    /// Write the full number of frames, with default gzip compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish the output after `partial_frames` frames instead of the full
    /// count, for writers that only cover a sub-range of a series.
    pub fn partial_frames(mut self, partial_frames: usize) -> Self {
        self.partial_frames = Some(partial_frames);
        self
    }

    /// Compression level used when the destination is a ".gz" file.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// The temporary file receiving an output volume under construction.
#[derive(Debug)]
pub struct OutputFileHandle {
    file: BufWriter<NamedTempFile>,
    bytes_written: u64,
}

impl OutputFileHandle {
    fn create(dir: &Path) -> io::Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(".framestream-")
            .suffix(".nii.part")
            .tempfile_in(dir)?;
        Ok(OutputFileHandle {
            file: BufWriter::new(temp),
            bytes_written: 0,
        })
    }

    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush and close the file, keeping it on disk until the returned path
    /// is dropped.
    fn close(self) -> io::Result<TempPath> {
        let temp = self.file.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        Ok(temp.into_temp_path())
    }

    /// Location of the temporary file.
    pub fn temp_path(&self) -> &Path {
        self.file.get_ref().path()
    }

    /// Number of bytes appended so far, header included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Writes a volume one frame at a time.
///
/// Frame indices are local to the output: the first frame written is frame
/// 0, whatever its position in the source volume.
#[derive(Debug)]
pub struct FrameWriter {
    output_path: PathBuf,
    template: NiftiHeader,
    extension_bytes: Vec<u8>,
    total_frames: usize,
    frames_to_write: usize,
    compression: Compression,
    handle: Option<OutputFileHandle>,
    frame_shape: Option<FrameShape>,
    frames_written: usize,
    bytes_written: u64,
    finished: bool,
}

impl FrameWriter {
    /// Create a writer for a series of `total_frames` frames, taking the
    /// header (and extensions) of the probed volume `template` as reference.
    pub fn new<P>(
        output_path: P,
        template: &VolumeHeaderInfo,
        total_frames: usize,
        options: WriterOptions,
    ) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        Self::from_header(
            output_path,
            template.header().clone(),
            template.extension_bytes().to_vec(),
            total_frames,
            options,
        )
    }

    /// Create a writer from a reference header. `extension_bytes` is written
    /// verbatim after the header; if empty, an empty extender is written.
    ///
    /// All header fields are copied from `template`, except for the
    /// dimensions, data type and voxel offset, which depend on the frames
    /// written.
    pub fn from_header<P>(
        output_path: P,
        template: NiftiHeader,
        extension_bytes: Vec<u8>,
        total_frames: usize,
        options: WriterOptions,
    ) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        if total_frames == 0 {
            return Err(PipelineError::InvalidOption("total_frames", "must be positive"));
        }
        let frames_to_write = match options.partial_frames {
            Some(0) => {
                return Err(PipelineError::InvalidOption("partial_frames", "must be positive"))
            }
            Some(n) if n > total_frames => {
                return Err(PipelineError::InvalidOption(
                    "partial_frames",
                    "cannot exceed the total number of frames",
                ))
            }
            Some(n) => n,
            None => total_frames,
        };
        if frames_to_write > usize::from(u16::MAX) {
            return Err(PipelineError::InvalidOption(
                "total_frames",
                "does not fit in the header's dimension field",
            ));
        }
        let extension_bytes = if extension_bytes.is_empty() {
            vec![0; 4]
        } else {
            extension_bytes
        };
        Ok(FrameWriter {
            output_path: output_path.into(),
            template,
            extension_bytes,
            total_frames,
            frames_to_write,
            compression: options.compression,
            handle: None,
            frame_shape: None,
            frames_written: 0,
            bytes_written: 0,
            finished: false,
        })
    }

    /// Append frame `index` to the output. Returns `true` once the last
    /// frame was written and the output file is complete.
    ///
    /// # Errors
    ///
    /// - `PipelineError::FrameOutOfOrder` if `index` is not the next frame.
    /// - `PipelineError::FrameShapeMismatch` if the frame's shape differs
    ///   from the first frame.
    /// - `PipelineError::WriteFrame` or `PipelineError::WriteFinalize` on I/O
    ///   failure, in which case the temporary file is removed and the writer
    ///   cannot be used anymore.
    pub fn write_frame(&mut self, index: usize, frame: FrameView<'_>) -> Result<bool> {
        if self.finished {
            return Err(PipelineError::WriterFinished);
        }
        if index != self.frames_written {
            return Err(PipelineError::FrameOutOfOrder(self.frames_written, index));
        }

        let shape = frame.shape();
        match self.frame_shape {
            Some(expected) if expected != shape => {
                return Err(PipelineError::FrameShapeMismatch(
                    expected.byte_len(),
                    shape.byte_len(),
                ));
            }
            Some(_) => {}
            None => {
                if let Err(e) = self.open(index, shape) {
                    self.abort();
                    return Err(e);
                }
                self.frame_shape = Some(shape);
            }
        }

        let appended = match self.handle.as_mut() {
            Some(handle) => handle.append(frame.raw_data()),
            None => return Err(PipelineError::WriterFinished),
        };
        if let Err(e) = appended {
            self.abort();
            return Err(PipelineError::WriteFrame(index, e));
        }
        self.frames_written += 1;
        log::debug!("frame #{} written to {}", index, self.output_path.display());

        if self.frames_written == self.frames_to_write {
            self.finalize()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Append an owned frame. See [`write_frame`](#method.write_frame).
    pub fn write_owned(&mut self, index: usize, frame: &OwnedFrame) -> Result<bool> {
        self.write_frame(index, frame.view(index))
    }

    /// The header the output file starts with, given the shape of its frames.
    pub fn output_header(&self, shape: FrameShape) -> NiftiHeader {
        let [x, y, z] = shape.dim();
        NiftiHeader {
            sizeof_hdr: HEADER_SIZE as i32,
            dim: [4, x, y, z, self.frames_to_write as u16, 1, 1, 1],
            datatype: shape.datatype() as i16,
            bitpix: shape.datatype().bitpix(),
            vox_offset: (HEADER_SIZE + self.extension_bytes.len()) as f32,
            magic: *MAGIC_CODE_NIP1,
            endianness: Endianness::native(),
            ..self.template.clone()
        }
    }

    fn open(&mut self, index: usize, shape: FrameShape) -> Result<()> {
        let dir = match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut header = Vec::with_capacity(HEADER_SIZE + self.extension_bytes.len());
        self.output_header(shape).write_to(&mut header)?;
        header.extend_from_slice(&self.extension_bytes);

        let mut handle =
            OutputFileHandle::create(dir).map_err(|e| PipelineError::WriteFrame(index, e))?;
        handle
            .append(&header)
            .map_err(|e| PipelineError::WriteFrame(index, e))?;
        log::debug!(
            "started {} in {}",
            self.output_path.display(),
            handle.temp_path().display()
        );
        self.handle = Some(handle);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Err(PipelineError::WriterFinished),
        };
        self.bytes_written = handle.bytes_written();
        // no further frames are accepted, whether or not the output lands
        self.finished = true;
        let dest = self.output_path.as_path();
        let finalize_err = |e| PipelineError::WriteFinalize(dest.to_path_buf(), e);

        let temp_path = handle.close().map_err(finalize_err)?;
        let written = if is_gz_file(dest) {
            compress_file(&temp_path, dest, self.compression)
        } else {
            copy_file(&temp_path, dest)
        }
        .map_err(finalize_err)?;
        temp_path.close().map_err(finalize_err)?;

        log::info!(
            "wrote {} frames ({} bytes) to {}",
            self.frames_written,
            written,
            dest.display()
        );
        Ok(())
    }

    fn abort(&mut self) {
        // dropping the handle removes the temporary file
        if self.handle.take().is_some() {
            log::warn!("discarded incomplete output {}", self.output_path.display());
        }
        self.finished = true;
    }

    /// Destination of the output volume.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Number of frames in the full output series.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Number of frames after which this writer completes the output.
    pub fn frames_to_write(&self) -> usize {
        self.frames_to_write
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Bytes written to the temporary file so far, header included.
    pub fn bytes_written(&self) -> u64 {
        match &self.handle {
            Some(handle) => handle.bytes_written(),
            None => self.bytes_written,
        }
    }

    /// The temporary file, while the output is under construction.
    pub fn handle(&self) -> Option<&OutputFileHandle> {
        self.handle.as_ref()
    }

    /// Whether the writer accepts no more frames, either because the output
    /// is complete or because writing failed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::warn!(
                "dropped after {} of {} frames, {} not written",
                self.frames_written,
                self.frames_to_write,
                self.output_path.display()
            );
        }
    }
}

/// Removes a partially written destination unless committed.
struct DestinationGuard<'a> {
    path: &'a Path,
    committed: bool,
}

impl<'a> DestinationGuard<'a> {
    fn new(path: &'a Path) -> Self {
        DestinationGuard {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for DestinationGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(self.path);
        }
    }
}

/// Gzip-compress the file at `src` into `dest`, returning the number of
/// uncompressed bytes. On failure, `dest` is removed.
pub fn compress_file<P, Q>(src: P, dest: Q, compression: Compression) -> io::Result<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let dest = dest.as_ref();
    let mut input = BufReader::new(File::open(src)?);
    let output = BufWriter::new(File::create(dest)?);
    let guard = DestinationGuard::new(dest);
    let mut encoder = GzEncoder::new(output, compression);
    let n = io::copy(&mut input, &mut encoder)?;
    let output = encoder.finish()?;
    output.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    guard.commit();
    Ok(n)
}

/// Copy the file at `src` verbatim into `dest`, returning the number of
/// bytes copied. On failure, `dest` is removed.
pub fn copy_file<P, Q>(src: P, dest: Q) -> io::Result<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let dest = dest.as_ref();
    let mut input = BufReader::new(File::open(src)?);
    let mut output = BufWriter::new(File::create(dest)?);
    let guard = DestinationGuard::new(dest);
    let n = io::copy(&mut input, &mut output)?;
    output.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    guard.commit();
    Ok(n)
}
