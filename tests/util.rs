//! Helpers for synthesizing volumes on disk.
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use nifti_framestream::{is_gz_file, Endianness, NiftiHeader, NiftiType};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Header of a 4D volume with `frames` frames of `x*y*z` voxels.
pub fn volume_header(dim: [u16; 3], frames: u16, datatype: NiftiType) -> NiftiHeader {
    NiftiHeader {
        dim: [4, dim[0], dim[1], dim[2], frames, 1, 1, 1],
        datatype: datatype as i16,
        bitpix: datatype.bitpix(),
        pixdim: [1., 2., 2., 2., 0.8, 1., 1., 1.],
        ..NiftiHeader::default()
    }
}

/// A recognizable payload: no two consecutive 251-byte runs are alike
/// within a frame.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + i / 251) % 256) as u8).collect()
}

/// Serialize a whole volume: header, empty extender and frame data.
pub fn volume_bytes(header: &NiftiHeader, data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    header.write_to(&mut bytes).unwrap();
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(data);
    bytes
}

/// Write raw file bytes, gzip-compressing them if the path ends in ".gz".
pub fn write_file(path: &Path, bytes: &[u8]) {
    if is_gz_file(path) {
        fs::write(path, gzip(bytes)).unwrap();
    } else {
        fs::write(path, bytes).unwrap();
    }
}

/// Read a file, decompressing it if the path ends in ".gz".
pub fn read_file(path: &Path) -> Vec<u8> {
    let raw = fs::read(path).unwrap();
    if is_gz_file(path) {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(&raw[..])
            .read_to_end(&mut out)
            .unwrap();
        out
    } else {
        raw
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    e.write_all(bytes).unwrap();
    e.finish().unwrap()
}

/// Write a uint8 volume of `frames` frames to `path`, returning its payload.
pub fn write_volume(path: &Path, dim: [u16; 3], frames: u16) -> Vec<u8> {
    let header = volume_header(dim, frames, NiftiType::Uint8);
    let frame_len = dim.iter().map(|d| *d as usize).product::<usize>();
    let data = payload(frame_len * frames as usize);
    write_file(path, &volume_bytes(&header, &data));
    data
}

/// Header bytes as stored by a machine of the opposite byte order.
pub fn swapped_header(header: &NiftiHeader) -> NiftiHeader {
    NiftiHeader {
        endianness: Endianness::native().to_opposite(),
        ..header.clone()
    }
}

/// A reader handing out at most `max` bytes per read call.
pub struct ChunkedReader<R> {
    inner: R,
    max: usize,
    pub reads: usize,
}

impl<R> ChunkedReader<R> {
    pub fn new(inner: R, max: usize) -> Self {
        ChunkedReader {
            inner,
            max,
            reads: 0,
        }
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let len = buf.len().min(self.max);
        self.inner.read(&mut buf[..len])
    }
}

/// A reader which fails once `ok_bytes` bytes were read.
pub struct FailingReader<R> {
    inner: R,
    ok_bytes: usize,
}

impl<R> FailingReader<R> {
    pub fn new(inner: R, ok_bytes: usize) -> Self {
        FailingReader { inner, ok_bytes }
    }
}

impl<R: Read> Read for FailingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.ok_bytes == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        }
        let len = buf.len().min(self.ok_bytes);
        let n = self.inner.read(&mut buf[..len])?;
        self.ok_bytes -= n;
        Ok(n)
    }
}
