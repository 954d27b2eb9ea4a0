//! An application for copying a window of frames from one NIFTI-1 volume
//! into another, frame by frame.
//!
//! Usage: `reframe <input> <output> [frame_offset [total_frames]]`
//!
//! The output is gzip-compressed if its name ends with ".gz".

use nifti_framestream::{process_file, HeaderProbe, IdentityTransform, StreamOptions, WriterOptions};
use std::env;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let input = args.next().expect("Path to input NIFTI file is required");
    let output = args.next().expect("Path to output NIFTI file is required");
    let mut options = StreamOptions::new();
    if let Some(offset) = args.next() {
        options = options.frame_offset(offset.parse().expect("Invalid frame offset"));
    }
    if let Some(total) = args.next() {
        options = options.total_frames(total.parse().expect("Invalid frame count"));
    }

    let info = HeaderProbe::probe(&input).expect("Failed to read NIFTI header");
    println!(
        "{}: {:?} {:?}, {} frames of {} bytes",
        input,
        info.dimensions(),
        info.datatype(),
        info.num_frames(),
        info.frame_byte_size()
    );

    let summary = process_file(&input, &output, IdentityTransform, options, WriterOptions::new())
        .expect("Failed to reframe volume");
    println!(
        "{}: {} frames written ({} bytes read)",
        output, summary.frames_processed, summary.bytes_consumed
    );
}
