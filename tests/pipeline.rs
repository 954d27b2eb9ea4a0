mod util;

use nifti_framestream::{
    process_file, FrameView, HeaderProbe, IdentityTransform, NiftiType, OwnedFrame,
    PipelineError, Result, RunEnd, StreamOptions, WriterOptions,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use util::{payload, read_file, volume_bytes, volume_header, write_file, write_volume};

#[test]
fn identity_recompresses_volume() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let input = dir.path().join("bold.nii");
    let output = dir.path().join("bold.nii.gz");
    let _ = write_volume(&input, [10, 10, 4], 7);

    let summary = process_file(
        &input,
        &output,
        IdentityTransform,
        StreamOptions::new(),
        WriterOptions::new(),
    )
    .unwrap();
    assert_eq!(summary.frames_processed, 7);
    assert_eq!(summary.end, RunEnd::Finished);
    assert_eq!(read_file(&output), fs::read(&input).unwrap());
}

#[test]
fn window_becomes_its_own_volume() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bold.nii.gz");
    let output = dir.path().join("bold_b.nii");
    let data = write_volume(&input, [3, 2, 2], 10);

    let options = StreamOptions::new().frame_offset(4).total_frames(5).chunk_size(17);
    let summary =
        process_file(&input, &output, IdentityTransform, options, WriterOptions::new()).unwrap();
    assert_eq!(summary.frames_processed, 5);

    let info = HeaderProbe::probe(&output).unwrap();
    assert_eq!(info.num_frames(), 5);
    assert_eq!(info.dimensions(), [3, 2, 2, 5, 1]);
    assert_eq!(&fs::read(&output).unwrap()[352..], &data[4 * 12..9 * 12]);
}

#[test]
fn window_past_the_end_is_clamped() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("short.nii");
    let output = dir.path().join("tail.nii");
    let data = write_volume(&input, [2, 2, 1], 6);

    let options = StreamOptions::new().frame_offset(4).total_frames(100);
    let _ = process_file(&input, &output, IdentityTransform, options, WriterOptions::new()).unwrap();
    assert_eq!(HeaderProbe::probe(&output).unwrap().num_frames(), 2);
    assert_eq!(&fs::read(&output).unwrap()[352..], &data[16..]);
}

#[test]
fn transform_may_change_voxel_type() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("counts.nii");
    let output = dir.path().join("scaled.nii.gz");
    let data = write_volume(&input, [4, 3, 2], 3);

    let scale = |_: usize, frame: FrameView<'_>| -> Result<OwnedFrame> {
        let voxels: Vec<f32> = frame.raw_data().iter().map(|&v| f32::from(v) / 2.).collect();
        OwnedFrame::from_voxels(frame.shape().dim(), NiftiType::Float32, &voxels)
    };
    let _ = process_file(&input, &output, scale, StreamOptions::new(), WriterOptions::new())
        .unwrap();

    let info = HeaderProbe::probe(&output).unwrap();
    assert_eq!(info.datatype(), NiftiType::Float32);
    assert_eq!(info.num_frames(), 3);
    let bytes = read_file(&output);
    let expected: Vec<u8> = data
        .iter()
        .flat_map(|&v| (f32::from(v) / 2.).to_ne_bytes().to_vec())
        .collect();
    assert_eq!(&bytes[352..], &expected[..]);
}

#[test]
fn truncated_input_yields_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("cut.nii.gz");
    let output = dir.path().join("out.nii.gz");
    let header = volume_header([4, 4, 4], 5, NiftiType::Uint8);
    let bytes = volume_bytes(&header, &payload(5 * 64));
    write_file(&input, &bytes[..352 + 3 * 64 + 10]);

    match process_file(
        &input,
        &output,
        IdentityTransform,
        StreamOptions::new(),
        WriterOptions::new(),
    ) {
        Err(PipelineError::IncompleteOutput(3, 5)) => {}
        other => panic!("unexpected result {:?}", other),
    }
    assert!(!output.exists());
    let leftovers = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn transform_failure_aborts_pipeline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.nii");
    let output = dir.path().join("out.nii");
    let _ = write_volume(&input, [2, 2, 2], 4);

    let mut seen = Vec::new();
    let flaky = |index: usize, frame: FrameView<'_>| -> Result<OwnedFrame> {
        seen.push(index);
        if index == 1 {
            return Err(PipelineError::handler(format!("cannot register frame {}", index)));
        }
        Ok(frame.to_owned_frame())
    };
    match process_file(&input, &output, flaky, StreamOptions::new(), WriterOptions::new()) {
        Err(PipelineError::Handler(e)) => assert_eq!(e.to_string(), "cannot register frame 1"),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(seen, vec![0, 1]);
    assert!(!output.exists());
}

#[test]
fn partial_output_stops_reading_early() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("long.nii.gz");
    let output = dir.path().join("head.nii.gz");
    let _ = write_volume(&input, [8, 8, 8], 20);

    let summary = process_file(
        &input,
        &output,
        IdentityTransform,
        StreamOptions::new(),
        WriterOptions::new().partial_frames(2),
    )
    .unwrap();
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.end, RunEnd::Finished);
    assert_eq!(summary.bytes_consumed, 352 + 2 * 512);
    assert_eq!(HeaderProbe::probe(&output).unwrap().num_frames(), 2);
}
