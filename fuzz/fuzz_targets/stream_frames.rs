#![no_main]
use libfuzzer_sys::fuzz_target;
use nifti_framestream::{FrameStreamReader, FrameView, HeaderProbe, Result, StreamOptions};

fuzz_target!(|data: &[u8]| {
    let info = match HeaderProbe::inspect_reader(data) {
        Ok(info) => info,
        Err(_) => return,
    };
    let reader = FrameStreamReader::new(StreamOptions::new().chunk_size(97));
    let _ = reader.run_reader(data, &info, &mut |_: usize, frame: FrameView<'_>| -> Result<bool> {
        let _ = frame.raw_data().len();
        Ok(false)
    });
});
