#![no_main]
use libfuzzer_sys::fuzz_target;
use nifti_framestream::{HeaderProbe, NiftiHeader};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NiftiHeader::from_reader(data) {
        let _ = header.data_type();
        let _ = header.rank();
        let _ = header.is_byte_swapped();
    }
    if let Ok(info) = HeaderProbe::inspect_reader(data) {
        let _ = info.frame_shape();
        let _ = info.num_frames();
    }
});
