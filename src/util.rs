//! Private utility module
use either::Either;
use flate2::bufread::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Result as IoResult};
use std::path::Path;

/// A file which may or may not be transparently decompressed with gzip.
pub type MaybeGzDecodedFile = Either<BufReader<File>, GzDecoder<BufReader<File>>>;

/// Whether the given path names a gzip-compressed file.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Open a file for reading, piping it through a gzip decoder
/// if its name ends with ".gz".
pub fn open_file_maybe_gz<P>(path: P) -> IoResult<MaybeGzDecodedFile>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    if is_gz_file(path) {
        Ok(Either::Right(GzDecoder::new(file)))
    } else {
        Ok(Either::Left(file))
    }
}

#[cfg(test)]
mod tests {
    use super::is_gz_file;

    #[test]
    fn filenames() {
        assert!(!is_gz_file("/path/to/something.nii"));
        assert!(is_gz_file("/path/to/something.nii.gz"));
        assert!(!is_gz_file("volume.nii"));
        assert!(is_gz_file("volume.nii.gz"));
        assert!(!is_gz_file("1.2.3.nii"));
        assert!(is_gz_file("1.2.3.nii.gz"));
        assert!(!is_gz_file("not_compressed"));
        assert!(!is_gz_file("/path/to/gz/not_compressed"));
        assert!(is_gz_file("/path/to/gz/compressed.gz"));
        assert!(!is_gz_file("/"));
    }
}
