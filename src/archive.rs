//! ZIP archive construction for exports

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::envelope::ApiError;
use crate::model::ExportFile;

/// Download name of every export archive
pub const EXPORT_FILENAME: &str = "forge_export.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        ApiError::internal(format!("failed to build export archive: {err}"))
    }
}

/// Builds a deflated archive in memory, one entry per file, in the given order
pub fn build_archive(files: &[ExportFile]) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for file in files {
        writer.start_file(file.name.as_str(), options)?;
        writer.write_all(file.contents.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}
