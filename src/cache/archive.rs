//! Gzip tar packing of installed module trees
//!
//! Archives hold a single top-level `node_modules/` directory, so
//! unpacking into a project directory recreates `<project>/node_modules`.

use crate::error::{NpmCacheError, NpmCacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tar::{Archive, Builder};
use tracing::debug;

/// Directory name of the installed module tree
pub const MODULES_DIR: &str = "node_modules";

/// File name of the exported archive
pub const ARCHIVE_NAME: &str = "node_modules.tar.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Pack `<root>/node_modules` into a gzip tar at `dest`, replacing any
/// existing file
pub fn pack_modules(root: &Path, dest: &Path) -> NpmCacheResult<u64> {
    let modules = root.join(MODULES_DIR);
    let fail = |reason: String| NpmCacheError::ArchiveCreate {
        path: dest.to_path_buf(),
        reason,
    };

    debug!("Packing {} into {}", modules.display(), dest.display());

    let file = File::create(dest).map_err(|e| fail(e.to_string()))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    builder
        .append_dir_all(MODULES_DIR, &modules)
        .map_err(|e| fail(format!("tar append failed: {}", e)))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| fail(format!("tar finalize failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| fail(format!("gzip finish failed: {}", e)))?;

    let size = std::fs::metadata(dest)
        .map_err(|e| fail(e.to_string()))?
        .len();
    debug!("Archive size: {} bytes", size);
    Ok(size)
}

/// Unpack an archive into `target`.
///
/// Accepts both gzip-compressed and plain tar input, since an HTTP layer
/// may already have removed the gzip content encoding.
pub fn unpack_modules(archive: &Path, target: &Path) -> NpmCacheResult<()> {
    let fail = |reason: String| NpmCacheError::ExtractFailed {
        path: archive.to_path_buf(),
        reason,
    };

    let mut file = File::open(archive).map_err(|e| fail(e.to_string()))?;
    let mut magic = [0u8; 2];
    let gzipped = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) => return Err(fail(format!("archive too short: {}", e))),
    };
    file.seek(SeekFrom::Start(0))
        .map_err(|e| fail(e.to_string()))?;

    std::fs::create_dir_all(target).map_err(|e| fail(e.to_string()))?;

    debug!(
        "Unpacking {} into {} (gzip: {})",
        archive.display(),
        target.display(),
        gzipped
    );

    let reader = BufReader::new(file);
    let result = if gzipped {
        Archive::new(GzDecoder::new(reader)).unpack(target)
    } else {
        Archive::new(reader).unpack(target)
    };

    result.map_err(|e| fail(e.to_string()))
}
