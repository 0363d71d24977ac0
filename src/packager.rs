// src/packager.rs

//! Turns a raw Python snippet into a deployable archive.
//!
//! The snippet is wrapped in a fixed entry point:
//!
//! ```text
//! def main(event, context):
//! 	<line 1>
//! 	<line 2>
//! ```
//!
//! and written as the only member of a zip archive. The snippet is not
//! validated; a blank line becomes a lone tab and may fail at runtime.

use crate::error::PackagingError;

use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the single archive member.
pub const MEMBER_NAME: &str = "handler.py";

/// Handler the backend calls: `<module>.<function>`.
pub const HANDLER: &str = "handler.main";

/// First line of every wrapped snippet.
pub const ENTRY_POINT: &str = "def main(event, context):";

const INDENT: &str = "\t";

/// A packaged snippet, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct ExecutionArtifact {
    /// Zip archive bytes.
    pub bytes: Vec<u8>,

    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
}

/// Wrap `source` in the entry point, indenting every line once.
///
/// Lines end at `\n` or `\r\n`; a `\r` not followed by `\n` stays in the
/// line. A final line terminator does not start another line, so
/// `"return 1\n"` yields one indented line, not a trailing lone tab. An empty
/// snippet produces the entry point alone.
pub fn wrap_source(source: &str) -> String {
    let mut out = String::with_capacity(ENTRY_POINT.len() + source.len() * 2 + 1);
    out.push_str(ENTRY_POINT);
    out.push('\n');

    for line in source.lines() {
        out.push_str(INDENT);
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Package `source` into a single-member zip archive.
pub fn package(source: &str) -> Result<ExecutionArtifact, PackagingError> {
    tracing::debug!("packaging snippet ({} bytes)", source.len());

    let code = wrap_source(source);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    writer.start_file(MEMBER_NAME, options)?;
    writer.write_all(code.as_bytes())?;

    let bytes = writer.finish()?.into_inner();
    let sha256 = sha256_hex(&bytes);

    tracing::debug!(size = bytes.len(), %sha256, "archive generated");

    Ok(ExecutionArtifact { bytes, sha256 })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
