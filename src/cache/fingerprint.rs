//! File fingerprints
//!
//! A fingerprint pairs a hash of a file's path with a hash of its contents.
//! Hashes are SHA-256 truncated to 16 hex digits; a collision only costs a
//! missed rebuild skip.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::toolchain::Toolchain;

/// Content hash recorded for a file that cannot be read
pub const MISSING_HASH: &str = "0000000000000000";

/// Pseudo path of the entry that records the active toolchain
const TOOLCHAIN_ENTRY: &str = "<toolchain>";

const HASH_LEN: usize = 16;
const CHUNK_SIZE: usize = 64 * 1024;

fn truncated(hasher: Sha256) -> String {
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LEN);
    digest
}

pub fn hash_str(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    truncated(hasher)
}

fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(truncated(hasher))
}

/// Hash file contents in fixed-size chunks; unreadable files get
/// [`MISSING_HASH`]
pub fn hash_file(path: &Path) -> String {
    match File::open(path).and_then(hash_reader) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::debug!("Cannot hash {}: {}", path.display(), e);
            MISSING_HASH.to_string()
        }
    }
}

/// Fingerprint of one tracked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub name_hash: String,
    pub content_hash: String,
}

impl Fingerprint {
    pub fn compute(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name_hash: hash_str(&path.to_string_lossy()),
            content_hash: hash_file(path),
        }
    }

    /// Entry for the compiler commands a target was built with
    pub fn toolchain(toolchain: &Toolchain) -> Self {
        let commands = format!("{} {} {}", toolchain.id, toolchain.cc, toolchain.cxx);
        Self {
            path: PathBuf::from(TOOLCHAIN_ENTRY),
            name_hash: hash_str(TOOLCHAIN_ENTRY),
            content_hash: hash_str(&commands),
        }
    }

    /// `<name-hash> <content-hash>`
    pub fn line(&self) -> String {
        format!("{} {}", self.name_hash, self.content_hash)
    }
}

/// Ordered fingerprints of every file a target depends on, followed by
/// the toolchain entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    entries: Vec<Fingerprint>,
}

impl FingerprintSet {
    pub fn compute(files: &[PathBuf], toolchain: &Toolchain) -> Self {
        let mut entries: Vec<Fingerprint> = files.iter().map(|f| Fingerprint::compute(f)).collect();
        entries.push(Fingerprint::toolchain(toolchain));
        Self { entries }
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(Fingerprint::line).collect()
    }

    /// File contents as persisted, one line per entry
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
