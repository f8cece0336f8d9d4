//! Source file classification and directory scans
//!
//! `ALL`, `GLOB` and `RECURSE` expand to the files of a directory whose
//! extension is on the allow-list. Headers are included so they are
//! fingerprinted; the planner skips them for compilation.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions compiled by the C compiler
pub const C_EXTENSIONS: &[&str] = &["c"];

/// Extensions compiled by the C++ compiler
pub const CXX_EXTENSIONS: &[&str] = &["cc", "cpp", "cxx", "c++"];

/// Extensions tracked but never compiled
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "inl"];

/// Compiler family for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cxx,
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Compiler family for `path`, `None` for headers and unknown files
pub fn language_of(path: &Path) -> Option<Language> {
    let ext = extension(path)?;
    if C_EXTENSIONS.contains(&ext) {
        Some(Language::C)
    } else if CXX_EXTENSIONS.contains(&ext) {
        Some(Language::Cxx)
    } else {
        None
    }
}

/// Whether a scan picks up `path`
pub fn is_tracked(path: &Path) -> bool {
    language_of(path).is_some()
        || extension(path).is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}

/// List tracked files under `dir`, sorted by path
///
/// With `recursive = false` only direct children are considered.
pub fn scan_dir(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() && is_tracked(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_language_of() {
        assert_eq!(language_of(Path::new("a.c")), Some(Language::C));
        assert_eq!(language_of(Path::new("a.cc")), Some(Language::Cxx));
        assert_eq!(language_of(Path::new("a.cpp")), Some(Language::Cxx));
        assert_eq!(language_of(Path::new("a.h")), None);
        assert_eq!(language_of(Path::new("Makefile")), None);
    }

    #[test]
    fn test_is_tracked() {
        assert!(is_tracked(Path::new("x/y.hpp")));
        assert!(is_tracked(Path::new("x/y.cxx")));
        assert!(!is_tracked(Path::new("x/README.md")));
    }

    #[test]
    fn test_scan_recursive_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "util.c");
        touch(dir.path(), "main.c");
        touch(dir.path(), "net/socket.cpp");
        touch(dir.path(), "util.h");
        touch(dir.path(), "notes.txt");

        let files = scan_dir(dir.path(), true).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![
                PathBuf::from("main.c"),
                PathBuf::from("net/socket.cpp"),
                PathBuf::from("util.c"),
                PathBuf::from("util.h"),
            ]
        );
    }

    #[test]
    fn test_scan_flat_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main.c");
        touch(dir.path(), "nested/deep.c");

        let files = scan_dir(dir.path(), false).unwrap();
        assert_eq!(files, vec![dir.path().join("main.c")]);
    }

    #[test]
    fn test_scan_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = scan_dir(&dir.path().join("nope"), true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
