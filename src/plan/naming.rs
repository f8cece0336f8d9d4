//! Output paths for objects and artifacts

use std::path::{Component, Path, PathBuf};

use crate::config::LayoutConfig;
use crate::project::{HostOs, Target, TargetKind};

/// Per-project output directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub obj: PathBuf,
    pub bin: PathBuf,
    pub lib: PathBuf,
    pub cache: PathBuf,
}

impl OutputDirs {
    pub fn for_root(root: &Path, layout: &LayoutConfig) -> Self {
        let build = root.join(&layout.build_dir);
        Self {
            obj: build.join("obj"),
            bin: build.join("bin"),
            lib: build.join("lib"),
            cache: build.join("cache"),
        }
    }
}

/// Object file name for `source`: its path relative to `root` with
/// separators flattened to `_`, plus `.o`
///
/// `root/src/net/socket.c` becomes `src_net_socket.c.o`.
pub fn object_name(root: &Path, source: &Path) -> String {
    let relative = source.strip_prefix(root).unwrap_or(source);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    format!("{}.o", parts.join("_"))
}

/// File name of the artifact a target produces, `None` for interfaces
pub fn artifact_file_name(kind: TargetKind, name: &str, os: HostOs) -> Option<String> {
    let windows = os == HostOs::Windows;
    let file = match kind {
        TargetKind::Executable if windows => format!("{}.exe", name),
        TargetKind::Executable => name.to_string(),
        TargetKind::StaticLibrary if windows => format!("{}.lib", name),
        TargetKind::StaticLibrary => format!("lib{}.a", name),
        TargetKind::DynamicLibrary if windows => format!("{}.dll", name),
        TargetKind::DynamicLibrary if os == HostOs::MacOs => format!("lib{}.dylib", name),
        TargetKind::DynamicLibrary => format!("lib{}.so", name),
        TargetKind::Interface => return None,
    };
    Some(file)
}

/// Full artifact path of `target`, `None` for interfaces
pub fn artifact_path(target: &Target, layout: &LayoutConfig, os: HostOs) -> Option<PathBuf> {
    if !target.kind.produces_artifact() {
        return None;
    }
    let file = artifact_file_name(target.kind, &target.name, os)?;
    let dirs = OutputDirs::for_root(&target.root, layout);
    let dir = match target.kind {
        TargetKind::StaticLibrary => dirs.lib,
        _ => dirs.bin,
    };
    Some(dir.join(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_flattens_directories() {
        let root = Path::new("/proj");
        assert_eq!(object_name(root, Path::new("/proj/src/main.c")), "src_main.c.o");
        assert_eq!(
            object_name(root, Path::new("/proj/src/net/socket.cpp")),
            "src_net_socket.cpp.o"
        );
    }

    #[test]
    fn test_object_names_do_not_collide() {
        let root = Path::new("/proj");
        let a = object_name(root, Path::new("/proj/src/a/util.c"));
        let b = object_name(root, Path::new("/proj/src/b/util.c"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_object_name_relative_root() {
        assert_eq!(object_name(Path::new("."), Path::new("./src/main.c")), "src_main.c.o");
    }

    #[test]
    fn test_artifact_names_per_platform() {
        use TargetKind::*;
        assert_eq!(artifact_file_name(Executable, "app", HostOs::Linux).unwrap(), "app");
        assert_eq!(artifact_file_name(Executable, "app", HostOs::Windows).unwrap(), "app.exe");
        assert_eq!(artifact_file_name(StaticLibrary, "core", HostOs::Linux).unwrap(), "libcore.a");
        assert_eq!(artifact_file_name(StaticLibrary, "core", HostOs::Windows).unwrap(), "core.lib");
        assert_eq!(artifact_file_name(DynamicLibrary, "gfx", HostOs::Linux).unwrap(), "libgfx.so");
        assert_eq!(artifact_file_name(DynamicLibrary, "gfx", HostOs::MacOs).unwrap(), "libgfx.dylib");
        assert_eq!(artifact_file_name(DynamicLibrary, "gfx", HostOs::Windows).unwrap(), "gfx.dll");
        assert!(artifact_file_name(Interface, "flags", HostOs::Linux).is_none());
    }

    #[test]
    fn test_artifact_path_directories() {
        let layout = LayoutConfig::default();
        let core = Target::new(TargetKind::StaticLibrary, "core", "/p");
        let app = Target::new(TargetKind::Executable, "app", "/p");

        assert_eq!(
            artifact_path(&core, &layout, HostOs::Linux).unwrap(),
            PathBuf::from("/p/build/lib/libcore.a")
        );
        assert_eq!(
            artifact_path(&app, &layout, HostOs::Linux).unwrap(),
            PathBuf::from("/p/build/bin/app")
        );

        let flags = Target::new(TargetKind::Interface, "flags", "/p");
        assert!(artifact_path(&flags, &layout, HostOs::Linux).is_none());
    }
}
