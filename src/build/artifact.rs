//! Artifact naming.
//!
//! Names encode stem, build type, compiler and standard
//! (`main_debug-gcc-cpp23`, `util_module_release-clang-cpp20.pcm`), so each
//! combination keeps its own artifacts and the name itself works as a cache key.

use std::path::{Path, PathBuf};

use crate::options::{BuildOptions, BuildType, OutputLocation, Standard};
use crate::toolchain::{Backend, CompilerType};

/// `<type>-<compiler>-cpp<NN>`
pub fn suffix(compiler: CompilerType, build_type: BuildType, std: Standard) -> String {
    format!(
        "{}-{}-cpp{}",
        build_type.as_str(),
        compiler.short_name(),
        std.year()
    )
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string())
}

/// Where one invocation writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub build_folder: PathBuf,
    /// The binary, or the module artifact for `--as-module` builds
    pub binary: PathBuf,
    suffix: String,
}

impl ArtifactLayout {
    pub fn new(options: &BuildOptions, compiler: CompilerType) -> Self {
        let suffix = suffix(compiler, options.build_type, options.std);
        let auto_name = || {
            let first = options.files.first().map(|f| stem(f)).unwrap_or_default();
            let extension = if cfg!(windows) { ".exe" } else { "" };
            format!("{}_{}{}", first, suffix, extension)
        };
        let (build_folder, binary) = match &options.output {
            OutputLocation::Auto => {
                let dir = options.work_dir.clone();
                let binary = dir.join(auto_name());
                (dir, binary)
            }
            OutputLocation::Directory(dir) => (dir.clone(), dir.join(auto_name())),
            OutputLocation::Binary(path) => {
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| options.work_dir.clone());
                (dir, path.clone())
            }
        };
        Self {
            build_folder,
            binary,
            suffix,
        }
    }

    /// `<build folder>/<source stem>_module_<suffix><ext>`
    pub fn module_artifact(&self, source: &Path, backend: &dyn Backend) -> PathBuf {
        self.build_folder.join(format!(
            "{}_module_{}{}",
            stem(source),
            self.suffix,
            backend.module_extension()
        ))
    }
}
