//! `compile_cpp.toml` parsing.
//!
//! Every key is optional. Directories are relative to the working directory.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::BuildError;
use crate::toolchain::CompilerType;

pub const CONFIG_FILE: &str = "compile_cpp.toml";

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
pub struct CompileConfig {
    #[serde(default)]
    pub defines: Vec<String>,
    /// Extra staleness inputs for the main compilation
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Extra flags keyed by compiler (`cl`, `clang++`, `g++`)
    #[serde(default)]
    pub flags: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub includes: Vec<String>,
    /// `name = [source, dependency...]`, in the order they appear in the file
    #[serde(default, deserialize_with = "modules_in_file_order")]
    pub modules: Vec<(String, Vec<String>)>,
    pub output: Option<String>,
    #[serde(default)]
    pub pass_args: Vec<String>,
    /// `[std_module.<os>]` tables keyed by compiler
    #[serde(default)]
    pub std_module: HashMap<String, HashMap<String, String>>,
}

/// Modules are built in declaration order, so the table must not be sorted.
fn modules_in_file_order<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<String>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Ordered;

    impl<'de> Visitor<'de> for Ordered {
        type Value = Vec<(String, Vec<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of module name = [source, dependency...]")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut modules = Vec::new();
            while let Some(entry) = map.next_entry::<String, Vec<String>>()? {
                modules.push(entry);
            }
            Ok(modules)
        }
    }

    deserializer.deserialize_map(Ordered)
}

impl CompileConfig {
    pub fn parse(content: &str) -> Result<Self, BuildError> {
        toml::from_str(content).map_err(|e| BuildError::Config(e.to_string()))
    }

    /// Reads `compile_cpp.toml` from `dir`, if there is one.
    pub fn load(dir: &Path) -> Result<Option<Self>, BuildError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Self::parse(&content).map(Some)
    }

    pub fn flags_for(&self, compiler: CompilerType) -> &[String] {
        self.flags
            .get(compiler.command_name())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Standard library module path for this OS (`std::env::consts::OS`) and compiler.
    pub fn std_module_for(&self, os: &str, compiler: CompilerType) -> Option<&str> {
        self.std_module
            .get(os)
            .and_then(|by_compiler| by_compiler.get(compiler.command_name()))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
defines = ["BS_THREAD_POOL_NATIVE_EXTENSIONS"]
dependencies = ["include/BS_thread_pool.hpp"]
includes = ["include"]
output = "build/"
pass_args = ["log"]

[flags]
"g++" = ["-Wall", "-Wextra"]
cl = ["/W4"]

[modules]
"BS.thread_pool" = ["modules/BS.thread_pool.cppm", "include/BS_thread_pool.hpp"]

[std_module.linux]
"clang++" = "auto"
"g++" = ""

[std_module.windows]
cl = "C:/VS/modules/std.ixx"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = CompileConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.defines, ["BS_THREAD_POOL_NATIVE_EXTENSIONS"]);
        assert_eq!(config.output.as_deref(), Some("build/"));
        assert_eq!(config.flags_for(CompilerType::GCC), ["-Wall", "-Wextra"]);
        assert!(config.flags_for(CompilerType::Clang).is_empty());
        assert_eq!(config.modules[0].0, "BS.thread_pool");
        assert_eq!(config.modules[0].1.len(), 2);
    }

    #[test]
    fn test_std_module_lookup() {
        let config = CompileConfig::parse(SAMPLE).unwrap();
        assert_eq!(
            config.std_module_for("linux", CompilerType::Clang),
            Some("auto")
        );
        // Empty entries are ignored
        assert_eq!(config.std_module_for("linux", CompilerType::GCC), None);
        assert_eq!(config.std_module_for("macos", CompilerType::Clang), None);
        assert_eq!(
            config.std_module_for("windows", CompilerType::MSVC),
            Some("C:/VS/modules/std.ixx")
        );
    }

    #[test]
    fn test_modules_keep_declaration_order() {
        let config = CompileConfig::parse(
            r#"
[modules]
zeta = ["zeta.ixx"]
alpha = ["alpha.ixx", "zeta.ixx"]
mid = ["mid.ixx"]
"#,
        )
        .unwrap();
        let names: Vec<&str> = config.modules.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(CompileConfig::parse("").unwrap(), CompileConfig::default());
    }

    #[test]
    fn test_malformed_config() {
        let err = CompileConfig::parse("defines = \"not a list\"").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CompileConfig::load(dir.path()).unwrap().is_none());
        fs::write(dir.path().join(CONFIG_FILE), "includes = [\"inc\"]").unwrap();
        let loaded = CompileConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.includes, ["inc"]);
    }
}
