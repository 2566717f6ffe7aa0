//! Command synthesis.
//!
//! Turns resolved options, the backend and the module import flags into one
//! argument vector. The layout itself belongs to each backend
//! ([`Backend::command`]).

use crate::build::artifact::ArtifactLayout;
use crate::options::BuildOptions;
use crate::toolchain::Toolchain;
use crate::toolchain::backend::CommandContext;

/// Builds the full compiler invocation, program first.
pub fn synthesize(
    toolchain: &Toolchain,
    options: &BuildOptions,
    imports: &[String],
    layout: &ArtifactLayout,
) -> Vec<String> {
    let ctx = CommandContext {
        exe: &toolchain.cxx_path,
        options,
        imports,
        output: &layout.binary,
        build_folder: &layout.build_folder,
    };
    toolchain.backend().command(&ctx)
}

/// Joins arguments the way the MSVC C runtime splits them back apart.
/// Also used to print commands in verbose mode.
pub fn windows_command_line<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::new();
    for arg in args {
        let arg = arg.as_ref();
        if !out.is_empty() {
            out.push(' ');
        }
        let quote = arg.is_empty() || arg.contains(' ') || arg.contains('\t');
        if quote {
            out.push('"');
        }
        let mut backslashes = 0usize;
        for c in arg.chars() {
            match c {
                '\\' => backslashes += 1,
                '"' => {
                    // Backslashes before a quote are escaped, then the quote itself.
                    out.push_str(&"\\".repeat(backslashes * 2 + 1));
                    out.push('"');
                    backslashes = 0;
                }
                _ => {
                    out.push_str(&"\\".repeat(backslashes));
                    backslashes = 0;
                    out.push(c);
                }
            }
        }
        if quote {
            out.push_str(&"\\".repeat(backslashes * 2));
            out.push('"');
        } else {
            out.push_str(&"\\".repeat(backslashes));
        }
    }
    out
}
