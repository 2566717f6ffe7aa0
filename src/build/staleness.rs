//! Timestamp-based staleness.
//!
//! Modification times are the only cache. Clock skew or a filesystem with
//! coarse timestamps can make a changed input look older than its artifact;
//! `--force` is the escape hatch.
//!
//! Only files are inputs. Flags, defines, includes and the exception setting
//! are not recorded anywhere, so changing `-f` or `-d` alone leaves an
//! existing artifact fresh. Rebuild with `--force` after such a change.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Decides whether `artifact` has to be (re)built from `inputs`.
///
/// Inputs that do not exist are ignored, so an existing artifact whose inputs
/// are all gone is trusted as it is.
pub fn needs_rebuild<P: AsRef<Path>>(artifact: &Path, inputs: &[P], force: bool) -> bool {
    if force {
        return true;
    }
    let Some(artifact_time) = modified(artifact) else {
        return true;
    };
    inputs
        .iter()
        .filter_map(|input| modified(input.as_ref()))
        .any(|input_time| input_time > artifact_time)
}
