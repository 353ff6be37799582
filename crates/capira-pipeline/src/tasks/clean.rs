use std::fs;
use std::io::ErrorKind;

use crate::context::BuildContext;
use crate::task::{TaskError, TaskReport};

/// Remove the intermediate and distribution trees.
pub(crate) fn run(ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    for dir in [&ctx.tmp_dir, &ctx.dist_dir] {
        match fs::remove_dir_all(dir) {
            Ok(()) => tracing::debug!("Removed {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(TaskError::io(dir)(e)),
        }
    }

    Ok(TaskReport::default())
}
