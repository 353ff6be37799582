use crate::context::BuildContext;
use crate::task::{TaskError, TaskReport};
use crate::tasks::copy_tree;

/// Copy web fonts to the distribution tree.
pub(crate) fn run(ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    copy_tree(&ctx.src("fonts"), &ctx.dist("fonts"), |_| true)
}
