use vigil_core::SessionView;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `vigil schema`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = schemars::schema_for!(SessionView);
    output(&schema, flags.format)
}
