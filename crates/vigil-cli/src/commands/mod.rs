pub mod schema;
mod sign_in;
mod sign_out;
mod status;
mod watch;

use crate::cli::{Commands, GlobalFlags};
use crate::context::AppContext;

/// Route a parsed command to its handler.
pub async fn dispatch(command: &Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Status => status::handle(ctx, flags).await,
        Commands::Watch(args) => watch::handle(args, ctx, flags).await,
        Commands::SignIn(args) => sign_in::handle(args, ctx, flags),
        Commands::SignOut => sign_out::handle(ctx, flags),
        Commands::Schema => schema::handle(flags),
    }
}
