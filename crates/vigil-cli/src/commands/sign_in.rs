use anyhow::Context;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SignInArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct SignInResponse {
    authenticated: bool,
    user_id: String,
    email: Option<String>,
    expires_at: String,
}

pub fn handle(args: &SignInArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let claims = ctx
        .identity
        .sign_in_with_token(&args.token)
        .context("sign-in failed")?;

    output(
        &SignInResponse {
            authenticated: true,
            user_id: claims.subject,
            email: claims.email,
            expires_at: claims.expires_at.to_rfc3339(),
        },
        flags.format,
    )
}
