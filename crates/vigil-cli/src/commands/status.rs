use serde::Serialize;
use vigil_core::SessionView;
use vigil_sync::LastLoad;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    session: SessionView,
    token_source: Option<String>,
    note: Option<String>,
}

/// Handle `vigil status`: one settled load, then tear down.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let sync = ctx.session_sync()?;
    let mut session = sync.start();
    let settled = session.wait_settled().await;

    let note = match sync.loader().last_load() {
        LastLoad::Failed(_) => {
            Some("session load failed; rerun with --verbose for details".to_string())
        }
        LastLoad::Loaded(None) => Some("no session token stored".to_string()),
        LastLoad::Pending | LastLoad::Loaded(Some(_)) => None,
    };
    sync.stop();

    let token_source = ctx
        .identity
        .store()
        .load_with_source()
        .map(|(_, source)| source.to_string());

    output(
        &StatusResponse {
            session: settled.view(),
            token_source,
            note,
        },
        flags.format,
    )
}
