use std::net::SocketAddr;

use anyhow::Result;

use super::Context;

pub async fn cmd_serve(ctx: &Context, bind: Option<SocketAddr>) -> Result<()> {
    let addr = bind.unwrap_or(ctx.config.server.bind);
    medialink::server::run_server(addr, ctx.app_state()).await
}
