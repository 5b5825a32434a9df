use console::style;
use token_deployer::{
    default_deployment_path, deployment_exists, load_deployment, ChainContext, StateError,
    TokenSystem,
};

use crate::messages::{
    msg_network, MSG_IMPLEMENTATION, MSG_NOT_PROXIED, MSG_PROXY_ADMIN, MSG_TOKEN_ADDRESS,
    MSG_TOKEN_ADMIN,
};

/// Loads the recorded deployment of the context network.
pub(crate) async fn load_recorded(ctx: &ChainContext) -> anyhow::Result<TokenSystem> {
    let dir = default_deployment_path(ctx);
    if !deployment_exists(ctx, &dir).await? {
        return Err(StateError::DeploymentNotFound {
            network: ctx.network().name.clone(),
        }
        .into());
    }
    Ok(load_deployment(ctx, &dir).await?)
}

pub(crate) async fn run(ctx: &ChainContext) -> anyhow::Result<()> {
    let system = load_recorded(ctx).await?;
    let chain_id = ctx.gateway().chain_id().await?;
    println!("{}", style(msg_network(&ctx.network().name, chain_id)).bold());

    let deployment = &system.token.record.deployment;
    println!("  {MSG_TOKEN_ADDRESS}: {}", style(format!("{:?}", deployment.address())).green());
    println!("  {MSG_TOKEN_ADMIN}: {:?}", system.token.token_admin);
    match deployment.proxy() {
        Some(proxy) => {
            println!("  {MSG_PROXY_ADMIN}: {:?}", proxy.proxy_admin);
            println!("  {MSG_IMPLEMENTATION}: {:?}", proxy.implementation_address);
        }
        None => println!("  {}", style(MSG_NOT_PROXIED).yellow()),
    }
    Ok(())
}
