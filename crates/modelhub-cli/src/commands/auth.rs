//! Login and logout.

use modelhub_api::paths;

use super::Context;

pub(crate) fn login(ctx: &Context, token: &str) -> miette::Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(miette::miette!("Token must not be empty"));
    }
    paths::ensure_data_dir(&ctx.data_dir)
        .map_err(|e| miette::miette!("Failed to create {}: {}", ctx.data_dir.display(), e))?;
    ctx.client
        .tokens()
        .set(token)
        .map_err(|e| miette::miette!("Failed to store token: {}", e))?;
    println!("Token stored in {}", ctx.data_dir.display());
    Ok(())
}

pub(crate) fn logout(ctx: &Context) -> miette::Result<()> {
    ctx.client
        .tokens()
        .clear()
        .map_err(|e| miette::miette!("Failed to remove token: {}", e))?;
    println!("Logged out.");
    Ok(())
}
