//! The top-level commands outside the subject/verb surface: `init`,
//! `doctor`, `commit`, `cancel`, `diff` (§6).

use crate::context::AppContext;

/// `armory init` — create the store if missing and seed empty entity files.
///
/// # Errors
/// Returns an error if the store cannot be created.
pub fn init(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.store.init()?;
    println!("initialized store at {}", ctx.root.display());
    Ok(())
}

/// `armory doctor` — check that the configured VCS binary and a patch
/// utility are reachable, and report whether a work branch is open.
///
/// # Errors
/// Returns an error only if the store's branch state cannot be read.
pub fn doctor(ctx: &AppContext) -> anyhow::Result<()> {
    let vcs_ok = which(&ctx.config.vcs.binary);
    println!("{}: {}", ctx.config.vcs.binary, if vcs_ok { "found" } else { "NOT FOUND on PATH" });
    println!("patch: {}", if which("patch") { "found" } else { "NOT FOUND on PATH" });
    println!("diff: {}", if which("diff") { "found" } else { "NOT FOUND on PATH" });
    match ctx.store.is_busy()? {
        Some(branch) => println!("store: a work branch is open ({branch})"),
        None => println!("store: trunk is checked out, no open work branch"),
    }
    Ok(())
}

fn which(binary: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

/// `armory commit [-m <msg>]` (§4.1 `commitWork`).
///
/// # Errors
/// Returns [`armory_core::ArmoryError::NotOnYourBranch`] or
/// [`armory_core::ArmoryError::ConflictOnMerge`].
pub fn commit(ctx: &AppContext, message: Option<String>) -> anyhow::Result<()> {
    let operator = crate::context::operator()?;
    let tx = ctx.store.begin_modify(&operator, false)?;
    let message = message.unwrap_or_else(|| format!("armory change by {operator}"));
    let oid = tx.commit(&message)?;
    println!("committed {oid} to {}", ctx.store.trunk());
    Ok(())
}

/// `armory cancel [--force]` (§4.1 `cancelWork`).
///
/// # Errors
/// Returns an error if no work branch for this operator exists.
pub fn cancel(ctx: &AppContext, force: bool) -> anyhow::Result<()> {
    let operator = crate::context::operator()?;
    let tx = ctx.store.begin_modify(&operator, force)?;
    tx.cancel(force)?;
    println!("canceled pending change");
    Ok(())
}

/// `armory diff` (§4.1 `diffTrunk`).
///
/// # Errors
/// Returns an error if the diff cannot be computed.
pub fn diff(ctx: &AppContext) -> anyhow::Result<()> {
    let operator = crate::context::operator()?;
    let tx = ctx.store.begin_modify(&operator, false)?;
    print!("{}", tx.diff_trunk()?);
    Ok(())
}
