use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};

use super::{Session, require_user};
use crate::output::{kv, render};
use tagging_core::db::users::{MAX_TRUST_LEVEL, User, get_user, insert_user, set_trust_level};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(about = "Register a user")]
    Add(UserAddArgs),

    #[command(about = "Change a user's trust level")]
    Trust(UserTrustArgs),
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Unique username.
    pub username: String,

    /// Trust level (0-4). Tag creation needs `min_trust_to_create_tag`.
    #[arg(long, default_value_t = 0)]
    pub trust: u8,
}

#[derive(Args, Debug)]
pub struct UserTrustArgs {
    /// Existing username.
    pub username: String,

    /// New trust level (0-4).
    pub level: u8,
}

pub fn run_user(args: &UserArgs, session: &Session) -> Result<()> {
    match &args.command {
        UserCommand::Add(add) => run_user_add(add, session),
        UserCommand::Trust(trust) => run_user_trust(trust, session),
    }
}

fn check_trust(level: u8) -> Result<()> {
    if level > MAX_TRUST_LEVEL {
        bail!("trust level must be between 0 and {MAX_TRUST_LEVEL}");
    }
    Ok(())
}

fn run_user_add(args: &UserAddArgs, session: &Session) -> Result<()> {
    check_trust(args.trust)?;
    let conn = session.open_store()?;
    let user_id = insert_user(&conn, &args.username, args.trust)
        .with_context(|| format!("add user '{}'", args.username))?;
    let user = get_user(&conn, user_id)?.context("read back inserted user")?;

    print_user(session, &user)
}

fn run_user_trust(args: &UserTrustArgs, session: &Session) -> Result<()> {
    check_trust(args.level)?;
    let conn = session.open_store()?;
    let user = require_user(&conn, &args.username)?;
    if !set_trust_level(&conn, user.user_id, args.level).context("update trust level")? {
        bail!("no user named '{}'", args.username);
    }
    let user = get_user(&conn, user.user_id)?.context("read back updated user")?;
    print_user(session, &user)
}

fn print_user(session: &Session, user: &User) -> Result<()> {
    render(session.output, user, |value, w| {
        kv(w, "user", format!("{} ({})", value.username, value.user_id))?;
        kv(w, "trust", value.trust_level.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: UserArgs,
    }

    #[test]
    fn trust_takes_username_and_level() {
        let w = Wrapper::parse_from(["test", "trust", "bob", "3"]);
        match w.args.command {
            UserCommand::Trust(trust) => {
                assert_eq!(trust.username, "bob");
                assert_eq!(trust.level, 3);
            }
            UserCommand::Add(_) => panic!("expected trust"),
        }
    }

    #[test]
    fn out_of_range_trust_is_rejected() {
        assert!(check_trust(MAX_TRUST_LEVEL).is_ok());
        assert!(check_trust(MAX_TRUST_LEVEL + 1).is_err());
    }
}
