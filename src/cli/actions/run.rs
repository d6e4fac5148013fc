use crate::cli::{
    actions::{request, session, Action},
    globals::GlobalArgs,
};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Request(args) => request::execute(args, globals).await,
        Action::Login(args) => session::login(args, globals),
        Action::Logout => session::logout(globals),
        Action::Status => session::status(globals),
    }
}
