//! CLI subcommands for plantos-mcp

pub mod login;
pub mod serve;

pub use login::{LoginCommand, LoginError};
pub use serve::{ServeCommand, ServeError};

use crate::catalog;

/// Print the tool catalog as JSON
#[derive(argh::FromArgs)]
#[argh(subcommand, name = "tools")]
pub struct ToolsCommand {}

impl ToolsCommand {
    pub fn run(&self) -> Result<(), serde_json::Error> {
        println!("{}", serde_json::to_string_pretty(&catalog::list_tools_json())?);
        Ok(())
    }
}
