//! Command-line driver
//!
//! Each invocation runs one console operation and prints its result as
//! pretty JSON. The session survives between invocations through the cache.

use crate::api::models::Credentials;
use crate::console::Console;
use crate::store::{ComboOption, ComboSource, EntityStore, Resource};
use anyhow::{bail, Result};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in and remember the token
    Login {
        #[arg(long)]
        dni: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and clear the local cache
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List a resource
    List {
        #[arg(value_enum)]
        resource: ResourceKind,
    },
    /// Show a resource as selection options
    Options {
        #[arg(value_enum)]
        resource: ResourceKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    Users,
    Roles,
    Companies,
    Products,
    Categories,
    Units,
    Providers,
    StockMovements,
}

pub async fn run(console: &Console, command: Command) -> Result<()> {
    match command {
        Command::Login { dni, password } => {
            let user = console.login(&Credentials { dni, password }).await?;
            print_json(&user)
        }
        Command::Logout => {
            console.logout().await;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            if console.session.token().is_none() {
                bail!("Not signed in, run `login` first");
            }
            let user = console.session.fetch_self().await?;
            print_json(&user)
        }
        Command::List { resource } => match resource {
            ResourceKind::Users => print_json(&console.users.list().await?),
            ResourceKind::Roles => print_json(&console.roles.list().await?),
            ResourceKind::Companies => print_json(&console.companies.list().await?),
            ResourceKind::Products => print_json(&console.products.list().await?),
            ResourceKind::Categories => print_json(&console.categories.list().await?),
            ResourceKind::Units => print_json(&console.units.list().await?),
            ResourceKind::Providers => print_json(&console.providers.list().await?),
            ResourceKind::StockMovements => print_json(&console.stock_movements.list().await?),
        },
        Command::Options { resource } => {
            let options = match resource {
                ResourceKind::Roles => options(&console.roles).await?,
                ResourceKind::Companies => options(&console.companies).await?,
                ResourceKind::Categories => options(&console.categories).await?,
                ResourceKind::Units => options(&console.units).await?,
                ResourceKind::Providers => options(&console.providers).await?,
                other => bail!("{:?} has no selection options", other),
            };
            print_json(&options)
        }
    }
}

/// List first so the projection reflects the backend
async fn options<R>(store: &EntityStore<R>) -> Result<Vec<ComboOption>>
where
    R: Resource,
    R::Record: ComboSource,
{
    store.list().await?;
    Ok(store.options().unwrap_or_default())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CliArgs;
    use clap::Parser;

    #[test]
    fn test_parse_commands() {
        let args = CliArgs::try_parse_from([
            "inventory-console",
            "--base-url",
            "https://inventory.example.com/api",
            "login",
            "--dni",
            "12345678",
            "--password",
            "x",
        ])
        .unwrap();
        assert_eq!(args.base_url.as_deref(), Some("https://inventory.example.com/api"));
        assert!(matches!(
            args.command,
            Command::Login { ref dni, ref password } if dni == "12345678" && password == "x"
        ));

        let args = CliArgs::try_parse_from(["inventory-console", "list", "stock-movements"]).unwrap();
        assert!(matches!(
            args.command,
            Command::List { resource: ResourceKind::StockMovements }
        ));
    }

    #[test]
    fn test_rejects_unknown_resource() {
        assert!(CliArgs::try_parse_from(["inventory-console", "options", "widgets"]).is_err());
    }
}
