use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use quire::auth_adapter::AuthAdapter;
use quire::error::{ClResult, Error};
use quire::perm_adapter::PermAdapter;
use quire::{App, AppBuilder, BootMode};
use quire_auth_adapter_jwt::AuthAdapterJwt;
use quire_perm_adapter_sqlite::PermAdapterSqlite;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Quire server and administration commands", long_about = None)]
#[command(version)]
struct Cli {
	#[command(flatten)]
	config: Config,

	#[command(subcommand)]
	command: Command,
}

#[derive(Args)]
struct Config {
	/// Address the HTTP server listens on
	#[arg(long, env = "QUIRE_LISTEN", default_value = "127.0.0.1:8080", global = true)]
	listen: String,

	/// Directory of the SQLite databases
	#[arg(long, env = "QUIRE_DB_DIR", default_value = "./data", global = true)]
	db_dir: PathBuf,

	/// Secret used to sign access tokens
	#[arg(long, env = "QUIRE_JWT_SECRET", hide_env_values = true, global = true)]
	jwt_secret: Option<String>,

	/// User that is granted the super-admin role on startup
	#[arg(long, env = "QUIRE_ADMIN_USER", global = true)]
	admin_user: Option<String>,

	/// Upper bound for a single route checker, in milliseconds
	#[arg(long, env = "QUIRE_CHECKER_TIMEOUT_MS", default_value_t = 5000, global = true)]
	checker_timeout_ms: u64,
}

#[derive(Subcommand)]
enum Command {
	/// Synchronize the permission graph and serve HTTP and WebSocket requests
	Serve,
	/// Create a user
	CreateUser {
		username: String,
		/// Roles to grant to the new user
		#[arg(short, long = "role")]
		roles: Vec<String>,
		/// Print an access token for the new user
		#[arg(long)]
		token: bool,
	},
	/// Grant a role to an existing user
	GrantRole {
		username: String,
		role: String,
		/// Print an access token for the user
		#[arg(long)]
		token: bool,
	},
}

impl Command {
	fn mode(&self) -> BootMode {
		match self {
			Command::Serve => BootMode::Serve,
			Command::CreateUser { .. } | Command::GrantRole { .. } => BootMode::Command,
		}
	}
}

async fn builder(config: Config, mode: BootMode) -> ClResult<AppBuilder> {
	let secret = config
		.jwt_secret
		.ok_or_else(|| Error::ConfigError("QUIRE_JWT_SECRET is not set".into()))?;
	let auth_adapter = AuthAdapterJwt::new(&secret)?;
	let perm_adapter = PermAdapterSqlite::new(&config.db_dir).await?;

	let mut builder = AppBuilder::new();
	builder
		.mode(mode)
		.listen(config.listen)
		.checker_timeout(Duration::from_millis(config.checker_timeout_ms))
		.auth_adapter(Arc::new(auth_adapter))
		.perm_adapter(Arc::new(perm_adapter));
	if let Some(admin_user) = config.admin_user {
		builder.admin_user(admin_user);
	}
	Ok(builder)
}

async fn print_token(app: &App, username: &str) -> ClResult<()> {
	let user_id = app.perm_adapter.read_user_id(username).await?;
	let token = app.auth_adapter.create_token(user_id, username).await?;
	println!("{}", token);
	Ok(())
}

async fn grant_role(app: &App, username: &str, role: &str) -> ClResult<()> {
	let user_id = app.perm_adapter.read_user_id(username).await?;
	app.perm_adapter.grant_role(user_id, role).await.map_err(|err| match err {
		Error::NotFound => Error::ValidationError(format!(
			"role '{}' or user '{}' does not exist (roles are created by 'serve')",
			role, username
		)),
		err => err,
	})
}

async fn run(cli: Cli) -> ClResult<()> {
	let builder = builder(cli.config, cli.command.mode()).await?;

	match cli.command {
		Command::Serve => builder.run().await,
		Command::CreateUser { username, roles, token } => {
			let (app, _) = builder.build().await?;
			let user_id = app.perm_adapter.create_user(&username).await?;
			println!("Created user '{}' ({})", username, user_id);
			for role in &roles {
				grant_role(&app, &username, role).await?;
				println!("Granted role '{}'", role);
			}
			if token {
				print_token(&app, &username).await?;
			}
			Ok(())
		}
		Command::GrantRole { username, role, token } => {
			let (app, _) = builder.build().await?;
			grant_role(&app, &username, &role).await?;
			println!("Granted role '{}' to '{}'", role, username);
			if token {
				print_token(&app, &username).await?;
			}
			Ok(())
		}
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	match run(Cli::parse()).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("Error: {}", err);
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_subcommand_decides_mode() {
		let cli = Cli::parse_from(["quire", "create-user", "alice", "--role", "custom-user", "--token"]);
		assert_eq!(cli.command.mode(), BootMode::Command);
		assert!(matches!(
			cli.command,
			Command::CreateUser { ref username, ref roles, token: true }
				if username == "alice" && roles == &["custom-user"]
		));

		let cli = Cli::parse_from(["quire", "serve", "--checker-timeout-ms", "250"]);
		assert_eq!(cli.command.mode(), BootMode::Serve);
		assert_eq!(cli.config.checker_timeout_ms, 250);
	}
}

// vim: ts=4
