// skillmatrix-admin/src/main.rs

use clap::{Parser, Subcommand};

mod admin_cli;

use admin_cli::access_commands::{AccessAction, handle_access_command_with_conn};
use admin_cli::department_commands::{DepartmentAction, handle_department_command_with_conn};
use admin_cli::user_commands::{UserAction, handle_user_command_with_conn};
use admin_cli::utils::establish_connection;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "skillmatrix-admin")]
#[command(about = "Administrative CLI for the skill matrix database")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage user accounts")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    #[command(about = "Manage per-team access grants")]
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
    #[command(about = "Manage departments")]
    Department {
        #[command(subcommand)]
        action: DepartmentAction,
    },
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection()?;
    match command {
        Commands::User { action } => handle_user_command_with_conn(&mut conn, action),
        Commands::Access { action } => handle_access_command_with_conn(&mut conn, action),
        Commands::Department { action } => handle_department_command_with_conn(&mut conn, action),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        println!("skillmatrix-admin {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("No command given; run with --help for usage");
        std::process::exit(2);
    };

    if let Err(e) = run(command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
