//! Operator CLI over `kindred_core`.
//!
//! # Responsibility
//! - Open the member database and run one service operation per invocation.
//! - Print results as pretty JSON on stdout; report failures on stderr.

#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand};
use kindred_core::db::open_db;
use kindred_core::{
    default_log_level, init_logging, Member, MemberFilter, MemberId, MemberService, NewMember,
    SqliteMemberRepository,
};
use log::info;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "kindred")]
#[command(about = "Family tree member store and tree builder", version)]
struct Cli {
    /// SQLite database file; created and migrated on first use.
    #[arg(long, global = true, env = "KINDRED_DB", default_value = "kindred.sqlite3")]
    db: PathBuf,
    /// Directory for rotating log files. Logging stays off when unset.
    #[arg(long, global = true, env = "KINDRED_LOG_DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, env = "KINDRED_LOG_LEVEL", default_value_t = default_log_level().to_string())]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Checks core linkage without touching the database.
    Ping,
    /// Lists members, optionally filtered.
    List {
        #[arg(long)]
        generation: Option<u32>,
        #[arg(long)]
        branch: Option<String>,
        /// Case-insensitive name fragment.
        #[arg(long)]
        search: Option<String>,
    },
    /// Shows one member.
    Show { id: MemberId },
    /// Prints the display tree rooted at the patriarch.
    Tree,
    /// Prints parent, siblings and children of one member.
    Relatives { id: MemberId },
    /// Prints family statistics.
    Stats,
    /// Adds one member.
    Add(AddArgs),
    /// Deletes a member and every descendant.
    Delete { id: MemberId },
    /// Replaces all members with the JSON array in `file`.
    Import { file: PathBuf },
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value_t = 1)]
    generation: u32,
    #[arg(long)]
    parent: Option<MemberId>,
    #[arg(long, default_value_t = false)]
    patriarch: bool,
    #[arg(long)]
    birth_date: Option<String>,
    #[arg(long)]
    death_date: Option<String>,
    #[arg(long)]
    occupation: Option<String>,
    #[arg(long)]
    education: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    biography: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    branch: Option<String>,
}

impl From<AddArgs> for NewMember {
    fn from(args: AddArgs) -> Self {
        let mut member = NewMember::new(args.name, args.generation, args.parent);
        member.is_patriarch = args.patriarch;
        member.birth_date = args.birth_date;
        member.death_date = args.death_date;
        member.occupation = args.occupation;
        member.education = args.education;
        member.location = args.location;
        member.biography = args.biography;
        member.image_url = args.image_url;
        member.branch = args.branch;
        member
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let log_dir = if log_dir.is_absolute() {
            log_dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| e.to_string())?
                .join(log_dir)
        };
        init_logging(&cli.log_level, log_dir).map_err(|e| e.to_string())?;
    }

    if let Commands::Ping = cli.command {
        return print_json(&json!({
            "ping": kindred_core::ping(),
            "version": kindred_core::core_version(),
        }));
    }

    let conn = open_db(&cli.db).map_err(|e| e.to_string())?;
    let repo = SqliteMemberRepository::try_new(&conn).map_err(|e| e.to_string())?;
    let service = MemberService::new(repo);

    match cli.command {
        Commands::Ping => Ok(()),
        Commands::List {
            generation,
            branch,
            search,
        } => {
            let filter = MemberFilter {
                generation,
                branch,
                name_query: search,
            };
            let members = service
                .search_members(&filter)
                .map_err(|e| e.to_string())?;
            print_json(&members)
        }
        Commands::Show { id } => {
            let member = service
                .get_member(id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("family member not found: {id}"))?;
            print_json(&member)
        }
        Commands::Tree => print_json(&service.family_tree().map_err(|e| e.to_string())?),
        Commands::Relatives { id } => {
            print_json(&service.relatives_of(id).map_err(|e| e.to_string())?)
        }
        Commands::Stats => print_json(&service.stats().map_err(|e| e.to_string())?),
        Commands::Add(args) => {
            let created = service
                .create_member(args.into())
                .map_err(|e| e.to_string())?;
            print_json(&created)
        }
        Commands::Delete { id } => {
            let deleted = service.delete_member(id).map_err(|e| e.to_string())?;
            print_json(&json!({ "deleted": deleted }))
        }
        Commands::Import { file } => {
            let raw = fs::read_to_string(&file).map_err(|e| e.to_string())?;
            let members: Vec<Member> = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
            let imported = service
                .import_members(members)
                .map_err(|e| e.to_string())?;
            info!(
                "event=cli_import module=cli status=ok file={} imported={imported}",
                file.display()
            );
            print_json(&json!({ "imported": imported }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
