use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "novella", version, about = "Client for the novel analysis service")]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Override the API base address for this run
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the token
    Login {
        #[arg(short, long, env = "NOVELLA_USERNAME")]
        username: Option<String>,
    },
    /// Create an account, then log in with it
    Register {
        #[arg(short, long)]
        username: String,
        /// Defaults to <username>@example.com
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// Edit the logged-in user's profile
    Profile {
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show session state without failing when logged out
    Status,
    #[command(subcommand)]
    Works(WorksCommand),
    /// Analyze a text file or inline text
    Analyze(AnalyzeArgs),
    #[command(subcommand)]
    Characters(RecordCommand),
    #[command(subcommand)]
    Worlds(RecordCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum WorksCommand {
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    Show {
        id: i64,
    },
    Upload {
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
    },
    Delete {
        id: i64,
    },
    Reanalyze {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub text: Option<String>,
    /// Print only the N heaviest keywords
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    List,
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    SetBase { url: String },
    SetTimeout { ms: u64 },
    /// keyring, file or memory
    SetStorage { kind: String },
}
