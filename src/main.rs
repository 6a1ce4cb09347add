use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "crossport")]
#[command(version, about = "AI-powered code migration gateway")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file. Defaults to ./crossport.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Credential forwarded to the authorizer (correlation only).
    #[arg(long, global = true, default_value = "")]
    pub access_token: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate a project to a target language
    Migrate {
        /// Project directory to migrate
        project: PathBuf,

        /// Language the project is written in
        #[arg(short, long)]
        language: String,

        /// Language to migrate to
        #[arg(short, long)]
        target: String,

        /// Display name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Write the picked translation to this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate an execution plan for a project
    GenPlan {
        project: PathBuf,

        #[arg(short, long)]
        language: String,

        /// Instruction for the plan generator (a default modernization
        /// instruction is used when omitted)
        #[arg(short, long, default_value = "")]
        instruction: String,

        #[arg(long)]
        name: Option<String>,
    },
    /// Execute a previously generated (and possibly hand-edited) plan
    ExecutePlan {
        project: PathBuf,

        #[arg(short, long)]
        language: String,

        /// File containing the plan text
        #[arg(short, long)]
        plan: PathBuf,

        /// Skip picking generated tests
        #[arg(long)]
        no_validate: bool,

        /// Skip the one-shot autofix retry
        #[arg(long)]
        no_autofix: bool,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate unit tests for a project, validated and autofixed
    GenTests {
        project: PathBuf,

        #[arg(short, long)]
        language: String,

        /// Existing test project directory to improve upon
        #[arg(long)]
        tests: Option<PathBuf>,

        #[arg(short, long, default_value = "")]
        instruction: String,
    },
    /// Work with plan files offline
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Parse a plan file and print its canonical form
    Check { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Migrate {
            project,
            language,
            target,
            name,
            out,
        } => {
            cmd::cmd_migrate(&cli, project, language, target, name.as_deref(), out.clone()).await?;
        }
        Commands::GenPlan {
            project,
            language,
            instruction,
            name,
        } => {
            cmd::cmd_gen_plan(&cli, project, language, instruction, name.as_deref()).await?;
        }
        Commands::ExecutePlan {
            project,
            language,
            plan,
            no_validate,
            no_autofix,
            out,
        } => {
            cmd::cmd_execute_plan(
                &cli,
                project,
                language,
                plan,
                !*no_validate,
                !*no_autofix,
                out.clone(),
            )
            .await?;
        }
        Commands::GenTests {
            project,
            language,
            tests,
            instruction,
        } => {
            cmd::cmd_gen_tests(&cli, project, language, tests.as_deref(), instruction).await?;
        }
        Commands::Plan { command } => match command {
            PlanCommands::Check { file } => cmd::cmd_plan_check(file)?,
        },
    }

    Ok(())
}
