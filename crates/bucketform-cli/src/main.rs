use std::path::PathBuf;

use bucketform_cli::commands;
use clap::{Parser, Subcommand};
use eyre::Result;

/// Converge one S3 bucket to its declared state.
#[derive(Debug, Parser)]
#[command(name = "bucketform", version)]
struct Cli {
    /// JSON declaration of the bucket. Without it the declaration is read
    /// from BUCKET_* environment variables, and BUCKET_NAME must be set: the
    /// fallback name `default_bucket_name` is not a valid S3 bucket name.
    #[arg(long, global = true, env = "BUCKETFORM_SPEC")]
    spec: Option<PathBuf>,

    /// Where the last known state is kept between runs.
    #[arg(
        long,
        global = true,
        env = "BUCKETFORM_STATE",
        default_value = ".bucketform/state.json"
    )]
    state: PathBuf,

    #[arg(long, global = true)]
    region: Option<String>,

    #[arg(long, global = true)]
    profile: Option<String>,

    /// Alternate S3 endpoint, e.g. a local MinIO.
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Run against an in-process provider instead of AWS. State goes to a
    /// temporary directory and `--state` is ignored.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the operations needed to converge the bucket.
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Apply the plan.
    Apply {
        /// Allow plans that destroy and recreate the bucket.
        #[arg(long)]
        confirm_replace: bool,
    },
    /// Delete the managed bucket and everything in it.
    Destroy,
    /// Print the declaration as Terraform HCL.
    Render,
    /// Print the persisted state.
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::build(commands::Options {
        spec: cli.spec,
        state: cli.state,
        region: cli.region,
        profile: cli.profile,
        endpoint_url: cli.endpoint_url,
        memory: cli.memory,
    })
    .await?;

    match cli.command {
        Command::Plan { json } => commands::plan(&ctx, json).await,
        Command::Apply { confirm_replace } => commands::apply(&ctx, confirm_replace).await,
        Command::Destroy => commands::destroy(&ctx).await,
        Command::Render => commands::render(&ctx),
        Command::Show => commands::show(&ctx).await,
    }
}
