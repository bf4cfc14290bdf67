use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod graphql;
mod index;
mod issue;
mod progress;
mod reconcile;
mod render;
mod repo_name;
mod sync;
#[cfg(test)]
mod testing;

use repo_name::RepoName;

/// Mirror the issues of one GitHub repository into another.
#[derive(Parser)]
#[command(name = "mirror", version)]
struct Args {
    /// GitHub token for the repository to sync from
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,
    /// GitHub token for the repository to sync to, defaults to --token
    #[arg(long, env = "GITHUB_TO_TOKEN", hide_env_values = true)]
    to_token: Option<String>,
    /// GitHub repository to sync from, as <owner>/<name>
    #[arg(short, long, env = "GITHUB_FROM")]
    from: RepoName,
    /// GitHub repository to sync to, as <owner>/<name>
    #[arg(long, env = "GITHUB_TO")]
    to: RepoName,
    /// Print what would be mirrored without changing anything
    #[arg(long)]
    dry_run: bool,
    /// More logging, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync issues and their comments
    Issues,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = tokio::select! {
        result = run(args) => result,
        _ = tokio::signal::ctrl_c() => Err(sync::Error::Interrupted),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error syncing issues: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug,octocrab=info,hyper=info"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

async fn run(args: Args) -> Result<(), sync::Error> {
    match args.command {
        Command::Issues => {
            let source = graphql::Octo::new(args.token.clone())?;
            let target = graphql::Octo::new(args.to_token.unwrap_or(args.token))?;
            let mirror = sync::Mirror::new(source, target)?;

            let plan = mirror.plan(&args.from, &args.to).await?;
            if args.dry_run {
                print!("{}", plan);
                return Ok(());
            }
            let bar = progress::bar(plan.action_count());
            let report = mirror.apply(plan, &bar).await;
            bar.finish_and_clear();
            let report = report?;
            println!(
                "Mirrored {} new issues and {} comments from {} to {}",
                report.issues_created, report.comments_added, args.from, args.to
            );
        }
    }
    Ok(())
}
