mod commands;
mod config;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    annotations, attach, layers, link, refresh, status, unlink, unsync, watch, AnnotationsArgs,
    AttachArgs, Context, LayersArgs, LinkArgs, RefreshArgs, StatusArgs, UnlinkArgs, UnsyncArgs,
    WatchArgs,
};
use tracing_subscriber::EnvFilter;

/// Stylesync - keep stylesheets linked to design layers
#[derive(Parser, Debug)]
#[command(name = "stylesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Design service access token
    #[arg(long, global = true, env = "STYLESYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach a stylesheet to a design file
    Attach(AttachArgs),

    /// Fetch the latest revision of the attached design file
    Refresh(RefreshArgs),

    /// Remove the design file and all links from a stylesheet
    Unsync(UnsyncArgs),

    /// Link a layer to a selector
    Link(LinkArgs),

    /// Remove a layer's link
    Unlink(UnlinkArgs),

    /// List the layers of the attached design file
    Layers(LayersArgs),

    /// Show sync status
    Status(StatusArgs),

    /// List decorated rules
    Annotations(AnnotationsArgs),

    /// Watch a stylesheet and keep its decorations current
    Watch(WatchArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;
    let ctx = Context {
        config: config::load(&cwd)?,
        cwd,
        token: cli.token,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Command::Attach(args) => attach(args, &ctx).await,
            Command::Refresh(args) => refresh(args, &ctx).await,
            Command::Unsync(args) => unsync(args, &ctx).await,
            Command::Link(args) => link(args, &ctx).await,
            Command::Unlink(args) => unlink(args, &ctx).await,
            Command::Layers(args) => layers(args, &ctx).await,
            Command::Status(args) => status(args, &ctx).await,
            Command::Annotations(args) => annotations(args, &ctx).await,
            Command::Watch(args) => watch(args, &ctx).await,
        }
    })
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
