mod cmd;
mod output;
mod prompt;
mod ui;

use clap::{Parser, Subcommand};
use cmd::{
    certs::CertsSubcommand, flavor::FlavorSubcommand, list::ListSubcommand, new::NewArgs, Ctx,
};
use devinfra_core::Config;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "devinfra",
    about = "Local development infrastructure: Traefik, DNSMasq and compose projects on .test domains with HTTPS",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config directory (default: $XDG_CONFIG_HOME/devinfra or ~/.config/devinfra)
    #[arg(long, global = true, env = "DEVINFRA_HOME")]
    config_dir: Option<PathBuf>,

    /// Port the DNS proxy listens on
    #[arg(long, global = true, env = "DNS_PORT")]
    dns_port: Option<u16>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true, short = 'y')]
    yes: bool,

    /// Debug logging
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    /// Suppress progress output
    #[arg(long, global = true, short = 'q')]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory, infrastructure files, network and certificates
    Init {
        /// Import projects.yaml, certs/ and dynamic/ from an existing installation
        #[arg(long)]
        import_from: Option<PathBuf>,
    },

    /// Create a new project
    New(NewArgs),

    /// Register an existing project from a git URL or local directory
    Add {
        /// Git URL or path to a local checkout
        source: String,

        /// Project name (default: derived from the URL or directory)
        #[arg(long)]
        name: Option<String>,

        /// Clone destination (default: ~/projects/<name>)
        #[arg(long)]
        dir: Option<String>,

        /// Services to route instead of the detected ones, e.g. web:3000,api:8080
        #[arg(long)]
        services: Option<String>,
    },

    /// Start infrastructure, one project, or every project
    Up {
        project: Option<String>,

        /// Start every registered project
        #[arg(long, conflicts_with = "project")]
        all: bool,
    },

    /// Stop infrastructure, one project, or every project
    Down {
        project: Option<String>,

        /// Stop every registered project
        #[arg(long, conflicts_with = "project")]
        all: bool,
    },

    /// Follow infrastructure or project logs
    Logs { project: Option<String> },

    /// Unregister a project, removing its certificates and routing
    Remove {
        project: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// Also delete the project directory
        #[arg(long)]
        delete_dir: bool,
    },

    /// Show full project detail
    Inspect { project: String },

    /// List projects or available flavors
    List {
        #[command(subcommand)]
        subcommand: ListSubcommand,
    },

    /// Every registered project with its mode, status and URLs
    Status,

    /// Check tools, containers, DNS, certificates and projects
    Doctor,

    /// Manage TLS certificates
    Certs {
        #[command(subcommand)]
        subcommand: CertsSubcommand,
    },

    /// Manage project flavors
    Flavor {
        #[command(subcommand)]
        subcommand: FlavorSubcommand,
    },

    /// Stop infrastructure and delete generated certificates and routing files
    Clean {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,
}

impl Commands {
    /// Commands that work before `init` has run.
    fn works_uninitialized(&self) -> bool {
        matches!(
            self,
            Commands::Init { .. }
                | Commands::Doctor
                | Commands::List { .. }
                | Commands::Flavor {
                    subcommand: FlavorSubcommand::List
                }
                | Commands::Version
        )
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let xdg = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let config = Config::resolve(cli.config_dir.as_deref(), xdg.as_deref(), cli.dns_port)?;
    if !cli.command.works_uninitialized() {
        config.require_initialized()?;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let ctx = Ctx {
        config,
        json: cli.json,
        yes: cli.yes,
        ui: ui::Ui::new(cli.quiet),
        cancel,
    };

    match cli.command {
        Commands::Init { import_from } => cmd::init::run(&ctx, import_from.as_deref()).await,
        Commands::New(args) => cmd::new::run(&ctx, args).await,
        Commands::Add {
            source,
            name,
            dir,
            services,
        } => cmd::add::run(&ctx, &source, name, dir, services).await,
        Commands::Up { project, all } => cmd::up::run(&ctx, project.as_deref(), all).await,
        Commands::Down { project, all } => cmd::down::run(&ctx, project.as_deref(), all).await,
        Commands::Logs { project } => cmd::logs::run(&ctx, project.as_deref()).await,
        Commands::Remove {
            project,
            force,
            delete_dir,
        } => cmd::remove::run(&ctx, &project, force, delete_dir).await,
        Commands::Inspect { project } => cmd::inspect::run(&ctx, &project).await,
        Commands::List { subcommand } => cmd::list::run(&ctx, subcommand),
        Commands::Status => cmd::status::run(&ctx).await,
        Commands::Doctor => cmd::doctor::run(&ctx).await,
        Commands::Certs { subcommand } => cmd::certs::run(&ctx, subcommand).await,
        Commands::Flavor { subcommand } => cmd::flavor::run(&ctx, subcommand),
        Commands::Clean { force } => cmd::clean::run(&ctx, force).await,
        Commands::Version => cmd::version::run(&ctx),
    }
}
