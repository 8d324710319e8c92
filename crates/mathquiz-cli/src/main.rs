//! mathquiz CLI — serve the quiz and manage its question bank.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mathquiz", version, about = "Multiple-choice math quiz server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on (e.g. "127.0.0.1:5000")
        #[arg(long)]
        bind: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and a seeded question file
    Init,

    /// Validate a question file
    Validate {
        /// Path to a questions JSON file
        #[arg(long)]
        questions: PathBuf,
    },

    /// Generate questions with the configured provider
    Generate {
        /// Number of questions to request
        #[arg(long)]
        count: Option<usize>,

        /// Merge the generated questions into this question file
        #[arg(long)]
        write: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show stored test history
    History {
        /// Data directory of the JSON store
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Only show this session
        #[arg(long)]
        session: Option<String>,

        /// Also write the session's history page to this HTML file
        #[arg(long, requires = "session")]
        html: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let directive = match "mathquiz=info".parse() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: invalid log directive: {e}");
            process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { bind, config } => commands::serve::execute(bind, config).await,
        Commands::Init => commands::init::execute(),
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Generate {
            count,
            write,
            config,
        } => commands::generate::execute(count, write, config).await,
        Commands::History {
            data_dir,
            session,
            html,
            config,
        } => commands::history::execute(data_dir, session, html, config).await,
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
