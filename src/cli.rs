use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kube-doctor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find problems in your Kubernetes cluster")]
#[command(
    long_about = "Scans the resources of a Kubernetes cluster for common misconfigurations and, on request, asks an AI backend to explain each problem and suggest a fix."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults to ~/.kube-doctor.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find problems within the cluster
    #[command(visible_alias = "analyse")]
    Analyze {
        /// Namespace to analyze (all namespaces when omitted)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Only run these analyzers (e.g. Pod,Service,Ingress)
        #[arg(short, long = "filter", value_delimiter = ',')]
        filters: Vec<String>,

        /// Explain each problem with the AI backend
        #[arg(short, long)]
        explain: bool,

        /// AI backend to use (overrides the configured default)
        #[arg(short, long, value_name = "BACKEND")]
        backend: Option<String>,

        /// Language the explanations are written in
        #[arg(short, long)]
        language: Option<String>,

        /// Do not reuse or store cached explanations
        #[arg(short = 'c', long)]
        no_cache: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,

        /// Kubeconfig context to use
        #[arg(long, value_name = "CONTEXT")]
        context: Option<String>,

        /// Analyze manifests from a file or directory instead of a live cluster
        #[arg(long, value_name = "PATH")]
        manifests: Option<PathBuf>,
    },

    /// Store the API key for an AI backend and make it the default
    Auth {
        /// Backend the key belongs to (openai, anthropic)
        #[arg(short, long, default_value = "openai")]
        backend: String,

        /// API key
        #[arg(short, long, env = "KUBE_DOCTOR_API_KEY", hide_env_values = true)]
        key: String,
    },

    /// List the available analyzers
    Filters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
