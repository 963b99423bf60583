use clap::Parser;
use colored::Colorize;
use kube_doctor::DoctorError;
use kube_doctor::cli::Cli;
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // kube and reqwest share one rustls provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    cli.init_logging();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let result =
        kube_doctor::run_command(cli.command, cli.config.as_deref(), cli.quiet, cancel).await;

    match result {
        Ok(()) => {}
        Err(DoctorError::QuotaExhausted) => {
            eprintln!("{}", "Exhausted API quota. Please try again later".red());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    }
}
