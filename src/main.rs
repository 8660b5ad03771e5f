use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use tonetrim::app::{TrimOptions, run_trim};
use tonetrim::cli::Cli;
use tonetrim::pipeline::CancelToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(input) = cli.input else {
        println!("filename is required");
        println!("{}", Cli::command().render_usage());
        return Ok(());
    };

    if !cli.quiet && cli.verbose >= 1 {
        eprintln!("tonetrim {}", tonetrim::version_string());
    }

    let cancel = CancelToken::new();
    tokio::spawn(watch_interrupts(cancel.clone(), cli.quiet));

    let options = TrimOptions {
        input,
        output: cli.output,
        config: cli.config,
        play: cli.play,
        quiet: cli.quiet,
        verbosity: cli.verbose,
    };

    // The pipeline is synchronous; keep it off the async workers so the
    // Ctrl+C watcher stays responsive.
    let result = tokio::task::spawn_blocking(move || run_trim(options, cancel)).await?;

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }

    Ok(())
}

/// First Ctrl+C finishes the run at the next frame; a second one exits immediately.
async fn watch_interrupts(cancel: CancelToken, quiet: bool) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    if !quiet {
        eprintln!("\nFinishing...");
    }
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
