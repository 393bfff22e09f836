//! `persona`: build, search and chat with a personal knowledge base.
//!
//! Usage:
//!   persona rebuild                         # re-read personal_data.json and rebuild
//!   persona search "cloud experience"       # print retrieved context
//!   persona identity                        # print name and title
//!   persona status                          # key, record and index state
//!   persona ask "What did you build at Acme?"

mod cli;
mod setup;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "persona=debug,persona_rag=debug"
    } else {
        "persona=info,persona_rag=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Command::Rebuild => {
            let rt = setup::runtime(&cli, setup::config(&cli, false)?, None).await?;
            rt.service.open().await?;
            let report = rt.service.rebuild().await?;
            println!(
                "Indexed {} documents as {} chunks in {:.2?}",
                report.documents, report.chunks, report.elapsed
            );
            rt.shutdown().await;
        }
        Command::Search { query, limit } => {
            let rt = setup::runtime(&cli, setup::config(&cli, true)?, None).await?;
            rt.service.open().await?;
            let k = limit.unwrap_or(rt.service.config().top_k);
            println!("{}", rt.service.search(query, k).await?);
            rt.shutdown().await;
        }
        Command::Identity => {
            let identity = setup::identity(&cli).await?;
            println!("{}\n{}", identity.name, identity.title);
        }
        Command::Status => {
            println!("{}", setup::status(&cli).await?);
        }
        Command::Ask { message, show_context } => {
            let completion = setup::chat_client()?;
            let rt = setup::runtime(&cli, setup::config(&cli, true)?, Some(completion)).await?;
            if let Some(report) = rt.service.open().await? {
                info!(chunks = report.chunks, "built index on first use");
            }
            let answer = rt.service.assistant()?.answer(message).await?;
            if *show_context {
                println!("--- context ---\n{}\n---------------", answer.context_preview);
            }
            println!("{}", answer.reply);
            rt.shutdown().await;
        }
    }

    Ok(())
}
