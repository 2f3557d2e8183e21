use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_variants::app::App;

#[derive(Debug, Parser)]
#[command(name = "upload-variants")]
#[command(about = "Generate resized JPEG/PNG and WebP variants of an uploaded image")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate and store all variants of FILE, printing the result as JSON.
    Process {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete every variant sharing the base id of PATH.
    Delete {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_variants=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let app = match App::from_env().await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&app, args.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Process { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .context("Input path has no usable file name")?;

            let result = app.upload(filename, bytes).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Delete { path } => {
            let removed = app.delete(&path).await?;
            info!("Deleted {} file(s) for {}", removed, path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let args = CliArgs::try_parse_from(["upload-variants", "process", "photo.jpg"]).unwrap();
        match args.command {
            Command::Process { file } => assert_eq!(file, PathBuf::from("photo.jpg")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete() {
        let args =
            CliArgs::try_parse_from(["upload-variants", "delete", "images/abc_medium.jpg"]).unwrap();
        match args.command {
            Command::Delete { path } => assert_eq!(path, "images/abc_medium.jpg"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(CliArgs::try_parse_from(["upload-variants"]).is_err());
    }
}
