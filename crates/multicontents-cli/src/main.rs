//! multicontents command-line front end.
//!
//! Drives a mount table described by a TOML file.
//!
//! Usage:
//!   multicontents --config mounts.toml ls /
//!   multicontents --config mounts.toml put scratch/notes.txt ./notes.txt
//!   multicontents --config mounts.toml mv notes.txt scratch/notes.txt
//!
//! Set `RUST_LOG=debug` to see routing decisions.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use multicontents_kernel::{
    BackendRegistry, Content, ContentFormat, ContentsManager, ContentsModel, GetOptions,
    MultiContentsConfig, MultiContentsManager,
};

/// Browse and edit several contents backends as one tree.
#[derive(Parser, Debug)]
#[command(name = "multicontents")]
#[command(about = "One virtual namespace over many notebook storage backends")]
struct Args {
    /// Mount configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file's content
    Cat { path: String },
    /// Print a model without content
    Stat { path: String },
    /// Upload a local file
    Put { path: String, local: PathBuf },
    /// Create a directory
    Mkdir { path: String },
    /// Rename, across mounts if needed
    Mv { old: String, new: String },
    /// Delete a file or empty directory
    Rm { path: String },
    /// Show mount points in lookup order
    Mounts,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build the model `put` uploads: notebooks as JSON, UTF-8 as text, the rest base64.
fn upload_model(path: &str, data: Vec<u8>) -> Result<ContentsModel> {
    if path.ends_with(".ipynb") {
        let nb = serde_json::from_slice(&data).context("notebook is not valid JSON")?;
        return Ok(ContentsModel::notebook(path).with_json(nb));
    }
    Ok(match String::from_utf8(data) {
        Ok(text) => ContentsModel::file(path).with_text(text),
        Err(e) => ContentsModel::file(path).with_base64(STANDARD.encode(e.into_bytes())),
    })
}

async fn run(router: &MultiContentsManager, command: Command) -> Result<()> {
    match command {
        Command::Ls { path } => {
            let model = router.get(&path, GetOptions::with_content()).await?;
            print_json(&model)?;
        }
        Command::Cat { path } => {
            let model = router.get(&path, GetOptions::with_content()).await?;
            let mut stdout = std::io::stdout().lock();
            match (model.content, model.format) {
                (Some(Content::Text(encoded)), Some(ContentFormat::Base64)) => {
                    stdout.write_all(&STANDARD.decode(encoded)?)?;
                }
                (Some(Content::Text(text)), _) => stdout.write_all(text.as_bytes())?,
                (Some(Content::Json(nb)), _) => {
                    writeln!(stdout, "{}", serde_json::to_string_pretty(&nb)?)?;
                }
                (Some(Content::Directory(_)), _) | (None, _) => {
                    anyhow::bail!("{} is a directory", path);
                }
            }
        }
        Command::Stat { path } => {
            let model = router.get(&path, GetOptions::metadata()).await?;
            print_json(&model)?;
        }
        Command::Put { path, local } => {
            let data = std::fs::read(&local)
                .with_context(|| format!("reading {}", local.display()))?;
            let saved = router.save(upload_model(&path, data)?, &path).await?;
            print_json(&saved)?;
        }
        Command::Mkdir { path } => {
            let saved = router.save(ContentsModel::directory(path.as_str()), &path).await?;
            print_json(&saved)?;
        }
        Command::Mv { old, new } => router.rename_file(&old, &new).await?,
        Command::Rm { path } => router.delete_file(&path).await?,
        Command::Mounts => {
            let mounts: Vec<_> = router.mounts().iter().map(|m| m.proxy_path()).collect();
            print_json(&mounts)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = MultiContentsConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    tracing::debug!("{} mounts configured", config.managers.len());
    let router = MultiContentsManager::from_config(&config, &BackendRegistry::with_builtins())?;

    run(&router, args.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_model_kinds() {
        let text = upload_model("a.txt", b"hello".to_vec()).unwrap();
        assert_eq!(text.format, Some(ContentFormat::Text));

        let binary = upload_model("a.bin", vec![0xff, 0x00]).unwrap();
        assert_eq!(binary.format, Some(ContentFormat::Base64));
        assert_eq!(binary.content, Some(Content::Text("/wA=".into())));

        let nb = upload_model("n.ipynb", br#"{"cells": []}"#.to_vec()).unwrap();
        assert_eq!(nb.format, Some(ContentFormat::Json));
        assert!(upload_model("bad.ipynb", b"not json".to_vec()).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["multicontents", "--config", "m.toml", "mv", "a", "b"])
            .unwrap();
        assert!(matches!(args.command, Command::Mv { ref old, ref new } if old == "a" && new == "b"));
    }
}
