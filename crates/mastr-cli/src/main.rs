// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, PasswordDisplayMode};
use log::debug;
use mastr_hub::{
    Config, CredentialSource, DatasetSplit, Error, HubClient, Progress, PublishOptions,
    TokenStorage as _, build_split, load_token, prepare_dirs, publish_split, rename_and_copy, write_package,
};
use std::path::PathBuf;
use tokio::{sync::mpsc, task::JoinHandle};

const SAMPLE_TEMPLATE: &str =
    "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}";
const BYTES_TEMPLATE: &str =
    "[{elapsed_precise}] {msg}: [{wide_bar:.yellow}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Root of the original dataset
    #[clap(long)]
    source_root: Option<PathBuf>,

    /// Root of the renumbered copy, cleared on every run
    #[clap(long)]
    dest_root: Option<PathBuf>,

    /// Dataset repository, owner/name
    #[clap(long)]
    repo_id: Option<String>,

    /// Create the dataset repository as private
    #[clap(long)]
    private: bool,

    /// Hub access token, takes precedence over the environment and the
    /// stored token
    #[clap(long)]
    token: Option<String>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Prepare the destination folders, copy every sample under its new
    /// identifier, then publish the split to the hub.
    Run,
    /// Create the destination folders or remove the files inside them.
    Prepare,
    /// Prepare the destination folders and copy every sample under its new
    /// identifier.
    Copy,
    /// Build the split from the destination folders and write the parquet
    /// shards and dataset card locally instead of uploading them.
    Package {
        /// Output directory
        #[clap(long, short)]
        output: PathBuf,
    },
    /// Publish the split built from existing destination folders.
    Publish,
    /// Verify a hub token and store it in the token file.
    Login,
    /// Remove the stored hub token.
    Logout,
    /// Show the account owning the hub token.
    Whoami,
}

fn load_config(args: &Args) -> Result<Config, Error> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(source_root) = &args.source_root {
        config.source_root = source_root.clone();
    }
    if let Some(dest_root) = &args.dest_root {
        config.dest_root = dest_root.clone();
    }
    if let Some(repo_id) = &args.repo_id {
        config.repo_id = repo_id.clone();
    }
    if args.private {
        config.private = true;
    }
    config.validate()?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn hub_client(token: Option<&str>, config: &Config) -> Result<HubClient, Error> {
    let mut sources = Vec::new();
    if let Some(token) = token {
        sources.push(CredentialSource::Token(token.to_string()));
    }
    sources.extend(config.credential_sources());

    let token = load_token(&sources)?;
    HubClient::new(&config.endpoint, &token, config.timeout())
}

/// Drive a progress bar from the updates sent on the returned channel.
fn progress_bar(template: &str, msg: &'static str) -> (mpsc::Sender<Progress>, JoinHandle<()>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(msg);

    let (tx, mut rx) = mpsc::channel::<Progress>(1);
    let handle = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total > 0 {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.current as u64);
            }
        }
        bar.finish_and_clear();
    });

    (tx, handle)
}

async fn handle_prepare(config: &Config) -> Result<(), Error> {
    println!("Step 1: Creating/clearing renamed folders ...");
    prepare_dirs(&config.dest_layout()).await
}

async fn handle_copy(config: &Config) -> Result<(), Error> {
    handle_prepare(config).await?;

    println!("\nStep 2: Copying + renaming every sample ...");
    let (tx, bar) = progress_bar(SAMPLE_TEMPLATE, "Copying");
    let report = rename_and_copy(
        &config.source_layout(),
        &config.dest_layout(),
        config.progress_interval,
        Some(tx),
    )
    .await;
    let _ = bar.await;

    let report = report?;
    println!(
        "Copied {} samples into {}",
        report.len(),
        config.dest_root.display()
    );
    Ok(())
}

fn print_preview(split: &DatasetSplit) -> Result<(), Error> {
    println!("\nExample entry after renaming (should show '0001.jpg' etc.):");
    for record in split.preview(2) {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

async fn handle_publish(hub: &HubClient, config: &Config) -> Result<(), Error> {
    println!("\nStep 3: Building dataset and pushing to hub ...");
    let split = build_split(&config.dest_layout(), &config.split)?;
    println!("Built records for {} renamed samples.", split.len());
    print_preview(&split)?;

    let (tx, bar) = progress_bar(BYTES_TEMPLATE, "Uploading");
    let report = publish_split(hub, &split, &PublishOptions::from_config(config), Some(tx)).await;
    let _ = bar.await;

    let report = report?;
    debug!(
        "Commit {} at {}",
        report.commit.commit_oid,
        report.published_at.to_rfc3339()
    );
    println!("\nPushed dataset to: {}", report.url);
    Ok(())
}

async fn handle_run(token: Option<&str>, config: &Config) -> Result<(), Error> {
    // Resolve the credential before the destructive stages.
    let hub = hub_client(token, config)?;
    handle_copy(config).await?;
    handle_publish(&hub, config).await
}

fn handle_package(config: &Config, output: PathBuf) -> Result<(), Error> {
    let split = build_split(&config.dest_layout(), &config.split)?;
    print_preview(&split)?;

    let package = write_package(&split, &output, config.max_shard_size)?;
    for file in &package.files {
        println!("{} ({} bytes)", output.join(&file.path_in_repo).display(), file.size);
    }
    println!(
        "Packaged {} records ({} bytes) into {}",
        package.num_examples,
        package.num_bytes,
        output.display()
    );
    Ok(())
}

async fn handle_login(token: Option<String>, config: &Config) -> Result<(), Error> {
    let token = match token {
        Some(token) => token,
        None => Password::new("Hugging Face Token")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(|e| Error::InvalidParameters(e.to_string()))?,
    };
    let token = token.trim().to_string();

    let hub = HubClient::new(&config.endpoint, &token, config.timeout())?;
    let name = hub.whoami().await?;

    CredentialSource::File(config.token_file.clone())
        .storage()?
        .store(&token)?;

    println!("Successfully logged into {} as {}", hub.endpoint(), name);
    Ok(())
}

async fn handle_logout(config: &Config) -> Result<(), Error> {
    CredentialSource::File(config.token_file.clone())
        .storage()?
        .clear()?;
    println!("Successfully logged out");
    Ok(())
}

async fn handle_whoami(token: Option<&str>, config: &Config) -> Result<(), Error> {
    let hub = hub_client(token, config)?;
    println!("{}", hub.whoami().await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let token = args.token.as_deref();

    match args.cmd.clone() {
        Command::Run => handle_run(token, &config).await,
        Command::Prepare => handle_prepare(&config).await,
        Command::Copy => handle_copy(&config).await,
        Command::Package { output } => handle_package(&config, output),
        Command::Publish => {
            let hub = hub_client(token, &config)?;
            handle_publish(&hub, &config).await
        }
        Command::Login => handle_login(args.token.clone(), &config).await,
        Command::Logout => handle_logout(&config).await,
        Command::Whoami => handle_whoami(token, &config).await,
    }
}
