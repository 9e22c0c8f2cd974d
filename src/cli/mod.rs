use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ops::JarOptions;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by `create` and `update`, modelled on the classic jar tool.
#[derive(clap::Args, Clone, Debug)]
pub struct BuildArgs {
    /// The archive file to write (create) or rewrite in place (update).
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// Input files or directories, expanded in order.
    pub inputs: Vec<PathBuf>,

    /// Include manifest information from the given manifest file. On update
    /// the new values merge over the archive's manifest and win on conflict.
    #[arg(short = 'm', long)]
    pub manifest: Option<PathBuf>,

    /// Record the application entry point in the manifest's Main-Class
    /// attribute. Fails if the manifest already declares one.
    #[arg(short = 'e', long = "main-class", conflicts_with = "no_manifest")]
    pub main_class: Option<String>,

    /// Store entries without compression.
    #[arg(short = '0', long = "store")]
    pub store_only: bool,

    /// Do not create a manifest entry (on update: drop it).
    #[arg(short = 'M', long = "no-manifest", conflicts_with = "manifest")]
    pub no_manifest: bool,

    /// Change to the given directory when resolving entry names; the prefix
    /// is stripped from matching inputs. May be repeated, longest match
    /// wins.
    #[arg(short = 'C', long = "relocate")]
    pub relocations: Vec<PathBuf>,
}

impl BuildArgs {
    pub fn jar_options(&self) -> JarOptions {
        JarOptions {
            inputs: self.inputs.clone(),
            manifest: self.manifest.clone(),
            main_class: self.main_class.clone(),
            store_only: self.store_only,
            no_manifest: self.no_manifest,
            relocations: self.relocations.clone(),
        }
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create a new archive from the specified files and directories.
    #[command(alias = "c")]
    Create(BuildArgs),

    /// Update an existing archive: replace matching entries, append new
    /// ones, merge manifest changes.
    #[command(alias = "u")]
    Update(BuildArgs),

    /// Generate the transitive classpath index for an archive and write it
    /// back as META-INF/INDEX.LIST.
    #[command(alias = "i")]
    Index {
        /// The root archive to index.
        #[arg(required = true)]
        archive: PathBuf,

        /// Additional archives to index when the root declares no Class-Path
        /// references of its own.
        extras: Vec<PathBuf>,
    },
}

/// Parses command-line arguments using `clap` and returns the command to
/// execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}
