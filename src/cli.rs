use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "cloudshred",
    author,
    version,
    about = "Client-side encrypted cloud storage with cryptographic deletion.",
    long_about = "Client-side encrypted cloud storage. Every file is encrypted under its own \
                  key, wrapped by a puncturable key-wrapping scheme: shredding a file destroys \
                  the ability to ever unwrap its key again, even from retained ciphertext."
)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit machine-readable JSON output.")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Settings directory holding key material and properties."
    )]
    pub settings_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Storage directory standing in for the cloud bucket."
    )]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "List files stored in the cloud.")]
    Ls,

    #[command(about = "Print a file stored in the cloud.")]
    Read(ReadArgs),

    #[command(about = "Upload a local file or directory.")]
    Put(PutArgs),

    #[command(about = "Cryptographically delete a cloud file.")]
    Shred(ShredArgs),

    #[command(about = "Delete cloud objects that no file references.")]
    Clean,

    #[command(
        name = "rotate-keys",
        about = "Generate a fresh secret key and re-wrap every file key."
    )]
    RotateKeys,

    #[command(name = "export-key", about = "Export the wrapping key to a file.")]
    ExportKey(ExportKeyArgs),
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(value_name = "CLOUD_PATH", help = "Path of the file in the cloud.")]
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct PutArgs {
    #[arg(value_name = "LOCAL_PATH", help = "Local file or directory to upload.")]
    pub local_path: PathBuf,

    #[arg(
        long = "as",
        value_name = "CLOUD_PATH",
        help = "Cloud path to store a single file under (defaults to the local path)."
    )]
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ShredArgs {
    #[arg(value_name = "CLOUD_PATH", help = "Path of the file in the cloud.")]
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportKeyArgs {
    #[arg(long, value_name = "FILE", help = "Destination file for the exported key.")]
    pub out: PathBuf,

    #[arg(
        long,
        value_name = "PASSWORD",
        help = "Seal the export under a password (PBKDF2 + AES-256-GCM)."
    )]
    pub password: Option<String>,
}
