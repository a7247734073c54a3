use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use blockvault::{
    CommandSigner, ContentId, DEFAULT_MAX_FILE_SIZE, FileDigest, FsContentStore, Ledger,
    LedgerRecord, LocalKeySigner, PlaintextFile, Signer, Vault, VaultError, default_data_dir,
    message::encryption_message, sniff,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct SignerArgs {
    /// External wallet command; reads the message on stdin, prints the signature
    #[arg(long = "signer-cmd", value_name = "CMD", env = "BLOCKVAULT_SIGNER_CMD")]
    command: Option<String>,

    /// Sign without asking for confirmation
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,
}

struct ResolvedSigner {
    signer: Box<dyn Signer>,
    identity: Option<String>,
}

impl SignerArgs {
    fn resolve(&self) -> Result<ResolvedSigner> {
        if let Some(command) = &self.command {
            return Ok(ResolvedSigner {
                signer: Box::new(CommandSigner::parse(command)?),
                identity: None,
            });
        }

        let seed = auth::read_signer_key()?;
        let local = LocalKeySigner::from_hex(&seed)?;
        drop(seed);
        let identity = Some(local.identity());

        let signer: Box<dyn Signer> = if self.yes {
            Box::new(local)
        } else {
            Box::new(auth::ConfirmingSigner::new(local))
        };

        Ok(ResolvedSigner { signer, identity })
    }
}

#[derive(Debug, Parser)]
#[command(name = "blockvault")]
#[command(
    version,
    about = "Encrypt files with a key derived from your wallet signature."
)]
struct Cli {
    /// Directory of the content-addressed object store
    #[arg(long, global = true, value_name = "PATH", env = "BLOCKVAULT_STORE")]
    store: Option<PathBuf>,

    /// Path to the metadata ledger file
    #[arg(long, global = true, value_name = "PATH", env = "BLOCKVAULT_LEDGER")]
    ledger: Option<PathBuf>,

    /// Largest file accepted for encryption, in bytes
    #[arg(
        long = "max-size",
        global = true,
        value_name = "BYTES",
        env = "BLOCKVAULT_MAX_SIZE",
        default_value_t = DEFAULT_MAX_FILE_SIZE
    )]
    max_size: u64,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, env = "BLOCKVAULT_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file and puts it in the store
    #[command(arg_required_else_help = true)]
    Encrypt {
        file: PathBuf,

        #[command(flatten)]
        signer: SignerArgs,

        /// Copy the content id to the clipboard
        #[arg(long, default_value_t = false)]
        copy: bool,

        /// Do not record the upload in the ledger
        #[arg(long = "no-ledger", default_value_t = false)]
        no_ledger: bool,
    },

    /// Fetches and decrypts a file from the store
    #[command(arg_required_else_help = true)]
    Decrypt {
        content_id: String,

        /// File hash printed at encryption time (looked up in the ledger if omitted)
        #[arg(long = "hash", value_name = "HASH")]
        digest: Option<String>,

        /// Original file name (looked up in the ledger if omitted)
        #[arg(long)]
        name: Option<String>,

        /// Where to write the decrypted file (default: restored name in the current directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long, default_value_t = false)]
        force: bool,

        #[command(flatten)]
        signer: SignerArgs,
    },

    /// Prints the SHA-256 file hash
    #[command(arg_required_else_help = true)]
    Hash { file: PathBuf },

    /// Prints the message a wallet is asked to sign for a file hash
    #[command(arg_required_else_help = true)]
    Message { digest: String },

    /// Detects a file's type from its magic bytes
    #[command(arg_required_else_help = true)]
    Sniff { file: PathBuf },

    /// Lists files recorded in the ledger
    Files {
        /// Only files uploaded by this identity
        #[arg(long)]
        owner: Option<String>,
    },

    /// Shows the ledger record of a file hash
    #[command(arg_required_else_help = true)]
    Info { digest: String },

    /// Prints the public key of the local signer
    Identity,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn store_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => Ok(default_data_dir()?.join("objects")),
    }
}

fn ledger_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => Ok(default_data_dir()?.join("ledger.json")),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn write_output(path: &Path, bytes: &[u8], force: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn copy_to_clipboard(text: &str) {
    let copied = arboard::Clipboard::new().and_then(|mut c| c.set_text(text.to_string()));
    match copied {
        Ok(()) => println!("content id copied to clipboard"),
        Err(e) => warn!("could not copy to clipboard: {e}"),
    }
}

fn print_records(records: &[&LedgerRecord]) {
    if records.is_empty() {
        println!("No files recorded.");
        return;
    }

    let name_width = records
        .iter()
        .map(|r| r.name().len())
        .chain(std::iter::once("Name".len()))
        .max()
        .unwrap_or(4);

    println!("{:<name_width$}  {:>10}  {:<64}  Content id", "Name", "Size", "File hash");
    println!("{:-<name_width$}  {:->10}  {:-<64}  {:-<10}", "", "", "", "");

    for r in records {
        println!(
            "{:<name_width$}  {:>10}  {:<64}  {}",
            r.name(),
            r.size(),
            r.digest(),
            r.content_id()
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(&args.log_level);

    match args.command {
        Commands::Encrypt {
            file,
            signer,
            copy,
            no_ledger,
        } => {
            let size = fs::metadata(&file)
                .with_context(|| format!("cannot read {}", file.display()))?
                .len();
            if size > args.max_size {
                return Err(VaultError::FileTooLarge {
                    size,
                    limit: args.max_size,
                }
                .into());
            }

            let bytes =
                fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let plaintext = PlaintextFile::new(file_name_of(&file), bytes);

            let resolved = signer.resolve()?;
            let mut vault = Vault::new(FsContentStore::new(store_path(args.store)?))
                .with_max_file_size(args.max_size);
            if !no_ledger {
                vault = vault.with_ledger(Ledger::open(ledger_path(args.ledger)?)?);
            }

            let upload = vault
                .upload(&plaintext, resolved.signer.as_ref(), resolved.identity.as_deref())
                .context("encryption failed")?;

            println!("encrypted '{}'", plaintext.name());
            println!("content id: {}", upload.content_id());
            println!("file hash:  {}", upload.digest());

            if let Some(e) = upload.ledger_error() {
                eprintln!("warning: file is stored but not recorded in the ledger: {e}");
                eprintln!("keep the content id and file hash to decrypt it later");
            }

            if copy {
                copy_to_clipboard(upload.content_id().as_str());
            }
        }
        Commands::Decrypt {
            content_id,
            digest,
            name,
            output,
            force,
            signer,
        } => {
            let digest = digest.as_deref().map(FileDigest::parse).transpose()?;
            let content_id = ContentId::new(content_id);

            let ledger_path = ledger_path(args.ledger)?;
            let mut vault = Vault::new(FsContentStore::new(store_path(args.store)?));
            if ledger_path.exists() {
                vault = vault.with_ledger(Ledger::open(ledger_path)?);
            } else if digest.is_none() {
                bail!("--hash is required when there is no ledger");
            }

            let resolved = signer.resolve()?;
            let restored = vault
                .download(&content_id, digest.as_ref(), name.as_deref(), resolved.signer.as_ref())
                .context("decryption failed")?;

            // never let a recorded name pick a directory
            let output = match output {
                Some(path) => path,
                None => PathBuf::from(file_name_of(Path::new(restored.name()))),
            };
            write_output(&output, restored.bytes(), force)?;

            println!(
                "decrypted {} ({}, {} bytes)",
                output.display(),
                restored.mime(),
                restored.bytes().len()
            );
        }
        Commands::Hash { file } => {
            let bytes =
                fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
            println!("{}", FileDigest::of(&bytes));
        }
        Commands::Message { digest } => {
            let digest = FileDigest::parse(&digest)?;
            println!("{}", encryption_message(&digest));
        }
        Commands::Sniff { file } => {
            let bytes =
                fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let kind = sniff::classify(&bytes);
            println!("{kind} ({})", kind.mime());
            if kind.is_known() {
                let name = file_name_of(&file);
                let repaired = sniff::repair_name(&name, kind);
                if repaired != name {
                    println!("suggested name: {repaired}");
                }
            }
        }
        Commands::Files { owner } => {
            let ledger = Ledger::open(ledger_path(args.ledger)?)?;
            let records = match owner.as_deref() {
                Some(owner) => ledger.files_of(owner),
                None => ledger.all(),
            };
            print_records(&records);
            println!("\n{} file(s), {} in total", records.len(), ledger.total());
        }
        Commands::Info { digest } => {
            let digest = FileDigest::parse(&digest)?;
            let vault = Vault::new(FsContentStore::new(store_path(args.store)?))
                .with_ledger(Ledger::open(ledger_path(args.ledger)?)?);
            let record = vault.record(&digest)?;

            println!("name:       {}", record.name());
            println!("size:       {} bytes", record.size());
            println!("file hash:  {}", record.digest());
            println!("content id: {}", record.content_id());
            println!("owner:      {}", record.owner().unwrap_or("-"));
            println!("uploaded:   {}", record.timestamp());
        }
        Commands::Identity => {
            let seed = auth::read_signer_key()?;
            let local = LocalKeySigner::from_hex(&seed)?;
            println!("{}", local.identity());
        }
    }

    Ok(())
}
