#![forbid(unsafe_code)]

//! firma CLI: sign electronic tax documents and inspect signing bundles.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use firma::XmlFileSource;
use firma_core::{algorithm, Error};
use firma_keys::KeyBundle;
use firma_xades::{FixedId, IdGenerator, SignatureOptions, Signer, SigningContext, UuidGenerator};

#[derive(Parser)]
#[command(
    name = "firma",
    about = "firma: XAdES-BES signatures for electronic tax documents",
    version
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an unsigned XML document
    Sign {
        /// Unsigned XML document
        file: PathBuf,

        /// PKCS#12 bundle with the signing certificate and key
        #[arg(short = 'k', long = "p12")]
        p12: PathBuf,

        /// Bundle passphrase
        #[arg(short, long, env = "FIRMA_P12_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Canonicalization method URI
        #[arg(long, default_value = algorithm::C14N)]
        c14n: String,

        /// Signature method URI
        #[arg(long = "signature-method", default_value = algorithm::RSA_SHA256)]
        signature_method: String,

        /// Digest method URI
        #[arg(long = "digest-method", default_value = algorithm::SHA256)]
        digest_method: String,

        /// Fixed signature identifier instead of a random UUID
        #[arg(long)]
        id: Option<String>,
    },

    /// Show the signing certificate of a PKCS#12 bundle
    Info {
        /// PKCS#12 bundle
        p12: PathBuf,

        /// Bundle passphrase
        #[arg(short, long, env = "FIRMA_P12_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Sign {
            file,
            p12,
            password,
            output,
            c14n,
            signature_method,
            digest_method,
            id,
        } => {
            let options = SignatureOptions::default()
                .with_canonicalization_uri(&c14n)
                .with_signature_method(signature_method)
                .with_digest_method(digest_method);
            cmd_sign(file, p12, &password, output, options, id)
        }
        Commands::Info { p12, password } => cmd_info(p12, &password),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_bundle(path: &Path, password: &str) -> Result<KeyBundle, Error> {
    let data = std::fs::read(path).map_err(|e| Error::read(path, e))?;
    KeyBundle::from_pkcs12(&data, password)
}

fn cmd_sign(
    file: PathBuf,
    p12: PathBuf,
    password: &str,
    output: Option<PathBuf>,
    options: SignatureOptions,
    id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = Arc::new(load_bundle(&p12, password)?);
    let ids: Box<dyn IdGenerator> = match id {
        Some(id) => Box::new(FixedId::new(id)),
        None => Box::new(UuidGenerator),
    };
    let ctx = SigningContext::new(bundle, ids.as_ref());

    let mut source = XmlFileSource::new(&file);
    if let Some(out) = &output {
        source = source.with_output(out);
    }
    tracing::debug!(file = %source.path().display(), "loaded document");
    let signed = firma::sign_document(&Signer::new(options), ctx, &source)?;

    if output.is_none() {
        print!("{signed}");
    }
    Ok(())
}

fn cmd_info(p12: PathBuf, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_bundle(&p12, password)?;
    println!("Subject:       {}", bundle.subject_name());
    println!("Issuer:        {}", bundle.issuer_name());
    println!("Serial:        {}", bundle.serial_number());
    if let Some((not_before, not_after)) = bundle.validity() {
        println!("Valid from:    {}", not_before.to_rfc3339());
        println!("Valid until:   {}", not_after.to_rfc3339());
    }
    println!("Certificates:  {}", bundle.chain().len());
    Ok(())
}
