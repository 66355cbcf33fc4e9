//! The `client` binary (§6: `client [--ip <addr>] [--port <…>]
//! --user <name>`). Establishes one connection, then drives an interactive
//! command loop over stdin issuing individual file operations, the
//! per-command shape a terminal UI is free to choose since only the
//! connection-level CLI flags are fixed.

use std::io::{self, BufRead, Write as _};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use safecloud_cli::DEFAULT_PORT;
use safecloud_connection::ClientConnection;
use safecloud_crypto::{RsaSigningKey, TrustStore};
use safecloud_session::{ClientSession, Outcome};

#[derive(Parser)]
#[command(name = "client", about = "SafeCloud secure channel core, client")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The name this client authenticates as; must match a `<name>.pem`
    /// entry in the server's pubkeys directory.
    #[arg(long)]
    user: String,

    /// This client's long-term RSA private key, PEM-encoded.
    #[arg(long, default_value = "./safecloud-data/client_key.pem")]
    private_key: PathBuf,

    /// PEM bundle of trusted root CA certificates.
    #[arg(long, default_value = "./safecloud-data/trust_store.pem")]
    trust_store: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let signing_key_pem = std::fs::read(&args.private_key)
        .with_context(|| format!("reading private key at {}", args.private_key.display()))?;
    let signing_key = Arc::new(RsaSigningKey::from_pem(&signing_key_pem).context("parsing client private key")?);
    let trust_store_pem = std::fs::read(&args.trust_store)
        .with_context(|| format!("reading trust store at {}", args.trust_store.display()))?;
    let trust_store = Arc::new(TrustStore::from_pem_bundle(&trust_store_pem).context("parsing trust store")?);

    let mut stream = TcpStream::connect((args.ip.as_str(), args.port))
        .with_context(|| format!("connecting to {}:{}", args.ip, args.port))?;
    info!("connected to {}:{}", args.ip, args.port);

    let connection = ClientConnection::new(&args.user, signing_key, trust_store).context("building connection")?;
    let mut session = connection.establish(&mut stream).context("handshake failed")?;
    info!("authenticated as \"{}\"", args.user);

    run_command_loop(&mut session, &mut stream)
}

fn run_command_loop(session: &mut ClientSession, stream: &mut TcpStream) -> Result<()> {
    println!("commands: upload <local> <remote> [--overwrite] | download <remote> <local> | delete <remote> [--force] | rename <old> <new> | list | quit");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            ["quit"] | ["exit"] => {
                session.send_bye(stream).ok();
                break;
            }
            ["upload", local, remote] => session.upload(stream, local.as_ref(), remote, false).map(describe),
            ["upload", local, remote, "--overwrite"] => session.upload(stream, local.as_ref(), remote, true).map(describe),
            ["download", remote, local] => session.download(stream, remote, local.as_ref()).map(describe),
            ["delete", remote] => session.delete(stream, remote, true).map(describe),
            ["delete", remote, "--force"] => session.delete(stream, remote, true).map(describe),
            ["rename", old, new] => session.rename(stream, old, new).map(describe),
            ["list"] => session.list(stream).map(|entries| {
                for entry in &entries {
                    println!("{}\t{}\tbytes", entry.name, entry.size);
                }
                format!("{} entries", entries.len())
            }),
            [] => continue,
            _ => {
                println!("unrecognized command: {line}");
                continue;
            }
        };
        match result {
            Ok(msg) => println!("{msg}"),
            Err(e) => {
                println!("error: {e}");
                if e.is_fatal() {
                    anyhow::bail!("connection closed: {e}");
                }
            }
        }
        io::stdout().flush().ok();
    }
    Ok(())
}

fn describe(outcome: Outcome) -> String {
    match outcome {
        Outcome::Completed => "completed".to_string(),
        Outcome::Cancelled => "cancelled".to_string(),
    }
}
