//! The `server` binary (§6: `server [--ip <addr>] [--port
//! <49152..65534>]`). Accepts connections on a plain blocking
//! `TcpListener` and spawns one thread per connection, the glue standing
//! in for the out-of-scope `select`-based multiplexer (§1, §5).

use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use safecloud_cli::fs_pool::{sweep_stale_temp_files, FsStoragePoolFactory};
use safecloud_cli::fs_registry::FsUserRegistry;
use safecloud_cli::DEFAULT_PORT;
use safecloud_connection::{GuestNames, ServerConnection};
use safecloud_crypto::RsaSigningKey;

#[derive(Parser)]
#[command(name = "server", about = "SafeCloud secure channel core, server")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory holding `<name>.pem` public keys of registered clients.
    #[arg(long, default_value = "./safecloud-data/pubkeys")]
    pubkeys_dir: PathBuf,

    /// Root directory under which each client gets a per-user subdirectory.
    #[arg(long, default_value = "./safecloud-data/pool")]
    pool_root: PathBuf,

    /// This server's long-term RSA private key, PEM-encoded.
    #[arg(long, default_value = "./safecloud-data/server_key.pem")]
    private_key: PathBuf,

    /// This server's X.509 certificate, signed by a CA the clients trust.
    #[arg(long, default_value = "./safecloud-data/server_cert.pem")]
    cert: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !(49152..=65534).contains(&args.port) {
        anyhow::bail!("--port must be in 49152..65534, got {}", args.port);
    }

    let signing_key_pem = std::fs::read(&args.private_key)
        .with_context(|| format!("reading private key at {}", args.private_key.display()))?;
    let signing_key = Arc::new(
        RsaSigningKey::from_pem(&signing_key_pem).context("parsing server private key")?,
    );
    let cert_pem = Arc::new(
        std::fs::read(&args.cert).with_context(|| format!("reading certificate at {}", args.cert.display()))?,
    );
    let registry = Arc::new(FsUserRegistry::new(args.pubkeys_dir));
    sweep_stale_temp_files(&args.pool_root).context("sweeping stale upload temp files")?;
    let pool_factory = Arc::new(FsStoragePoolFactory::new(args.pool_root));

    let listener = TcpListener::bind((args.ip.as_str(), args.port))
        .with_context(|| format!("binding {}:{}", args.ip, args.port))?;
    info!("listening on {}:{}", args.ip, args.port);

    let guest_names = GuestNames::new();

    for incoming in listener.incoming() {
        let mut stream: TcpStream = match incoming {
            Ok(s) => s,
            Err(e) => {
                error!("accept failed: {e}");
                continue;
            }
        };
        let signing_key = signing_key.clone();
        let cert_pem = cert_pem.clone();
        let registry = registry.clone();
        let pool_factory = pool_factory.clone();
        let guest_names = guest_names.clone();

        thread::spawn(move || {
            let conn = ServerConnection::new(signing_key, cert_pem, registry, pool_factory);
            if let Err(e) = conn.run(&mut stream, &guest_names) {
                error!("connection closed with error: {e}");
            }
        });
    }

    Ok(())
}
