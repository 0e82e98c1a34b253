// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portiere_http_handling::{
    PortiereConfig,
    PortiereSettings,
    Router,
    TlsContext,
};

mod example_handlers;

/// A small HTTP/1.x server demonstrating the portiere engine.
#[derive(Debug, Parser)]
#[command(name = "portiere", version)]
struct Arguments {
    /// The address to listen on.
    #[arg(long, env = "PORTIERE_ADDRESS", default_value = "127.0.0.1:8080")]
    address: String,

    /// The directory served under `/files/`.
    #[arg(long, env = "PORTIERE_WWWROOT", default_value = "wwwroot")]
    wwwroot: PathBuf,

    /// A PKCS#12 archive or PEM bundle with the certificate chain and the
    /// private key. Enables TLS.
    #[arg(long, env = "PORTIERE_KEY_STORE", conflicts_with = "self_signed")]
    key_store: Option<PathBuf>,

    /// The password of the PKCS#12 archive.
    #[arg(long, env = "PORTIERE_KEY_STORE_PASSWORD", default_value = "", hide_env_values = true)]
    key_store_password: String,

    /// Enables TLS with a freshly generated certificate for `localhost`.
    #[arg(long)]
    self_signed: bool,

    /// Seconds a client gets to send the request-line and headers.
    #[arg(long, default_value_t = 45)]
    read_headers_timeout: u64,

    /// Seconds a client gets to send the request body.
    #[arg(long, default_value_t = 60)]
    read_body_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portiere=info,portiere_http1=info,portiere_http_handling=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let arguments = Arguments::parse();
    let start = Instant::now();

    let mut router = Router::new();
    example_handlers::register(&mut router, &arguments.wwwroot)?;

    let mut settings = PortiereSettings::with_router(router);
    settings.read_headers_timeout = Duration::from_secs(arguments.read_headers_timeout);
    settings.read_body_timeout = Duration::from_secs(arguments.read_body_timeout);

    let mut config = PortiereConfig::new(settings);
    if let Some(tls) = load_tls(&arguments).await? {
        config = config.with_tls(tls);
    }

    let elapsed = start.elapsed();
    info!(?elapsed, "loaded");

    portiere_http1::start(&arguments.address, config).await
        .with_context(|| format!("failed to serve on {}", arguments.address))
}

async fn load_tls(arguments: &Arguments) -> anyhow::Result<Option<TlsContext>> {
    if let Some(path) = &arguments.key_store {
        let context = TlsContext::from_key_store_file(path, &arguments.key_store_password).await
            .with_context(|| format!("failed to load key store {}", path.display()))?;
        return Ok(Some(context));
    }

    if arguments.self_signed {
        warn!("using a self-signed certificate for localhost");
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
        let bundle = format!("{}{}", certified.cert.pem(), certified.key_pair.serialize_pem());
        return Ok(Some(TlsContext::build(bundle.as_bytes(), "")?));
    }

    Ok(None)
}
