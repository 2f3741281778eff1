//! Spool upload server.
//!
//! Streams multipart/form-data request bodies into temporary files.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Method;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use spool_lib::{render_uploads, Dispatcher, HealthHandler, UploadHandler};
use spool_multipart::{
    receive_upload, FieldPolicy, UploadConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FIELD_BYTES,
    DEFAULT_MAX_HEADER_BYTES,
};
use spool_telemetry::{
    log_listening, log_startup, LogFormat, LogWriter, Telemetry, TelemetryConfig,
};

#[derive(Parser, Debug)]
#[command(name = "spool", about = "Streaming multipart upload server", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the upload server.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:8080", env = "SPOOL_LISTEN")]
        listen: String,

        #[command(flatten)]
        upload: UploadArgs,

        /// Enable development mode (error details, pretty logs).
        #[arg(long)]
        dev: bool,

        /// Log level.
        #[arg(long, default_value = "info")]
        log_level: String,

        /// Log format (json or pretty). Defaults to pretty in dev mode.
        #[arg(long)]
        log_format: Option<String>,
    },

    /// Parse a multipart body from a file (or stdin) and print the result.
    Parse {
        /// Content-Type header value carrying the boundary.
        #[arg(long)]
        content_type: String,

        /// Body file; `-` reads stdin.
        #[arg(long, default_value = "-")]
        input: String,

        #[command(flatten)]
        upload: UploadArgs,

        /// Log level.
        #[arg(long, default_value = "warn")]
        log_level: String,
    },
}

/// Upload session settings shared by both commands.
#[derive(clap::Args, Debug)]
struct UploadArgs {
    /// Directory for temporary files.
    #[arg(long, default_value = ".", env = "SPOOL_UPLOAD_DIR")]
    upload_dir: PathBuf,

    /// Bytes requested per read from the body.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Handling of parts without a filename (memory or file).
    #[arg(long, default_value = "memory")]
    field_policy: String,

    /// Maximum size of one part's header block in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_HEADER_BYTES)]
    max_header_bytes: usize,

    /// Maximum size of an in-memory field value in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FIELD_BYTES)]
    max_field_bytes: usize,
}

impl UploadArgs {
    fn to_config(&self) -> Result<UploadConfig, String> {
        let policy = FieldPolicy::parse(&self.field_policy)
            .ok_or_else(|| format!("invalid field policy: {}", self.field_policy))?;

        Ok(UploadConfig::new()
            .with_base_dir(&self.upload_dir)
            .with_chunk_size(self.chunk_size)
            .with_field_policy(policy)
            .with_max_header_bytes(self.max_header_bytes)
            .with_max_field_bytes(self.max_field_bytes))
    }
}

/// Run the serve command.
async fn run_serve(listen: &str, config: UploadConfig, dev: bool, telemetry: Telemetry) -> ExitCode {
    if let Err(e) = tokio::fs::create_dir_all(&config.base_dir).await {
        eprintln!(
            "error: cannot create upload directory {}: {}",
            config.base_dir.display(),
            e
        );
        return ExitCode::from(1);
    }

    let upload_dir = config.base_dir.display().to_string();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("/upload", Method::POST, UploadHandler::new(config, dev));
    dispatcher.register("/__spool/health", Method::GET, HealthHandler);
    let dispatcher = Arc::new(dispatcher);

    // Parse listen address
    let addr: SocketAddr = match listen.parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("error: invalid listen address: {}", listen);
            return ExitCode::from(1);
        }
    };

    // Bind the listener
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: failed to bind to {}: {}", addr, e);
            return ExitCode::from(1);
        }
    };

    log_listening!(
        addr = %addr,
        upload_dir = %upload_dir,
        routes = dispatcher.routes(),
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Accept connections
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let dispatcher = Arc::clone(&dispatcher);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { dispatcher.handle(req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(peer = %peer, error = %e, "connection error");
            }
        });
    }

    telemetry.shutdown();
    ExitCode::SUCCESS
}

/// Run the parse command.
async fn run_parse(content_type: &str, input: &str, config: UploadConfig) -> ExitCode {
    let result = if input == "-" {
        receive_upload(content_type, &mut tokio::io::stdin(), config).await
    } else {
        match tokio::fs::File::open(input).await {
            Ok(mut file) => receive_upload(content_type, &mut file, config).await,
            Err(e) => {
                eprintln!("error: cannot open {}: {}", input, e);
                return ExitCode::from(1);
            }
        }
    };

    match result {
        Ok(uploads) => {
            print!("{}", render_uploads(&uploads));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            upload,
            dev,
            log_level,
            log_format,
        } => {
            let log_format = match log_format.as_deref() {
                Some(s) => match LogFormat::parse(s) {
                    Some(f) => f,
                    None => {
                        eprintln!("error: invalid log format: {}", s);
                        return ExitCode::from(1);
                    }
                },
                None if dev => LogFormat::Pretty,
                None => LogFormat::Json,
            };

            let telemetry = match Telemetry::init(
                TelemetryConfig::new()
                    .with_log_level(log_level)
                    .with_log_format(log_format),
            ) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(1);
                }
            };

            let config = match upload.to_config() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(1);
                }
            };

            log_startup!(
                service = %telemetry.config().service_name,
                version = env!("CARGO_PKG_VERSION"),
                dev_mode = dev,
                chunk_size = config.chunk_size,
            );

            run_serve(&listen, config, dev, telemetry).await
        }
        Commands::Parse {
            content_type,
            input,
            upload,
            log_level,
        } => {
            // stdout carries the listing
            let config = TelemetryConfig::new()
                .with_service_name("spool-parse")
                .with_log_level(log_level)
                .with_log_format(LogFormat::Pretty)
                .with_writer(LogWriter::Stderr);
            if let Err(e) = Telemetry::init(config) {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }

            match upload.to_config() {
                Ok(config) => run_parse(&content_type, &input, config).await,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::from(1)
                }
            }
        }
    }
}
