use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info};
use mouch::couch::{HttpTransport, Transport};
use mouch::observability::init_observability;
use mouch::sync::{PushAgent, bootstrap};
use mouch::{config, read_input, run_push, target_urls};

#[derive(Parser)]
#[command(name = "mouch", version, about = "Mouch - push a rendered CouchApp bundle to CouchDB")]
struct Cli {
	/// Additional JSON config file layered over the system and user config
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	/// Log level (error, warn, info, debug, trace)
	#[arg(long, global = true)]
	log_level: Option<log::Level>,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Push a rendered bundle ({"docs": [...]} or a single document) to one or more databases
	Push {
		/// Bundle JSON file, or `-` for stdin
		input: PathBuf,
		/// Target database URLs; MOUCH_URL is added to these
		urls: Vec<String>,
		/// Documents per _bulk_docs request
		#[arg(long)]
		batch_size: Option<usize>,
		/// Per-request timeout in milliseconds
		#[arg(long)]
		timeout_ms: Option<u64>,
		/// Verify TLS certificates (verification is off by default)
		#[arg(long)]
		verify_tls: bool,
		/// Write Prometheus metrics to this file when the push finishes
		#[arg(long)]
		metrics_file: Option<PathBuf>,
	},
	/// Print the database info document of each target
	Info {
		/// Target database URLs; MOUCH_URL is added to these
		urls: Vec<String>,
	},
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	let mut settings = match config::load_with(cli.config.as_deref()) {
		Ok(s) => s,
		Err(e) => {
			eprintln!("{}", e);
			return ExitCode::from(1);
		}
	};
	if let Some(level) = cli.log_level {
		settings.log_level = level;
	}

	let observability = match init_observability(settings.log_level) {
		Ok(o) => o,
		Err(e) => {
			eprintln!("{}", e);
			return ExitCode::from(1);
		}
	};

	match cli.command {
		Commands::Push {
			input,
			urls,
			batch_size,
			timeout_ms,
			verify_tls,
			metrics_file,
		} => {
			if let Some(b) = batch_size {
				settings.batch_size = b;
			}
			if let Some(t) = timeout_ms {
				settings.timeout_ms = t;
			}
			if verify_tls {
				settings.insecure = false;
			}
			if let Err(e) = settings.validate() {
				error!("{}", e);
				return ExitCode::from(1);
			}

			// Validate everything before touching the network.
			let targets = match target_urls(&urls, settings.url.as_deref()) {
				Ok(t) if t.is_empty() => {
					error!("no target database URL given (pass one or set {})", config::URL_ENV);
					return ExitCode::from(1);
				}
				Ok(t) => t,
				Err(e) => {
					error!("{}", e);
					return ExitCode::from(1);
				}
			};
			let set = match read_input(&input).await {
				Ok(s) => s,
				Err(e) => {
					error!("{:#}", e);
					return ExitCode::from(1);
				}
			};
			let transport = match HttpTransport::new(&settings.transport()) {
				Ok(t) => t,
				Err(e) => {
					error!("{}", e);
					return ExitCode::from(1);
				}
			};

			let agent = PushAgent::new(Arc::new(transport), settings.batch_size)
				.with_metrics(Arc::clone(&observability.metrics));
			let mut out = std::io::stdout();
			let mut err = std::io::stderr();
			let summary = match run_push(&agent, set, targets, &mut out, &mut err).await {
				Ok(s) => s,
				Err(e) => {
					error!("failed to write progress: {}", e);
					return ExitCode::from(1);
				}
			};

			if let Some(path) = metrics_file {
				if let Err(e) = observability.write_metrics(&path) {
					error!("{:#}", e);
				}
			}

			info!(
				"pushed {} documents to {} target(s), {} error(s)",
				summary.pushed, summary.targets, summary.errors
			);
			if summary.is_clean() {
				ExitCode::SUCCESS
			} else {
				ExitCode::from(2)
			}
		}
		Commands::Info { urls } => {
			let targets = match target_urls(&urls, settings.url.as_deref()) {
				Ok(t) if t.is_empty() => {
					error!("no target database URL given (pass one or set {})", config::URL_ENV);
					return ExitCode::from(1);
				}
				Ok(t) => t,
				Err(e) => {
					error!("{}", e);
					return ExitCode::from(1);
				}
			};
			let transport: Arc<dyn Transport> = match HttpTransport::new(&settings.transport()) {
				Ok(t) => Arc::new(t),
				Err(e) => {
					error!("{}", e);
					return ExitCode::from(1);
				}
			};

			let mut failed = false;
			for url in targets {
				match bootstrap::info(transport.as_ref(), &url).await {
					Ok(doc) => println!("{}: {}", url, doc),
					Err(e) => {
						failed = true;
						eprintln!("{}: {}", url, e.payload());
					}
				}
			}
			if failed {
				ExitCode::from(2)
			} else {
				ExitCode::SUCCESS
			}
		}
	}
}
