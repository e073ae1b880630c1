//! Fetch command - dispatch one request through the active worker

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{resolve_url, Method, Request, Response};
use crate::network::{HttpNetwork, NetworkProvider, OfflineNetwork};
use crate::worker::{FetchOutcome, WorkerState};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

use super::WorkerEnv;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> OffcacheResult<()> {
    let env = WorkerEnv::load(config).await?;

    let method: Method = args.method.parse()?;
    let url = resolve_url(&config.worker.scope, &args.target)?;
    let request = args
        .headers
        .iter()
        .fold(Request::new(method, url)?, |request, (name, value)| {
            request.with_header(name, value)
        });

    let network: Arc<dyn NetworkProvider> = if args.offline {
        Arc::new(OfflineNetwork)
    } else {
        Arc::new(HttpNetwork::new())
    };

    let response = match env.registration.active().await {
        Some(record) => {
            let controller = env
                .controller(&record, Arc::clone(&network))
                .with_state(WorkerState::Activated);

            let outcome = controller.handle_fetch(request).await;
            let response = match outcome {
                FetchOutcome::Respond { response, source } => {
                    info!("Served {} from {}", record.store_version, source);
                    response
                }
                FetchOutcome::Passthrough(request) => {
                    info!("{} not intercepted", request.cache_key());
                    network.fetch(&request).await?
                }
            };

            // Write-backs are aborted if the runtime exits first
            controller.settle_write_backs().await;
            response
        }
        None => {
            debug!("No active worker, using the network directly");
            network.fetch(&request).await?
        }
    };

    print_response(response, args.include)
}

fn print_response(response: Response, include: bool) -> OffcacheResult<()> {
    let mut out = std::io::stdout().lock();
    let write_err = |e| OffcacheError::io("writing response", e);

    if include {
        writeln!(out, "HTTP {} {}", response.status(), response.status_text()).map_err(write_err)?;
        for (name, value) in response.headers().iter() {
            writeln!(out, "{}: {}", name, value).map_err(write_err)?;
        }
        writeln!(out).map_err(write_err)?;
    }

    out.write_all(&response.into_body()).map_err(write_err)?;
    out.flush().map_err(write_err)
}
