mod arcshift;
mod cli;
mod config;
mod dashboard;
mod distributed;
mod domain;
mod driver;
mod error;
mod httpfile;
mod logger;
mod merge;
mod metrics;
mod output;
mod pool;
mod protocol;
mod registry;
mod shutdown;
mod template;

use clap::Parser;

use cli::CliArgs;
use domain::now_epoch_ms;
use driver::LoadDriver;
use error::AppError;

fn main() -> std::process::ExitCode {
    let mut args = CliArgs::parse();

    match config::load_config(args.config.as_deref()) {
        Ok(Some(config_file)) => args.apply_config(&config_file),
        Ok(None) => {}
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return std::process::ExitCode::FAILURE;
        }
    }

    logger::init_logging(args.verbose);

    let runtime_builder_result = build_runtime(args.cpus);
    let runtime = match runtime_builder_result {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start the async runtime: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn build_runtime(cpus: Option<usize>) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(cpus) = cpus {
        builder.worker_threads(cpus.max(1));
    }
    builder.build()
}

async fn run(args: CliArgs) -> Result<(), AppError> {
    let (shutdown_tx, _shutdown_rx) = shutdown::shutdown_channel();
    let _signal_handle = shutdown::setup_signal_shutdown_handler(&shutdown_tx);

    if let Some(listen_addr) = args.listen.clone() {
        distributed::serve(&listen_addr)
            .await
            .map_err(AppError::distributed)?;
        return Ok(());
    }

    let seq = i64::try_from(now_epoch_ms()).unwrap_or(i64::MAX);
    let spec = args.build_run_spec(seq).map_err(AppError::validation)?;

    let report = if args.workers.is_empty() {
        let (driver, handle) = LoadDriver::start(spec).map_err(AppError::http)?;
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::select! {
            report = handle => report.map_err(AppError::from)?,
            _ = shutdown_rx.recv() => {
                driver.stop();
                driver.get_result()
            }
        }
    } else {
        let workers = args.workers.clone();
        tokio::select! {
            result = distributed::run_coordinated(&spec, &workers) => result.map_err(AppError::distributed)?,
            _ = shutdown_tx.subscribe().recv() => {
                distributed::stop_coordinated(spec.seq, &workers).await;
                domain::Report::default()
            }
        }
    };

    println!("{}", output::render(&report));
    Ok(())
}
