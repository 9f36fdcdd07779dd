mod bridge;
mod error;
mod hostfxr;
mod nethost;
mod pal;
mod paths;
mod runtime;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Bootstrap failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Finds hostfxr, starts the runtime and calls the managed entry point once.
/// hostfxr is unloaded before this returns, whether or not it succeeded.
fn run() -> error::Result<()> {
    let invocation = env::args_os().next().map(PathBuf::from);
    let root = paths::executable_dir(invocation.as_deref())?;
    let layout = paths::AppLayout::new(root);
    debug!("Application root: {}", layout.root.display());

    let hostfxr = hostfxr::HostFxr::locate()?;
    {
        let load_assembly = runtime::load_assembly_delegate(hostfxr.fns(), &layout.runtime_config)?;
        let entry_point = bridge::resolve_entry_point(&load_assembly, &layout)?;
        entry_point.invoke(bridge::HostApi::new());
    }

    debug!("Managed entry point returned; releasing {}", hostfxr.path().display());
    drop(hostfxr);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rustfxr=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
