//! splashd - Boot Splashscreen Daemon
//!
//! Paints a logo, a progress bar and a status line on the Linux
//! framebuffer during boot. Init scripts drive it by writing line commands
//! to a named pipe:
//!
//! ```text
//! MSG <text>          replace the status line
//! PROGRESS <n>        fill the bar to n percent (negative fills from the right)
//! QUIT                exit
//! ```

use std::fmt::Debug;
use std::process::ExitCode;

use clap::Parser;
use splash_display::{BufferedSurface, Dispatcher, Scene};
use splash_hal::{Console, NoConsole};
use splash_hal_linux::{fb_path, fifo_path, notify_ready, Fifo, Framebuffer, VtConsole};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod ingest;
mod session;
mod shutdown;

use crate::cli::Cli;
use crate::config::SplashConfig;
use crate::error::SplashError;
use crate::ingest::{ExitReason, IngestLoop};
use crate::session::Session;
use crate::shutdown::Shutdown;

type FbDispatcher = Dispatcher<BufferedSurface<Framebuffer>>;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<(), SplashError> {
    info!("splashd {} starting", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    let scene = config.scene()?;

    let shutdown = shutdown::install()?;

    if config.console_switch {
        run_session(VtConsole::new(), &config, scene, shutdown)
    } else {
        info!("Console switch disabled");
        run_session(NoConsole, &config, scene, shutdown)
    }
}

/// Bring the splash up, run the ingest loop and tear down
fn run_session<C>(
    console: C,
    config: &SplashConfig,
    scene: Scene,
    shutdown: Shutdown,
) -> Result<(), SplashError>
where
    C: Console,
    C::Error: Debug,
{
    let path = fifo_path(config.fifo_dir.as_deref(), &config.fifo_name);
    let mut fifo = Fifo::create(&path)?;
    fifo.wake_on(shutdown.wake_mask());

    let mut session: Session<FbDispatcher, C> = Session::new();
    session.register_fifo(&path);
    session.switch_console(console);

    let fb = fb_path(config.fbdev);
    let panel = Framebuffer::open(&fb, config.rotation())?;
    info!(
        "Framebuffer {} ({}x{}, angle {}, {})",
        fb.display(),
        panel.geometry().logical().width,
        panel.geometry().logical().height,
        config.angle,
        if panel.is_double_buffered() {
            "double buffered"
        } else {
            "single buffered"
        }
    );

    let mut dispatcher = Dispatcher::new(
        BufferedSurface::new(panel),
        scene,
        config.flip_policy.into(),
    );
    if let Err(e) = dispatcher.paint_scene() {
        warn!("Initial flip failed: {}", e);
    }
    let dispatcher = session.attach_display(dispatcher);

    match notify_ready() {
        Ok(true) => debug!("Readiness sent to service manager"),
        Ok(false) => {}
        Err(e) => warn!("Readiness notification failed: {}", e),
    }

    let mut ingest = IngestLoop::new(fifo, dispatcher, config.wait_timeout());
    let reason = ingest.run(shutdown.flag());
    if !ingest.pending().is_empty() {
        debug!("Discarding {} unparsed bytes", ingest.pending().len());
    }
    let (fifo, _) = ingest.into_parts();
    debug!("Closing pipe {}", fifo.path().display());
    drop(fifo);
    session.teardown();

    match reason {
        ExitReason::Quit | ExitReason::TimedOut => Ok(()),
        ExitReason::Cancelled => {
            info!("Terminated by signal");
            Ok(())
        }
        ExitReason::WaitFailed(e) => Err(SplashError::Wait(e)),
        ExitReason::ReopenFailed(e) => Err(SplashError::Reopen(e)),
    }
}
