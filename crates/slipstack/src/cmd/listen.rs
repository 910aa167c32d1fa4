use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use slipstack_layer::{LayerStack, StackConfig};
use slipstack_transport::{NamedPipe, UnixDomainSocket};

use crate::cmd::ListenArgs;
use crate::exit::{stack_error, transport_error, CliError, CliResult, INTERRUPTED, SUCCESS};
use crate::output::{print_packet, OutputFormat};

/// Shared between the packet handler and the accept loop.
#[derive(Clone)]
struct Progress {
    running: Arc<AtomicBool>,
    printed: Arc<AtomicU64>,
    limit: Option<u64>,
}

impl Progress {
    fn done(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
            || self
                .limit
                .is_some_and(|limit| self.printed.load(Ordering::SeqCst) >= limit)
    }
}

/// The blocking call a Ctrl-C has to interrupt.
#[derive(Clone, Debug)]
struct Wakeup {
    path: PathBuf,
    unix: bool,
    /// Set once the listener created the path; a forced exit removes it.
    owned: Arc<AtomicBool>,
}

impl Wakeup {
    /// Unblock `open_reader`/`accept` so the loop can observe the stop flag.
    fn nudge(&self) {
        let result = if self.unix {
            UnixDomainSocket::connect(&self.path).map(drop)
        } else {
            NamedPipe::wake_reader(&self.path)
        };
        if let Err(err) = result {
            tracing::debug!(error = %err, "listener wake-up failed");
        }
    }

    fn remove_owned_path(&self) {
        if self.owned.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let progress = Progress {
        running: Arc::new(AtomicBool::new(true)),
        printed: Arc::new(AtomicU64::new(0)),
        limit: args.count,
    };
    let wakeup = Wakeup {
        path: args.path.clone(),
        unix: args.unix,
        owned: Arc::new(AtomicBool::new(false)),
    };
    install_ctrlc_handler(progress.running.clone(), wakeup.clone())?;

    let config = args.decode.stack_config();
    if args.unix {
        listen_unix(&args, config, &progress, &wakeup, format)?;
    } else {
        listen_fifo(&args, config, &progress, &wakeup, format)?;
    }

    if !progress.running.load(Ordering::SeqCst) {
        tracing::info!("interrupted");
        return Ok(INTERRUPTED);
    }
    Ok(SUCCESS)
}

fn listen_unix(
    args: &ListenArgs,
    config: StackConfig,
    progress: &Progress,
    wakeup: &Wakeup,
    format: OutputFormat,
) -> CliResult<()> {
    let socket =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    wakeup.owned.store(true, Ordering::SeqCst);
    tracing::info!(path = %args.path.display(), "listening on unix socket");

    while !progress.done() {
        let stream = socket
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        if progress.done() {
            break;
        }
        let stack = LayerStack::from_stream(stream, config.clone())
            .map_err(|err| stack_error("accept failed", err))?;
        drain(stack, "unix", progress, format)?;
    }
    Ok(())
}

fn listen_fifo(
    args: &ListenArgs,
    config: StackConfig,
    progress: &Progress,
    wakeup: &Wakeup,
    format: OutputFormat,
) -> CliResult<()> {
    let pipe = NamedPipe::create(&args.path).map_err(|err| transport_error("mkfifo failed", err))?;
    wakeup.owned.store(pipe.removes_on_drop(), Ordering::SeqCst);
    tracing::info!(path = %pipe.path().display(), "listening on fifo");

    // Each writer session ends with EOF; reopen for the next one.
    while !progress.done() {
        let reader = pipe
            .open_reader()
            .map_err(|err| transport_error("open fifo failed", err))?;
        let stack = LayerStack::with_config(reader, std::io::sink(), config.clone());
        drain(stack, "fifo", progress, format)?;
    }
    Ok(())
}

/// Publish packets from one channel session until EOF or the count is reached.
fn drain<R: Read, W: Write>(
    mut stack: LayerStack<R, W>,
    source: &'static str,
    progress: &Progress,
    format: OutputFormat,
) -> CliResult<()> {
    let handler_progress = progress.clone();
    stack
        .register_handler(move |packet| {
            if handler_progress.done() {
                return;
            }
            let index = handler_progress.printed.fetch_add(1, Ordering::SeqCst) + 1;
            print_packet(index, &packet, source, format);
        })
        .map_err(|err| stack_error("register handler failed", err))?;

    while !progress.done() {
        match stack.poll() {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => return Err(stack_error("receive failed", err)),
        }
    }

    let stats = stack.stats();
    tracing::debug!(
        bytes = stats.bytes_received,
        packets = stats.decoder.packets,
        unknown_escapes = stats.decoder.unknown_escapes,
        oversized = stats.decoder.oversized,
        "session ended"
    );
    Ok(())
}

/// First Ctrl-C stops the listener after waking its blocking call; a second
/// one exits at once, removing the path the listener created.
fn install_ctrlc_handler(running: Arc<AtomicBool>, wakeup: Wakeup) -> CliResult<()> {
    let presses = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        if presses.fetch_add(1, Ordering::SeqCst) == 0 {
            wakeup.nudge();
            return;
        }
        wakeup.remove_owned_path();
        std::process::exit(INTERRUPTED);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
