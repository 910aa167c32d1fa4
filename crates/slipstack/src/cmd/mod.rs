use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use slipstack_frame::{EscapePolicy, DEFAULT_MAX_PAYLOAD};
use slipstack_layer::StackConfig;
use slipstack_transport::DEFAULT_FIFO_PATH;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload and write one frame to a FIFO or socket.
    Send(SendArgs),
    /// Receive frames and print each decoded packet.
    Listen(ListenArgs),
    /// Frame stdin (or --data) and write the SLIP bytes to stdout.
    Encode(EncodeArgs),
    /// Decode a SLIP byte stream from stdin and print its packets.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to treat `ESC` followed by an unknown byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EscapeArg {
    #[default]
    Drop,
    PassThrough,
    DiscardFrame,
}

impl From<EscapeArg> for EscapePolicy {
    fn from(arg: EscapeArg) -> Self {
        match arg {
            EscapeArg::Drop => EscapePolicy::Drop,
            EscapeArg::PassThrough => EscapePolicy::PassThrough,
            EscapeArg::DiscardFrame => EscapePolicy::DiscardFrame,
        }
    }
}

/// Receive-side decoder options shared by `listen` and `decode`.
#[derive(Args, Debug, Clone)]
pub struct DecodeOptions {
    /// Unknown escape handling.
    #[arg(long, value_enum, default_value_t = EscapeArg::Drop)]
    pub escape_policy: EscapeArg,
    /// Largest accepted payload in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

impl DecodeOptions {
    pub fn stack_config(&self) -> StackConfig {
        StackConfig::default()
            .with_escape_policy(self.escape_policy.into())
            .with_max_payload_size(self.max_payload)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// FIFO (default) or socket path.
    #[arg(default_value = DEFAULT_FIFO_PATH)]
    pub path: PathBuf,
    /// Connect to a Unix domain socket instead of opening a FIFO.
    #[arg(long)]
    pub unix: bool,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload, e.g. "01 c0 02 db".
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// FIFO (default) or socket path.
    #[arg(default_value = DEFAULT_FIFO_PATH)]
    pub path: PathBuf,
    /// Bind a Unix domain socket instead of creating a FIFO.
    #[arg(long)]
    pub unix: bool,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<u64>,
    #[command(flatten)]
    pub decode: DecodeOptions,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Payload to encode instead of stdin.
    #[arg(long)]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub decode: DecodeOptions,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
