use slipstack_frame::{FrameConfig, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, OutputFormat};

/// Decode stdin until EOF.
///
/// Exits with `DATA_INVALID` when any protocol error was seen; the packets
/// that did decode are still printed.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = FrameConfig {
        max_payload_size: args.decode.max_payload,
        escape_policy: args.decode.escape_policy.into(),
        ..FrameConfig::default()
    };
    let reader = FrameReader::with_config(std::io::stdin().lock(), config);

    let mut index = 0u64;
    let mut protocol_errors = 0u64;
    for result in reader {
        match result {
            Ok(frame) => {
                index += 1;
                print_packet(index, frame.payload.as_ref(), "stdin", format);
            }
            Err(err) if err.is_recoverable() => {
                tracing::warn!(error = %err, "skipping malformed frame data");
                protocol_errors += 1;
            }
            Err(err) => return Err(frame_error("decode failed", err)),
        }
    }

    tracing::debug!(packets = index, protocol_errors, "decode finished");
    if protocol_errors > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
