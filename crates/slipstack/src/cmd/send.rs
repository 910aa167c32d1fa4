use std::fs;
use std::io::Read;

use slipstack_layer::LayerStack;

use crate::cmd::SendArgs;
use crate::exit::{io_error, stack_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let path = args.path.display().to_string();

    let (transport, wire_size) = if args.unix {
        let mut stack =
            LayerStack::unix(&args.path).map_err(|err| stack_error("connect failed", err))?;
        let written = stack
            .send(&payload)
            .map_err(|err| stack_error("send failed", err))?;
        ("unix", written)
    } else {
        tracing::debug!(path = %path, "opening fifo for writing (waits for a reader)");
        let mut stack = LayerStack::fifo_writer(&args.path)
            .map_err(|err| stack_error("open fifo failed", err))?;
        let written = stack
            .send(&payload)
            .map_err(|err| stack_error("send failed", err))?;
        ("fifo", written)
    };

    print_sent(&path, transport, payload.len(), wire_size, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    let mut stdin = Vec::new();
    std::io::stdin()
        .read_to_end(&mut stdin)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(stdin)
}

/// Parse hex octets, ignoring whitespace, commas and `0x` prefixes.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CliError::new(USAGE, format!("invalid hex digit: {bad:?}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("--hex needs an even number of digits, got {}", digits.len()),
        ));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| {
                CliError::new(USAGE, format!("invalid hex byte: {}", &digits[i..i + 2]))
            })
        })
        .collect()
}
