use std::io::Read;

use slipstack_frame::FrameWriter;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = match args.data {
        Some(data) => data.into_bytes(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let mut writer = FrameWriter::new(std::io::stdout().lock());
    writer
        .send(&payload)
        .map_err(|err| frame_error("write failed", err))?;
    tracing::debug!(payload = payload.len(), "encoded one frame");
    Ok(SUCCESS)
}
