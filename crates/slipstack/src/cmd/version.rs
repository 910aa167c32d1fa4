use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("slipstack {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: slipstack");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SLIPSTACK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("SLIPSTACK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!(
        "defaults: max_handlers={}, read_chunk={}, max_payload={}",
        slipstack_layer::DEFAULT_MAX_HANDLERS,
        slipstack_frame::DEFAULT_READ_CHUNK,
        slipstack_frame::DEFAULT_MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
