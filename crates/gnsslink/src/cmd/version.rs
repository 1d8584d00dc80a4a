use serde_json::json;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    let target = option_env!("GNSSLINK_BUILD_TARGET").unwrap_or("unknown");

    if format == OutputFormat::Json {
        let mut info = json!({ "name": "gnsslink", "version": version });
        if args.extended {
            info["target"] = json!(target);
            info["features"] = json!({ "async": cfg!(feature = "async"), "cli": true });
        }
        println!("{info}");
        return Ok(SUCCESS);
    }

    if !args.extended {
        println!("gnsslink {version}");
        return Ok(SUCCESS);
    }

    println!("name: gnsslink");
    println!("version: {version}");
    println!("target: {target}");
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: async={}, cli=true",
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
