use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct Envinfo {
    schema_id: &'static str,
    version: &'static str,
    target_os: &'static str,
    target_arch: &'static str,
    build_target: &'static str,
    unix: bool,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let info = Envinfo {
        schema_id: "https://schemas.macrolink.dev/cli/v1/envinfo.schema.json",
        version: env!("CARGO_PKG_VERSION"),
        target_os: std::env::consts::OS,
        target_arch: std::env::consts::ARCH,
        build_target: option_env!("MACROLINK_BUILD_TARGET").unwrap_or("unknown"),
        unix: cfg!(unix),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"])
                .add_row(vec!["version", info.version])
                .add_row(vec!["target_os", info.target_os])
                .add_row(vec!["target_arch", info.target_arch])
                .add_row(vec!["build_target", info.build_target])
                .add_row(vec!["unix", if info.unix { "true" } else { "false" }]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "version={} target_os={} target_arch={} build_target={} unix={}",
                info.version, info.target_os, info.target_arch, info.build_target, info.unix
            );
        }
    }

    Ok(SUCCESS)
}
