use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use macrolink_session::EngineIdentity;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    schema_id: &'a str,
    handler: &'a str,
    result: &'a str,
    engine_profile: &'a str,
}

fn profile_name(identity: &EngineIdentity) -> &'static str {
    match identity.profile {
        macrolink_session::EngineProfile::Narrow => "narrow",
        macrolink_session::EngineProfile::Wide => "wide",
    }
}

pub fn print_call_result(
    handler: &str,
    result: &str,
    identity: &EngineIdentity,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                schema_id: "https://schemas.macrolink.dev/cli/v1/call-result.schema.json",
                handler,
                result,
                engine_profile: profile_name(identity),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["HANDLER", "PROFILE", "RESULT"])
                .add_row(vec![
                    handler.to_string(),
                    profile_name(identity).to_string(),
                    result.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "handler={handler} profile={} result={result}",
                profile_name(identity)
            );
        }
        OutputFormat::Raw => {
            println!("{result}");
        }
    }
}

#[derive(Serialize)]
struct IdentityOutput<'a> {
    schema_id: &'a str,
    engine_profile: &'a str,
    mark: char,
    attributes: &'a str,
}

pub fn print_identity(identity: &EngineIdentity, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = IdentityOutput {
                schema_id: "https://schemas.macrolink.dev/cli/v1/identity.schema.json",
                engine_profile: profile_name(identity),
                mark: identity.profile.mark(),
                attributes: &identity.attributes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROFILE", "MARK", "ATTRIBUTES"])
                .add_row(vec![
                    profile_name(identity).to_string(),
                    identity.profile.mark().to_string(),
                    identity.attributes.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "profile={} mark={} attributes={}",
                profile_name(identity),
                identity.profile.mark(),
                identity.attributes
            );
        }
    }
}
