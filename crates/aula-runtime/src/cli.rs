//! CLI definition using clap derive.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aula", about = "Citation actions and live notifications from the terminal")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone)]
pub struct GlobalOpts {
    /// Server base URL; the stream URL is derived from it
    #[arg(long, global = true, env = "AULA_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Raw Cookie header (session + csrftoken)
    #[arg(long, global = true, env = "AULA_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Token sent in --token-header
    #[arg(long, global = true, env = "AULA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, global = true, env = "AULA_TOKEN_HEADER", default_value = "Authorization")]
    pub token_header: String,

    /// Bounded wait for each request, in milliseconds
    #[arg(long, global = true, env = "AULA_TIMEOUT_MS", default_value = "8000")]
    pub timeout_ms: u64,

    /// Answer every confirmation with yes
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Approve citations
    Approve(IdsOpts),
    /// Reject citations (asks for confirmation)
    Reject(IdsOpts),
    /// Notify the parent of each citation
    Notify(IdsOpts),
    /// Run a custom action against an explicit endpoint
    Action(CustomOpts),
    /// Subscribe to live notifications until Ctrl-C
    Watch(WatchOpts),
    /// Mark all notifications read
    MarkRead,
}

#[derive(Args)]
pub struct IdsOpts {
    /// Target ids, shown as the row list
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct CustomOpts {
    /// Endpoint path; `{id}` is replaced with the target id
    #[arg(long)]
    pub endpoint: String,

    /// Action name used in logs and control ids
    #[arg(long, default_value = "accion")]
    pub name: String,

    /// Extra form parameter, `key=value` (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    pub id: String,
}

#[derive(Args)]
pub struct WatchOpts {
    /// Subscriber id sent as `?uid=`
    #[arg(long)]
    pub uid: Option<String>,

    /// Reconnect with backoff when the connection drops
    #[arg(long)]
    pub reconnect: bool,

    /// Keep at most this many feed entries
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param_splits_on_first_equals() {
        assert_eq!(
            parse_param("motivo=a=b").unwrap(),
            ("motivo".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_param("vacio=").unwrap().1, "");
        assert!(parse_param("sin-igual").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn cli_parses_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aula",
            "reject",
            "3",
            "4",
            "--yes",
            "--base-url",
            "https://colegio.example",
        ])
        .expect("parse");
        assert!(cli.global.yes);
        assert_eq!(cli.global.base_url, "https://colegio.example");
        match cli.command {
            Command::Reject(opts) => assert_eq!(opts.ids, ["3", "4"]),
            _ => panic!("expected reject"),
        }
    }

    #[test]
    fn custom_action_collects_params() {
        let cli = Cli::try_parse_from([
            "aula",
            "action",
            "--endpoint",
            "/citaciones/{id}/reprogramar/",
            "--param",
            "fecha=2026-03-01",
            "--param",
            "hora=10:00",
            "12",
        ])
        .expect("parse");
        let Command::Action(opts) = cli.command else {
            panic!("expected action");
        };
        assert_eq!(opts.id, "12");
        assert_eq!(opts.name, "accion");
        assert_eq!(opts.params.len(), 2);
        assert_eq!(opts.params[1], ("hora".to_string(), "10:00".to_string()));
    }
}
