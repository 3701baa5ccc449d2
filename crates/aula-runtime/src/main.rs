//! aula: terminal front end for citation actions and live notifications.

use aula_core::ActionKind;
use clap::Parser;

mod cli;
mod cmd_action;
mod cmd_watch;
mod context;
mod prompt;

use cmd_action::ActionPlan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("AULA_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let global = &args.global;
    let all_ok = match args.command {
        cli::Command::Approve(opts) => {
            cmd_action::cmd_action(global, ActionPlan::builtin(ActionKind::Approve), &opts.ids).await?
        }
        cli::Command::Reject(opts) => {
            cmd_action::cmd_action(global, ActionPlan::builtin(ActionKind::Reject), &opts.ids).await?
        }
        cli::Command::Notify(opts) => {
            cmd_action::cmd_action(global, ActionPlan::builtin(ActionKind::Notify), &opts.ids).await?
        }
        cli::Command::Action(opts) => {
            let plan = ActionPlan {
                kind: opts.name.parse()?,
                endpoint: Some(opts.endpoint),
                params: opts.params,
            };
            cmd_action::cmd_action(global, plan, std::slice::from_ref(&opts.id)).await?
        }
        cli::Command::Watch(opts) => {
            cmd_watch::cmd_watch(global, &opts).await?;
            true
        }
        cli::Command::MarkRead => {
            cmd_watch::cmd_mark_read(global).await?;
            true
        }
    };

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}
