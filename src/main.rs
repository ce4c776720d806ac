use std::process::ExitCode;

use clap::Parser;

use backoffice::cli::{CategoryAction, Cli, Commands, ConfigAction, TicketAction};
use backoffice::commands::{
    TicketListOptions, cmd_categories_ls, cmd_categories_rm, cmd_config_get, cmd_config_set,
    cmd_config_show, cmd_tickets_ls, cmd_tickets_read, cmd_unread,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tickets { action } => match action {
            TicketAction::Ls {
                page,
                limit,
                tid,
                kind,
                begin,
                end,
                order,
                json,
            } => {
                cmd_tickets_ls(TicketListOptions {
                    page,
                    limit,
                    tid,
                    kind,
                    begin,
                    end,
                    order,
                    json,
                })
                .await
            }
            TicketAction::Read { id, json } => cmd_tickets_read(&id, json).await,
        },

        Commands::Categories { action } => match action {
            CategoryAction::Ls {
                query,
                page,
                limit,
                json,
            } => cmd_categories_ls(query.as_deref(), page, limit, json).await,
            CategoryAction::Rm { id, json } => cmd_categories_rm(&id, json).await,
        },

        Commands::Unread {
            watch,
            interval,
            json,
        } => cmd_unread(watch, interval, json).await,

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => cmd_config_show(json),
            ConfigAction::Get { key } => cmd_config_get(&key),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
