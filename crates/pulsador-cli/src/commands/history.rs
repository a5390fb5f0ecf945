use clap::Args;

use crate::game::{print_json, Context};
use pulsador_core::{HistorySink, RemoteHistory};

#[derive(Args)]
pub struct HistoryArgs {
    /// Number of rounds to show (defaults to game.history_limit)
    #[arg(long)]
    limit: Option<usize>,
    /// Read from history.remote_url instead of the local database
    #[arg(long)]
    remote: bool,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let limit = args.limit.unwrap_or(ctx.config.game.history_limit);

    if args.remote {
        let url = ctx
            .config
            .history
            .remote_url
            .as_deref()
            .ok_or("history.remote_url is not set")?;
        let mut records = RemoteHistory::new(url)?.list()?;
        records.truncate(limit);
        return print_json(&records);
    }

    let rounds = ctx.db.recent_rounds(limit)?;
    print_json(&rounds)
}
