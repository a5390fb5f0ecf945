use crate::game::{print_json, rng, Context};

/// Start over on Easy. Personal bests are kept.
pub fn run(clear_history: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let saved = ctx.load_game()?;
    let mut session = ctx.session(saved, rng(None))?;

    let event = session.reset()?;
    ctx.save_game(&session.save())?;
    if clear_history {
        let removed = ctx.db.clear_rounds()?;
        tracing::info!(removed, "round history cleared");
    }
    print_json(&event)
}
