use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use clap::Args;

use crate::game::{rng, Context};
use pulsador_core::{AchievementRegistry, Difficulty, Event, Outcome, RoundResult};

#[derive(Args)]
pub struct PlayArgs {
    /// Tier to play (defaults to the saved tier)
    #[arg(long)]
    tier: Option<Difficulty>,
    /// Stop after this many rounds (0 plays until you quit)
    #[arg(long, default_value_t = 0)]
    rounds: u32,
    /// Seed for reproducible targets
    #[arg(long)]
    seed: Option<u64>,
}

enum Input {
    Continue,
    Quit,
}

/// Wait for a line on stdin. EOF and `q` both quit.
fn wait_for_enter(stdin: &mut impl BufRead) -> io::Result<Input> {
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 || line.trim().eq_ignore_ascii_case("q") {
        return Ok(Input::Quit);
    }
    Ok(Input::Continue)
}

fn describe(result: &RoundResult) -> String {
    let seconds = |ms: u64| ms as f64 / 1000.0;
    let verdict = match result.outcome {
        Outcome::Perfect => "PERFECT",
        Outcome::Hit => "hit",
        Outcome::Miss => "miss",
    };
    format!(
        "{verdict}: held {:.3}s for {:.3}s (off by {} ms), +{} points",
        seconds(result.actual_ms),
        seconds(result.target_ms),
        result.difference_ms,
        result.points_awarded,
    )
}

fn announcement(event: &Event, achievements: &AchievementRegistry) -> Option<String> {
    match event {
        Event::LevelUp { level, .. } => Some(format!("level up! now level {level}")),
        Event::TierUnlocked { tier, .. } => Some(format!("tier unlocked: {tier}")),
        Event::AchievementUnlocked { id, title, .. } => {
            let icon = achievements
                .get(id)
                .map(|a| a.icon.as_str())
                .filter(|icon| !icon.is_empty())
                .unwrap_or("*");
            Some(format!("{icon} achievement: {title}"))
        }
        _ => None,
    }
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::open()?;
    let mut saved = ctx.load_game()?;
    if args.tier.is_none() && saved.state.rounds_played == 0 {
        saved.tier = ctx.config.game.default_difficulty;
    }
    let mut session = ctx.session(saved, rng(args.seed))?;
    if let Some(tier) = args.tier {
        session.select_tier(tier)?;
    }

    let delay = Duration::from_millis(ctx.config.game.result_delay_ms);
    let mut stdin = io::stdin().lock();
    let mut played = 0u32;

    loop {
        let state = session.state();
        println!(
            "\n[{}] score {} | streak {} | level {}",
            session.tier(),
            state.score,
            state.streak,
            state.level
        );
        print!(
            "Target: {:.3}s. Press Enter to start holding (q to quit) ",
            session.target_ms() as f64 / 1000.0
        );
        if let Input::Quit = wait_for_enter(&mut stdin)? {
            break;
        }

        session.start();
        let started = Instant::now();
        print!("Holding... press Enter to release ");
        if let Input::Quit = wait_for_enter(&mut stdin)? {
            break;
        }
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let Some((result, events)) = session.release(elapsed_ms)? else {
            continue;
        };
        println!("{}", describe(&result));
        let achievements = session.evaluator().achievements();
        for line in events.iter().filter_map(|e| announcement(e, achievements)) {
            println!("  {line}");
        }

        ctx.archive(&result)?;
        ctx.save_game(&session.save())?;

        played += 1;
        if args.rounds > 0 && played >= args.rounds {
            break;
        }
        std::thread::sleep(delay);
        session.next_round();
    }

    let bests = session.bests();
    println!(
        "\nhigh score {} | best streak {}",
        bests.high_score, bests.best_streak
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn achievement_announcement_shows_icon() {
        let registry = AchievementRegistry::defaults();
        let event = Event::AchievementUnlocked {
            id: "scorer".into(),
            title: registry.get("scorer").unwrap().title.clone(),
            at: Utc::now(),
        };
        let line = announcement(&event, &registry).unwrap();
        assert!(line.starts_with(registry.get("scorer").unwrap().icon.as_str()), "{line}");

        let unknown = Event::AchievementUnlocked {
            id: "gone".into(),
            title: "Gone".into(),
            at: Utc::now(),
        };
        assert_eq!(announcement(&unknown, &registry).unwrap(), "* achievement: Gone");
        assert!(announcement(&Event::GameReset { at: Utc::now() }, &registry).is_none());
    }
}
