//! 2048 Stack entry point
//!
//! Native builds run a headless autoplay bot against the real session
//! controller: handy for balancing tuning files and for soak-testing.
//! The browser build starts from `platform::web`.

#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use serde::Serialize;

    use stack2048::SessionEvent;
    use stack2048::ads::SimulatedAds;
    use stack2048::commentary::CannedCommentary;
    use stack2048::consts::SIM_DT;
    use stack2048::persistence::{FileStore, KeyValueStore, MemoryStore};
    use stack2048::session::{SessionController, TileView};
    use stack2048::tiles::radius_for;
    use stack2048::tuning::Tuning;

    #[derive(Parser, Debug)]
    #[command(name = "stack2048")]
    #[command(about = "Headless autoplay for the 2048 physics stacking game")]
    pub struct Cli {
        /// Session seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Games to play before stopping
        #[arg(long, default_value_t = 5)]
        games: u32,
        /// Simulated seconds before a game is abandoned
        #[arg(long, default_value_t = 600.0)]
        max_seconds: f32,
        /// Continues (rewarded ads) to take per game
        #[arg(long, default_value_t = 1)]
        continues: u32,
        /// Tuning JSON file (defaults when omitted)
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Records file for high score / play count (in-memory when omitted)
        #[arg(long)]
        records: Option<PathBuf>,
        /// Print commentary lines
        #[arg(long, default_value_t = false)]
        commentary: bool,
        /// Print one JSON object per game instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    }

    #[derive(Debug, Clone, Serialize)]
    struct GameSummary {
        game_id: u64,
        score: u64,
        high_score: u64,
        highest_tile: u32,
        merges: u32,
        drops: u32,
        continues: u32,
        seconds: f32,
        timed_out: bool,
    }

    /// Aim at the highest tile matching the next value, else anywhere
    fn choose_x(tiles: &[TileView], next_value: u32, width: f32, rng: &mut Pcg32) -> f32 {
        let target = tiles
            .iter()
            .filter(|t| t.value == next_value)
            .min_by(|a, b| a.y.total_cmp(&b.y));
        match target {
            Some(tile) => tile.x,
            None => {
                let r = radius_for(next_value);
                rng.random_range(r..(width - r).max(r + 1.0))
            }
        }
    }

    struct Bot {
        session: SessionController,
        rng: Pcg32,
        max_seconds: f32,
        max_continues: u32,
        print_commentary: bool,
    }

    impl Bot {
        /// Play the current game to its end
        fn play_one(&mut self) -> GameSummary {
            let width = self.session.tuning().world_width;
            let game_id = self.session.stats().game_id;
            let mut drops = 0;
            let mut continues = 0;
            let mut seconds = 0.0;

            loop {
                if seconds >= self.max_seconds {
                    log::warn!("Game {} hit the {}s limit", game_id, self.max_seconds);
                    return self.summary(drops, continues, seconds, true);
                }

                if self.session.game().can_drop() {
                    let game = self.session.game();
                    let x = choose_x(&self.session.tile_views(), game.next_value(), width, &mut self.rng);
                    self.session.aim(x);
                    if self.session.drop_tile() {
                        drops += 1;
                    }
                }

                self.session.advance(SIM_DT);
                seconds += SIM_DT;

                for event in self.session.drain_events() {
                    match event {
                        SessionEvent::GameOver => {
                            if continues < self.max_continues && self.session.request_continue() {
                                continues += 1;
                            } else {
                                return self.summary(drops, continues, seconds, false);
                            }
                        }
                        SessionEvent::AdClosable { .. } => {
                            self.session.dismiss_ad();
                        }
                        SessionEvent::ContinueGranted { removed } => {
                            log::info!("Continue granted, {} tiles cleared", removed);
                        }
                        SessionEvent::Commentary(line) if self.print_commentary => {
                            println!("  \"{}\"", line);
                        }
                        _ => {}
                    }
                }
            }
        }

        fn summary(&self, drops: u32, continues: u32, seconds: f32, timed_out: bool) -> GameSummary {
            let stats = self.session.stats();
            GameSummary {
                game_id: stats.game_id,
                score: stats.score,
                high_score: stats.high_score,
                highest_tile: stats.highest_tile,
                merges: stats.merges,
                drops,
                continues,
                seconds,
                timed_out,
            }
        }

        /// Restart, sitting through the interstitial when one comes up
        fn next_game(&mut self) {
            let before = self.session.stats().game_id;
            self.session.request_reset();
            while self.session.stats().game_id == before {
                self.session.advance(SIM_DT);
                for event in self.session.drain_events() {
                    if let SessionEvent::AdClosable { .. } = event {
                        self.session.dismiss_ad();
                    }
                }
            }
            self.session.drain_events();
        }
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();

        let tuning = match &cli.tuning {
            Some(path) => Tuning::load(path)
                .with_context(|| format!("failed to load tuning from {}", path.display()))?,
            None => Tuning::default(),
        };

        let store: Box<dyn KeyValueStore> = match &cli.records {
            Some(path) => Box::new(
                FileStore::open(path)
                    .with_context(|| format!("failed to open records at {}", path.display()))?,
            ),
            None => Box::new(MemoryStore::new()),
        };

        let session = SessionController::new(tuning, store, Box::new(SimulatedAds::new()), cli.seed)
            .context("invalid tuning")?
            .with_commentary(Box::new(CannedCommentary::new(cli.seed)));

        let mut bot = Bot {
            session,
            rng: Pcg32::seed_from_u64(cli.seed ^ 0x2048),
            max_seconds: cli.max_seconds,
            max_continues: cli.continues,
            print_commentary: cli.commentary,
        };

        log::info!("Autoplay: {} games, seed {}", cli.games, cli.seed);
        if !cli.json {
            println!("{:>5} {:>8} {:>8} {:>6} {:>6} {:>6} {:>4} {:>8}", "game", "score", "best", "tile", "merges", "drops", "cont", "seconds");
        }

        let mut summaries = Vec::new();
        for i in 0..cli.games {
            let summary = bot.play_one();
            if cli.json {
                println!("{}", serde_json::to_string(&summary)?);
            } else {
                println!(
                    "{:>5} {:>8} {:>8} {:>6} {:>6} {:>6} {:>4} {:>8.1}{}",
                    summary.game_id,
                    summary.score,
                    summary.high_score,
                    summary.highest_tile,
                    summary.merges,
                    summary.drops,
                    summary.continues,
                    summary.seconds,
                    if summary.timed_out { " (timeout)" } else { "" }
                );
            }
            summaries.push(summary);
            if i + 1 < cli.games {
                bot.next_game();
            }
        }
        bot.session.teardown();

        if !cli.json && !summaries.is_empty() {
            let total: u64 = summaries.iter().map(|s| s.score).sum();
            let best_tile = summaries.iter().map(|s| s.highest_tile).max().unwrap_or(0);
            println!(
                "\nmean score {:.1}, best tile {}, high score {}",
                total as f64 / summaries.len() as f64,
                best_tile,
                bot.session.stats().high_score
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    autoplay::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}
