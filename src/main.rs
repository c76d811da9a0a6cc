mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use pneuma::config::{Config, ConfigStore, FileConfigStore};
use pneuma::cues::TerminalCues;
use pneuma::history::HistoryDb;
use pneuma::runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker};
use pneuma::session::{Phase, Session, SessionSummary};
use pneuma::util::format_mmss;
use pneuma::TICK_RATE_MS;

/// guided breathing tui with timed rounds and session history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A guided breathing TUI: timed inhale/exhale rounds, a user-controlled breath hold, a recovery countdown, and a local history of past sessions."
)]
pub struct Cli {
    /// breaths per round
    #[clap(short = 'b', long)]
    breaths: Option<u32>,

    /// duration of one inhale or exhale in milliseconds
    #[clap(long)]
    breath_ms: Option<u64>,

    /// recovery countdown in milliseconds
    #[clap(long)]
    recovery_ms: Option<u64>,

    /// number of rounds in the session
    #[clap(short = 'r', long)]
    rounds: Option<u32>,

    /// disable breath cue sounds
    #[clap(long)]
    mute: bool,

    /// print stored session history and exit
    #[clap(long)]
    history: bool,

    /// clear stored session history and exit
    #[clap(long)]
    clear_history: bool,
}

impl Cli {
    /// Overlay command-line overrides onto the persisted settings.
    fn apply(&self, config: &mut Config) {
        if let Some(breaths) = self.breaths {
            config.breaths_per_round = breaths;
        }
        if let Some(breath_ms) = self.breath_ms {
            config.breath_interval_ms = breath_ms;
        }
        if let Some(recovery_ms) = self.recovery_ms {
            config.recovery_ms = recovery_ms;
        }
        if let Some(rounds) = self.rounds {
            config.rounds_planned = rounds;
        }
        if self.mute {
            config.sfx_volume = 0.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Session,
    History,
}

pub struct App {
    pub session: Session,
    pub screen: Screen,
    pub history_view: Vec<SessionSummary>,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            screen: Screen::Session,
            history_view: Vec::new(),
        }
    }

    fn refresh_history(&mut self) {
        self.history_view = self
            .session
            .history
            .as_ref()
            .and_then(|db| db.recent_sessions().ok())
            .unwrap_or_default();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);

    if cli.clear_history {
        let db = HistoryDb::new()?;
        db.clear()?;
        println!("session history cleared");
        return Ok(());
    }

    if cli.history {
        print_history()?;
        return Ok(());
    }

    let mut session = match Session::new(config.session_config()) {
        Ok(session) => session,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err.to_string()).exit();
        }
    };
    session.cues = Box::new(TerminalCues::new(config.sfx_enabled(), config.bgm_on()));
    // Missing history just means nothing gets persisted this run.
    session.history = HistoryDb::new().ok();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);
    let result = run_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;
    let sessions = db.recent_sessions()?;

    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    for summary in sessions {
        let metrics = summary.metrics();
        let age_secs = (chrono::Local::now() - summary.created_at)
            .num_seconds()
            .max(0) as u64;
        let when = HumanTime::from(Duration::from_secs(age_secs))
            .to_text_en(Accuracy::Rough, Tense::Past);
        println!(
            "{:<20} {} rounds, {} breaths, avg hold {}, total hold {}",
            when,
            metrics.completed_rounds,
            metrics.total_breaths,
            format_mmss(metrics.avg_hold_secs.round() as u64),
            format_mmss(metrics.total_hold_secs),
        );
    }

    Ok(())
}

fn run_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    run_loop(terminal, app, runner)
}

fn run_loop<B, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut runner: Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    E: EventSource,
    T: Ticker,
{
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        // Feed real elapsed time before handling the event so a hold
        // released between ticks is credited its full duration.
        let (event, elapsed) = runner.step();
        let phase_before = app.session.phase;
        app.session.advance(elapsed);
        let phase_changed = app.session.phase != phase_before;

        match event {
            AppEvent::Tick => {
                // Idle screens don't change between keys, but a tick that
                // moves the phase (recovery running out, session finishing)
                // must reach the screen even though the session is no
                // longer active afterwards.
                if app.session.is_active() || phase_changed {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            AppEvent::Key(key) => {
                match key.code {
                    KeyCode::Esc => {
                        app.session.abandon();
                        break;
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.session.abandon();
                        break;
                    }
                    KeyCode::Char(' ') => {
                        if app.screen == Screen::Session {
                            // The one big button: releases the hold when
                            // holding, otherwise asks to start. Both are
                            // no-ops outside their accepting phase.
                            if app.session.phase == Phase::Hold {
                                app.session.end_hold();
                            } else {
                                app.session.start();
                            }
                        }
                    }
                    KeyCode::Char('h') => {
                        let parked = matches!(app.session.phase, Phase::Idle | Phase::Complete);
                        if app.screen == Screen::Session && parked {
                            app.refresh_history();
                            app.screen = Screen::History;
                        }
                    }
                    KeyCode::Char('b') => {
                        if app.screen == Screen::History {
                            app.screen = Screen::Session;
                        }
                    }
                    KeyCode::Char('c') => {
                        if app.screen == Screen::History {
                            if let Some(db) = app.session.history.as_ref() {
                                let _ = db.clear();
                            }
                            app.refresh_history();
                        }
                    }
                    KeyCode::Char('r') => {
                        if app.screen == Screen::Session {
                            app.session.abandon();
                        }
                    }
                    _ => {}
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use pneuma::runtime::TestEventSource;
    use pneuma::session::SessionConfig;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use std::thread;

    fn rendered_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn space() -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE))
    }

    // The recovery countdown ends on a tick, with no key in flight. That tick
    // deactivates the session, but the frame it produced (the completion
    // screen) still has to land on the terminal rather than leaving a stale
    // countdown up until the next keypress.
    #[test]
    fn completion_frame_is_drawn_on_the_finishing_tick() {
        let config = SessionConfig {
            breaths_per_round: 2,
            breath_interval_ms: 20,
            recovery_ms: 30,
            rounds_planned: 1,
        };
        let session = Session::new(config).unwrap();
        let mut app = App::new(session);

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();

        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );

        let driver = thread::spawn(move || {
            tx.send(space()).unwrap();
            // Let both breaths elapse, then release the hold.
            thread::sleep(Duration::from_millis(80));
            tx.send(space()).unwrap();
            // Recovery runs out on ticks alone; no key until after it ends.
            thread::sleep(Duration::from_millis(120));
            tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)))
                .unwrap();
        });

        run_loop(&mut terminal, &mut app, runner).unwrap();
        driver.join().unwrap();

        assert!(app.session.last_summary().is_some());
        let text = rendered_text(&terminal);
        assert!(
            text.contains("SESSION COMPLETE"),
            "expected the completion screen on the final frame, got: {text:?}"
        );
    }
}
