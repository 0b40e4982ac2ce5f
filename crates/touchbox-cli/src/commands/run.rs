//! Live bout on the terminal.
//!
//! Each line on stdin is one button press. Touches go straight to the
//! sensor registrar from the input task; every other key is forwarded to the
//! poll loop, which owns the bout.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use touchbox_core::output::clamp_shown;
use touchbox_core::{
    Bout, BoutSettings, DisplaySink, Event, GuardedIndicator, IndicatorDriver, MonotonicClock,
    Side,
};

use super::load_config;

const HELP: &str = "\
keys: r/g/b touch red/green/both   n next point or start/pause
      t start/pause   x full reset   p next phase   m 3/5 minute mode
      +r -r +g -g adjust score   s status   q quit";

#[derive(Args)]
pub struct RunArgs {
    /// Print clock ticks as events too
    #[arg(long)]
    ticks: bool,
}

/// One operator or sensor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Touch(Side),
    NextOrToggle,
    StartPause,
    FullReset,
    NextPhase,
    ToggleDuration,
    Adjust(Side, i32),
    Status,
    Help,
    Quit,
}

/// Map a line of keyboard input to an [`Input`].
pub fn parse_line(line: &str) -> Option<Input> {
    let key = line.trim().to_ascii_lowercase();
    let input = match key.as_str() {
        "r" => Input::Touch(Side::Red),
        "g" => Input::Touch(Side::Green),
        "b" => Input::Touch(Side::Both),
        "n" | "" => Input::NextOrToggle,
        "t" => Input::StartPause,
        "x" => Input::FullReset,
        "p" => Input::NextPhase,
        "m" => Input::ToggleDuration,
        "+r" => Input::Adjust(Side::Red, 1),
        "-r" => Input::Adjust(Side::Red, -1),
        "+g" => Input::Adjust(Side::Green, 1),
        "-g" => Input::Adjust(Side::Green, -1),
        "s" => Input::Status,
        "h" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// Score and clock digits printed as status lines.
struct TerminalDisplay;

/// Two-digit score line, as the physical display would show it.
fn score_line(red: u32, green: u32) -> String {
    let (red, green) = (clamp_shown(red), clamp_shown(green));
    format!("[score] red {red:>2} : {green:<2} green")
}

impl DisplaySink for TerminalDisplay {
    fn show_score(&self, red: u32, green: u32) {
        println!("{}", score_line(red, green));
    }

    fn show_clock(&self, minutes: u32, seconds: u32) {
        println!("[clock] {minutes:02}:{seconds:02}");
    }
}

/// Lamps and buzzer rendered as text.
#[derive(Default)]
struct TerminalLamp {
    lit: Side,
    buzzing: bool,
}

impl TerminalLamp {
    fn render(&self) {
        let red = if self.lit.includes_red() { "RED" } else { "---" };
        let green = if self.lit.includes_green() { "GREEN" } else { "-----" };
        let buzzer = if self.buzzing { " *buzz*" } else { "" };
        println!("[lamps] {red} {green}{buzzer}");
        let _ = std::io::stdout().flush();
    }
}

impl IndicatorDriver for TerminalLamp {
    fn write_indicator(&mut self, side: Side) {
        if self.lit != side {
            self.lit = side;
            self.render();
        }
    }

    fn write_buzzer(&mut self, on: bool) {
        if self.buzzing != on {
            self.buzzing = on;
            self.render();
        }
    }
}

pub fn run(args: RunArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let settings = BoutSettings::from_config(&config)?;
    let poll = Duration::from_millis(config.runtime.poll_interval_ms);
    let lock_wait = Duration::from_millis(config.effects.indicator_lock_wait_ms);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(settings, poll, lock_wait, args.ticks));
    // The stdin reader blocks a runtime thread until the next line; do not
    // wait for it.
    runtime.shutdown_background();
    result
}

async fn session(
    settings: BoutSettings,
    poll: Duration,
    lock_wait: Duration,
    ticks: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bout = Bout::new(
        settings,
        Arc::new(MonotonicClock::new()),
        Arc::new(TerminalDisplay),
        Arc::new(GuardedIndicator::new(TerminalLamp::default(), lock_wait)),
    );
    tracing::info!(session = %bout.session_id(), "bout ready");
    println!("{HELP}");

    let sensors = bout.registrar();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            match parse_line(&line) {
                Some(Input::Touch(side)) => {
                    if !sensors.touch(side) {
                        tracing::debug!(?side, "touch ignored, sensors closed");
                    }
                }
                Some(input) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                }
                None => eprintln!("unknown key {:?} (h for help)", line.trim()),
            }
        }
        let _ = tx.send(Input::Quit);
    });

    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                bout.poll();
            }
            input = rx.recv() => {
                match input {
                    None | Some(Input::Quit) => break,
                    Some(input) => apply(&mut bout, input),
                }
            }
        }
        for event in bout.drain_events() {
            print_event(&event, ticks)?;
        }
    }

    let score = bout.score();
    tracing::info!(red = score.red, green = score.green, "bout closed");
    println!("{}", serde_json::to_string(&bout.snapshot())?);
    Ok(())
}

fn apply(bout: &mut Bout, input: Input) {
    match input {
        Input::NextOrToggle => bout.next_or_toggle(),
        Input::StartPause => bout.toggle_start_pause(),
        Input::FullReset => bout.full_reset(),
        Input::NextPhase => bout.next_phase(),
        Input::ToggleDuration => bout.toggle_duration_mode(),
        Input::Adjust(side, delta) => bout.adjust_score(side, delta),
        Input::Status => {
            let snapshot = bout.snapshot();
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "snapshot not printable"),
            }
        }
        Input::Help => println!("{HELP}"),
        // Handled by the input task and the loop.
        Input::Touch(_) | Input::Quit => {}
    }
}

fn print_event(event: &Event, ticks: bool) -> Result<(), serde_json::Error> {
    if event.is_tick() && !ticks {
        return Ok(());
    }
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_map_to_sides() {
        assert_eq!(parse_line("r"), Some(Input::Touch(Side::Red)));
        assert_eq!(parse_line(" G \n"), Some(Input::Touch(Side::Green)));
        assert_eq!(parse_line("b"), Some(Input::Touch(Side::Both)));
    }

    #[test]
    fn bare_enter_is_the_next_button() {
        assert_eq!(parse_line(""), Some(Input::NextOrToggle));
        assert_eq!(parse_line("n"), Some(Input::NextOrToggle));
    }

    #[test]
    fn adjustments_carry_sign() {
        assert_eq!(parse_line("+r"), Some(Input::Adjust(Side::Red, 1)));
        assert_eq!(parse_line("-g"), Some(Input::Adjust(Side::Green, -1)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert_eq!(parse_line("z"), None);
        assert_eq!(parse_line("+b"), None);
        assert_eq!(parse_line("quit"), Some(Input::Quit));
    }

    #[test]
    fn score_line_clamps_to_two_digits() {
        assert_eq!(score_line(3, 12), "[score] red  3 : 12 green");
        assert_eq!(score_line(150, 99), "[score] red 99 : 99 green");
    }

    #[test]
    fn lamp_only_renders_changes() {
        let mut lamp = TerminalLamp::default();
        lamp.write_indicator(Side::Red);
        lamp.write_buzzer(true);
        assert_eq!(lamp.lit, Side::Red);
        assert!(lamp.buzzing);
        lamp.write_indicator(Side::None);
        assert_eq!(lamp.lit, Side::None);
    }
}
