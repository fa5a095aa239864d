//! chatbot-compare - ask three AI models the same question
//!
//! Shows each model's answer, a merged "best answer" written by one of
//! them, and how much the answers agree.

mod answer;
mod app;
mod config;
mod error;
mod llm;
mod report;
mod scoring;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Read};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use answer::Question;
use app::App;
use config::Config;
use llm::Panel;
use report::render_plain;
use scoring::ScoringStrategy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question to ask; prints the comparison and exits
    #[arg(short, long)]
    question: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Agreement scoring strategy (overrides the config file)
    #[arg(long, value_enum)]
    strategy: Option<ScoringStrategy>,

    /// Print the comparison as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print plain output instead of opening the terminal UI
    #[arg(long, default_value_t = false)]
    plain: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn interactive(&self) -> bool {
        self.question.is_none() && !self.plain && !self.json && atty::is(atty::Stream::Stdout)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let interactive = args.interactive();

    // Initialize logging; the terminal UI owns the screen unless debugging
    let filter = match (args.debug, interactive) {
        (true, _) => "debug",
        (false, true) => "off",
        (false, false) => "info",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    if interactive {
        run_interactive(&args).await
    } else {
        run_once(&args).await
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;
    if let Some(strategy) = args.strategy {
        config.panel.strategy = strategy;
    }
    Ok(config)
}

/// Answer a single question from `--question` or stdin and print the result.
async fn run_once(args: &Args) -> Result<()> {
    let text = match &args.question {
        Some(q) => q.clone(),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    // Reject before touching config or any provider
    let question = Question::new(&text)?;

    let config = load_config(args)?;
    let panel = Panel::new(&config);
    let report = panel.run(&question).await;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        let color = atty::is(atty::Stream::Stdout);
        print!("{}", render_plain(&report, color, config.ui.show_bar));
    }

    Ok(())
}

async fn run_interactive(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let mut app = App::new(config, None);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
        return Err(err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Enter => {
                    if let Some(question) = app.begin_submit() {
                        // Show the busy status while the panel runs
                        terminal.draw(|frame| ui::draw(frame, app))?;
                        app.finish_submit(question).await;
                    }
                }
                KeyCode::Tab => app.next_focus(),
                KeyCode::BackTab => app.prev_focus(),
                KeyCode::Char(c) => app.input_char(c),
                KeyCode::Backspace => app.delete_char(),
                KeyCode::Left => app.move_cursor_left(),
                KeyCode::Right => app.move_cursor_right(),
                KeyCode::Up => app.scroll_up(),
                KeyCode::Down => app.scroll_down(),
                _ => {}
            }
        }
    }
}
