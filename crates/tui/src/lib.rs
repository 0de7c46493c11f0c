mod app;
mod jobs;
mod render;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use pgai_core::gateway::Gateway;
use pgai_core::workspace::Workspace;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};

pub use app::TuiOptions;

use app::{map_key_event, TuiApp};
use jobs::{Completion, Job, JobRunner};

const TICK_RATE: Duration = Duration::from_millis(120);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Runs the terminal workspace until the user quits. Gateway calls are
/// spawned on `runtime` and their results folded back in between frames.
pub fn run<G: Gateway + 'static>(
    runtime: &Handle,
    gateway: Arc<G>,
    workspace: Workspace,
    options: TuiOptions,
) -> Result<(), TuiError> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let runner = JobRunner::new(runtime.clone(), gateway, sender);
    let app = TuiApp::new(workspace, options);

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, app, &runner, receiver);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<G: Gateway + 'static>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: TuiApp,
    runner: &JobRunner<G>,
    mut completions: UnboundedReceiver<Completion>,
) -> Result<(), TuiError> {
    spawn_all(runner, TuiApp::startup_jobs());

    loop {
        terminal.draw(|frame| render::render(frame, &app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key) {
                        let jobs = app.handle(message);
                        spawn_all(runner, jobs);
                    }
                }
            }
        }

        while let Ok(completion) = completions.try_recv() {
            let jobs = app.complete(completion);
            spawn_all(runner, jobs);
        }

        if app.should_quit {
            info!("leaving workspace");
            break;
        }
    }

    Ok(())
}

fn spawn_all<G: Gateway + 'static>(runner: &JobRunner<G>, jobs: Vec<Job>) {
    if !jobs.is_empty() {
        debug!(count = jobs.len(), "dispatching jobs");
    }
    for job in jobs {
        runner.spawn(job);
    }
}
