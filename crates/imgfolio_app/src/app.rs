use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use imgfolio_core::{update, AppState, AppViewModel, Msg};
use imgfolio_logging::{folio_debug, folio_info};

use crate::cli::{Args, BatchSelection, RunMode};
use crate::effects::{EffectRunner, Polled};
use crate::ui::command::{parse_command, Command, HELP};
use crate::ui::render;

const TICK: Duration = Duration::from_millis(75);

enum Input {
    Line(String),
    Eof,
}

pub fn run(args: &Args) -> Result<()> {
    let runner = EffectRunner::new(args.engine_config()).context("starting the engine")?;
    let mut app = App::new(runner);
    if let Some(url) = &args.url {
        app.dispatch(Msg::InputChanged(url.clone()));
        app.dispatch(Msg::FetchSubmitted);
    }

    match args.run_mode() {
        RunMode::Batch(selection) => app.run_batch(&selection),
        RunMode::Interactive => {
            app.run_interactive();
            Ok(())
        }
    }
}

struct App {
    state: AppState,
    view: AppViewModel,
    runner: EffectRunner,
}

impl App {
    fn new(runner: EffectRunner) -> Self {
        let state = AppState::new();
        let view = state.view();
        Self {
            state,
            view,
            runner,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        folio_debug!("dispatch {:?}", msg);
        let (mut state, effects) = update(std::mem::take(&mut self.state), msg);
        if state.consume_dirty() {
            let view = state.view();
            for line in render::render_changes(&self.view, &view) {
                println!("{line}");
            }
            self.view = view;
        }
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn pump_engine(&mut self) {
        for polled in self.runner.poll() {
            match polled {
                Polled::Msg(msg) => self.dispatch(msg),
                Polled::Progress(progress) => {
                    if let Some(line) = render::progress_line(&progress) {
                        println!("{line}");
                    }
                }
            }
        }
    }

    fn busy(&self) -> bool {
        self.state.is_loading() || self.state.is_downloading()
    }

    fn wait_until_idle(&mut self) {
        loop {
            self.pump_engine();
            if !self.busy() {
                return;
            }
            thread::sleep(TICK);
        }
    }

    /// Loads the startup page, applies the selection and saves one PDF.
    fn run_batch(&mut self, selection: &BatchSelection) -> Result<()> {
        self.wait_until_idle();
        if let Some(err) = self.state.error() {
            bail!("{err}");
        }

        let available = self.state.images().len();
        match selection {
            BatchSelection::All => self.dispatch(Msg::SelectAll),
            BatchSelection::Indexes(indexes) => {
                let mut seen = Vec::with_capacity(indexes.len());
                for &index in indexes {
                    if index == 0 || index > available {
                        bail!("no image number {index}, the page has {available} images");
                    }
                    if !seen.contains(&index) {
                        seen.push(index);
                        self.dispatch(Msg::ImageToggledAt(index));
                    }
                }
            }
        }
        if self.state.selection().is_empty() {
            bail!("nothing selected");
        }

        self.dispatch(Msg::DownloadClicked);
        self.wait_until_idle();
        if let Some(err) = self.state.error() {
            bail!("{err}");
        }
        folio_info!("Batch run finished");
        Ok(())
    }

    fn run_interactive(&mut self) {
        let (input_tx, input_rx) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if input_tx.send(Input::Line(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(Input::Eof);
        });

        println!("Type `help` for commands.");
        prompt();
        loop {
            self.pump_engine();
            match input_rx.recv_timeout(TICK) {
                Ok(Input::Line(line)) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                    prompt();
                }
                Ok(Input::Eof) | Err(RecvTimeoutError::Disconnected) => {
                    // Let piped sessions finish their last fetch or download.
                    self.wait_until_idle();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => self.dispatch(Msg::Tick),
            }
        }
    }

    /// Returns false once the user asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let command = parse_command(line);
        match &command {
            Command::Quit => return false,
            Command::Help => println!("{HELP}"),
            Command::List => print_lines(render::gallery_lines(&self.view)),
            Command::Selected => print_lines(render::selected_lines(&self.view)),
            Command::Invalid(message) => println!("{message}"),
            Command::Toggle(indexes) => {
                let available = self.state.images().len();
                for index in indexes.iter().filter(|&&i| i > available) {
                    println!("no image number {index}");
                }
            }
            Command::Fetch(_) if self.state.is_loading() => {
                println!("Still fetching the previous page.");
            }
            Command::Download if self.state.selection().is_empty() => {
                println!("Select at least one image first.");
            }
            _ => {}
        }
        for msg in command.into_msgs() {
            self.dispatch(msg);
        }
        true
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
