//! Monitor application state and logic.

use crate::config::PlcConfig;
use crate::il::Program;
use crate::plc::{InputPanel, InputType, Observer, Plc, RunMode, ScanError};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Collects the errors of a single scan.
#[derive(Default)]
struct ErrorLog(Vec<ScanError>);

impl Observer for ErrorLog {
    fn on_error(&mut self, error: &ScanError) {
        self.0.push(error.clone());
    }
}

/// Monitor application state.
pub struct MonitorApp {
    /// The controller being monitored.
    pub plc: Plc,
    /// Program executed on every scan.
    pub program: Program,
    /// Operator input panel.
    pub panel: InputPanel,
    /// Index of the selected input.
    pub selected: usize,
    /// NO/NC buttons currently held down.
    pub held: HashSet<String>,
    /// Errors from the last failing scan.
    pub errors: Vec<ScanError>,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    scan_period: Duration,
    last_scan: Instant,
}

impl MonitorApp {
    pub fn new(program: Program, config: &PlcConfig) -> Self {
        Self {
            plc: Plc::new(config),
            program,
            panel: InputPanel::new(config.inputs.iter().cloned(), config.default_input_type),
            selected: 0,
            held: HashSet::new(),
            errors: Vec::new(),
            should_quit: false,
            status: "Ready. Press 'r' to run, 'q' to quit.".into(),
            scan_period: Duration::from_millis(config.scan_period_ms),
            last_scan: Instant::now(),
        }
    }

    /// Address of the selected input.
    pub fn selected_input(&self) -> Option<&str> {
        self.plc.inputs().addresses().nth(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.plc.inputs().len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Operate the selected button. A switch toggles; a NO/NC button is
    /// latched down on the first press and let go on the second.
    pub fn press_selected(&mut self) {
        let Some(address) = self.selected_input().map(str::to_string) else {
            return;
        };
        let result = match self.panel.input_type(&address) {
            Ok(InputType::Switch) => self
                .panel
                .press(&address)
                .and_then(|_| self.panel.release(&address)),
            Ok(_) => {
                if self.held.remove(&address) {
                    self.panel.release(&address)
                } else {
                    self.held.insert(address.clone());
                    self.panel.press(&address)
                }
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.status = e.to_string();
        }
    }

    /// Rotate the selected input's type.
    pub fn cycle_selected_type(&mut self) {
        let Some(address) = self.selected_input().map(str::to_string) else {
            return;
        };
        self.held.remove(&address);
        match self.panel.cycle_type(&address) {
            Ok(t) => self.status = format!("{} is now {}", address, t),
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Run if stopped, stop if running.
    pub fn toggle_run(&mut self) {
        if self.plc.mode() == RunMode::Running {
            self.plc.stop();
            self.status = "Stopped.".into();
        } else {
            self.errors.clear();
            self.plc.run();
            self.last_scan = Instant::now();
            self.status = "Running...".into();
        }
    }

    pub fn pause(&mut self) {
        self.plc.pause();
        self.status = "Paused.".into();
    }

    /// Hard reset; refused while running.
    pub fn refresh(&mut self) {
        if self.plc.refresh() {
            self.errors.clear();
            self.status = "Reset. Ready.".into();
        } else {
            self.status = "Stop the controller before resetting.".into();
        }
    }

    /// Time left until the next scan is due.
    pub fn until_next_scan(&self) -> Duration {
        self.scan_period.saturating_sub(self.last_scan.elapsed())
    }

    /// Scan once if the scan period has elapsed.
    pub fn tick(&mut self) {
        if self.plc.mode() != RunMode::Running || self.last_scan.elapsed() < self.scan_period {
            return;
        }
        self.last_scan = Instant::now();

        let mut log = ErrorLog::default();
        if let Some(report) = self.plc.scan(&self.program, &mut self.panel, &mut log) {
            if report.is_clean() {
                self.status = format!("Running... cycle {}", report.cycle);
            } else {
                self.status = format!("Halted on {} error(s) in cycle {}", log.0.len(), report.cycle);
                self.errors = log.0;
            }
        }
    }

    /// Source lines that produced an error in the last failing scan.
    pub fn error_lines(&self) -> HashSet<usize> {
        self.errors.iter().filter_map(ScanError::line).collect()
    }
}

/// Run the monitor on a program.
pub fn run_monitor(program: Program, config: PlcConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = MonitorApp::new(program, &config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        let timeout = app.until_next_scan().min(Duration::from_millis(50));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('r') => app.toggle_run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('x') => app.refresh(),
                        KeyCode::Char('t') => app.cycle_selected_type(),
                        KeyCode::Char(' ') | KeyCode::Enter => app.press_selected(),
                        KeyCode::Up => app.select_prev(),
                        KeyCode::Down => app.select_next(),
                        _ => {}
                    }
                }
            }
        }

        app.tick();

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
