//! Memory variables.
//!
//! Every `M`, `T` and `C` address used by a program is backed by one
//! [`MemoryVariable`]. Cells are created lazily the first time a program
//! stores into them and live until the engine is dropped.
//!
//! Timers tick at a fixed resolution. The engine folds all ticking into the
//! scan step, so a timer only changes while a scan is in progress.

use crate::il::Domain;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// ON-delay or OFF-delay behaviour of a timer cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerMode {
    On,
    Off,
}

/// Counting direction of a counter cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterMode {
    Up,
    Down,
}

/// Observable state of a timer cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Idle,
    Running,
    Done,
}

/// One memory cell: a flag, a timer or a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryVariable {
    pub id: String,
    pub domain: Domain,
    /// Stored boolean. For timers this is the commanded enable condition.
    pub current_value: bool,
    /// Done bit (DN).
    pub end_timer: bool,
    /// Accumulated ticks or counts.
    pub counter: i32,
    /// Preset.
    pub max_timer: i32,
    pub timer_mode: Option<TimerMode>,
    pub counter_mode: Option<CounterMode>,
    ticking: bool,
}

impl MemoryVariable {
    /// Create a zeroed cell.
    pub fn new(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            domain,
            current_value: false,
            end_timer: false,
            counter: 0,
            max_timer: 0,
            timer_mode: None,
            counter_mode: None,
            ticking: false,
        }
    }

    /// Value seen by `LD`/`AND`/`OR`: the done bit for timers and counters,
    /// the stored value otherwise.
    pub fn read(&self) -> bool {
        if self.domain.reads_done_bit() {
            self.end_timer
        } else {
            self.current_value
        }
    }

    /// Store a boolean, applying the counter edge rule when this is a
    /// configured counter.
    ///
    /// `negated` selects the `STN` polarity: the stored value is `!value` and
    /// a count happens when the previously stored value is high and `value`
    /// is low.
    pub fn store(&mut self, value: bool, negated: bool) {
        let stored = if negated { !value } else { value };

        if let Some(mode) = self.counter_mode {
            let edge = if negated {
                self.current_value && !value
            } else {
                !self.current_value && value
            };
            if edge {
                match mode {
                    CounterMode::Up => self.counter += 1,
                    CounterMode::Down => self.counter -= 1,
                }
                self.test_end_counter();
            }
        }

        self.current_value = stored;
    }

    /// Configure as a timer.
    pub fn configure_timer(&mut self, mode: TimerMode, preset: i32) {
        self.timer_mode = Some(mode);
        self.max_timer = preset;
    }

    /// Configure as a counter.
    pub fn configure_counter(&mut self, mode: CounterMode, preset: i32) {
        self.counter_mode = Some(mode);
        self.max_timer = preset;
    }

    fn test_end_counter(&mut self) {
        match self.counter_mode {
            Some(CounterMode::Up) => self.end_timer = self.counter >= self.max_timer,
            Some(CounterMode::Down) => self.end_timer = self.counter <= self.max_timer,
            None => {}
        }
    }

    /// Start or stop the periodic tick according to the commanded condition.
    ///
    /// An ON-delay timer runs while the condition is true and is cleared when
    /// it drops. An OFF-delay timer runs while the condition is false and is
    /// cleared (done bit held high) while it is true.
    pub fn reconcile(&mut self) {
        match self.timer_mode {
            Some(TimerMode::On) => {
                if self.current_value {
                    self.ticking = true;
                } else {
                    self.ticking = false;
                    self.counter = 0;
                    self.end_timer = false;
                }
            }
            Some(TimerMode::Off) => {
                if self.current_value {
                    self.ticking = false;
                    self.counter = 0;
                    self.end_timer = true;
                } else {
                    self.ticking = true;
                }
            }
            None => {}
        }
    }

    /// Advance one timer period. No-op unless the timer is ticking.
    pub fn tick(&mut self) {
        if !self.ticking {
            return;
        }
        if self.counter < self.max_timer {
            self.counter += 1;
        }
        if self.counter >= self.max_timer {
            self.counter = self.max_timer;
            self.end_timer = self.timer_mode == Some(TimerMode::On);
            self.ticking = false;
        }
    }

    /// Stop the periodic tick without touching the accumulated value.
    pub fn halt(&mut self) {
        self.ticking = false;
    }

    /// True while the periodic tick is active.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Timer state, or `None` for cells that are not timers.
    pub fn timer_state(&self) -> Option<TimerState> {
        let mode = self.timer_mode?;
        let done = match mode {
            TimerMode::On => self.end_timer,
            TimerMode::Off => {
                !self.current_value && !self.end_timer && self.counter >= self.max_timer
            }
        };
        let state = if self.ticking {
            TimerState::Running
        } else if done {
            TimerState::Done
        } else {
            TimerState::Idle
        };
        Some(state)
    }

    /// Hard reset: stop ticking and clear value, count and done bit.
    /// Timer and counter configuration survives.
    pub fn hard_reset(&mut self) {
        self.ticking = false;
        self.counter = 0;
        self.current_value = false;
        self.end_timer = false;
    }

    /// One-line description for monitors and logs.
    pub fn describe(&self) -> String {
        match (self.domain, self.timer_mode, self.counter_mode) {
            (Domain::Timer, Some(mode), _) => format!(
                "Timer {} {}: EN={} Accum={} Preset={} DN={}",
                if mode == TimerMode::On { "On" } else { "Off" },
                self.id,
                self.current_value,
                self.counter,
                self.max_timer,
                self.end_timer
            ),
            (Domain::Counter, _, Some(mode)) => format!(
                "Counter {} {}: Accum={} Preset={} DN={}",
                if mode == CounterMode::Up { "Up" } else { "Down" },
                self.id,
                self.counter,
                self.max_timer,
                self.end_timer
            ),
            _ => format!("Memory {}: State={}", self.id, self.current_value),
        }
    }
}

/// All memory cells, in order of first use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTable {
    cells: IndexMap<String, MemoryVariable>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            cells: IndexMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&MemoryVariable> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MemoryVariable> {
        self.cells.get_mut(id)
    }

    /// Fetch a cell, creating it on first use.
    pub fn get_or_create(&mut self, id: &str, domain: Domain) -> &mut MemoryVariable {
        self.cells
            .entry(id.to_string())
            .or_insert_with(|| MemoryVariable::new(id, domain))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryVariable> {
        self.cells.values()
    }

    /// Timer cells only.
    pub fn timers_mut(&mut self) -> impl Iterator<Item = &mut MemoryVariable> {
        self.cells
            .values_mut()
            .filter(|v| v.domain == Domain::Timer)
    }

    /// Reconcile every timer's running state with its commanded condition.
    pub fn reconcile_timers(&mut self) {
        for timer in self.timers_mut() {
            timer.reconcile();
        }
    }

    /// Advance every ticking timer by up to `ticks` periods. A timer stops
    /// consuming ticks as soon as it halts.
    pub fn tick_timers(&mut self, ticks: u64) {
        for timer in self.timers_mut() {
            for _ in 0..ticks {
                if !timer.is_ticking() {
                    break;
                }
                timer.tick();
            }
        }
    }

    /// Stop every timer without clearing counts.
    pub fn halt_timers(&mut self) {
        for timer in self.timers_mut() {
            timer.halt();
        }
    }

    /// Hard reset every cell.
    pub fn hard_reset(&mut self) {
        for cell in self.cells.values_mut() {
            cell.hard_reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_timer(preset: i32) -> MemoryVariable {
        let mut t = MemoryVariable::new("T1", Domain::Timer);
        t.configure_timer(TimerMode::On, preset);
        t
    }

    #[test]
    fn test_on_delay_reaches_preset() {
        let mut t = on_timer(3);
        t.current_value = true;

        for expected in 1..=3 {
            t.reconcile();
            t.tick();
            assert_eq!(t.counter, expected);
            assert_eq!(t.end_timer, expected == 3);
        }
        assert!(!t.is_ticking());
        assert_eq!(t.timer_state(), Some(TimerState::Done));

        // Stays capped while the condition holds
        t.reconcile();
        t.tick();
        assert_eq!(t.counter, 3);
        assert!(t.end_timer);
    }

    #[test]
    fn test_on_delay_resets_when_condition_drops() {
        let mut t = on_timer(5);
        t.current_value = true;
        t.reconcile();
        t.tick();
        t.tick();
        assert_eq!(t.timer_state(), Some(TimerState::Running));

        t.current_value = false;
        t.reconcile();
        assert_eq!(t.counter, 0);
        assert!(!t.end_timer);
        assert_eq!(t.timer_state(), Some(TimerState::Idle));
    }

    #[test]
    fn test_off_delay() {
        let mut t = MemoryVariable::new("T2", Domain::Timer);
        t.configure_timer(TimerMode::Off, 2);

        t.current_value = true;
        t.reconcile();
        assert!(t.end_timer);
        assert!(!t.is_ticking());

        t.current_value = false;
        t.reconcile();
        t.tick();
        assert!(t.end_timer);
        assert_eq!(t.counter, 1);
        t.tick();
        assert!(!t.end_timer);
        assert_eq!(t.counter, 2);
        assert!(!t.is_ticking());
    }

    #[test]
    fn test_halt_keeps_count() {
        let mut t = on_timer(10);
        t.current_value = true;
        t.reconcile();
        t.tick();
        t.tick();
        t.halt();
        t.tick();
        assert_eq!(t.counter, 2);
    }

    #[test]
    fn test_counter_up_edges() {
        let mut c = MemoryVariable::new("C1", Domain::Counter);
        c.configure_counter(CounterMode::Up, 2);

        c.store(true, false);
        assert_eq!(c.counter, 1);
        c.store(true, false); // held high: no edge
        assert_eq!(c.counter, 1);
        assert!(!c.end_timer);
        c.store(false, false);
        c.store(true, false);
        assert_eq!(c.counter, 2);
        assert!(c.end_timer);
        assert!(c.read());
    }

    #[test]
    fn test_counter_down_edges() {
        let mut c = MemoryVariable::new("C2", Domain::Counter);
        c.configure_counter(CounterMode::Down, -2);

        c.store(true, false);
        c.store(false, false);
        assert_eq!(c.counter, -1);
        assert!(!c.end_timer);
        c.store(true, false);
        assert_eq!(c.counter, -2);
        assert!(c.end_timer);
    }

    #[test]
    fn test_counter_stn_reverses_edge() {
        let mut c = MemoryVariable::new("C3", Domain::Counter);
        c.configure_counter(CounterMode::Up, 5);

        // STN stores the negated accumulator and counts whenever the stored
        // value is high and the accumulator is low.
        c.store(false, true);
        assert!(c.current_value);
        assert_eq!(c.counter, 0);

        c.store(false, true);
        assert_eq!(c.counter, 1);

        c.store(true, true);
        assert!(!c.current_value);
        assert_eq!(c.counter, 1);
    }

    #[test]
    fn test_down_counter_stn_edge() {
        let mut c = MemoryVariable::new("C1", Domain::Counter);
        c.configure_counter(CounterMode::Down, -1);

        // Previous value false: no count whatever the accumulator
        c.store(false, true);
        assert_eq!(c.counter, 0);
        assert!(c.current_value);

        // Previous value true but accumulator true: no count
        c.store(true, true);
        assert_eq!(c.counter, 0);
        assert!(!c.end_timer);
        assert!(!c.current_value);

        c.store(false, true);
        assert_eq!(c.counter, 0);

        // Previous value true and accumulator false: count down
        c.store(false, true);
        assert_eq!(c.counter, -1);
        assert!(c.end_timer);
        assert!(c.read());

        c.store(false, true);
        assert_eq!(c.counter, -2);
        assert!(c.end_timer);
    }

    #[test]
    fn test_hard_reset_keeps_configuration() {
        let mut c = MemoryVariable::new("C1", Domain::Counter);
        c.configure_counter(CounterMode::Up, 1);
        c.store(true, false);
        assert!(c.end_timer);

        c.hard_reset();
        assert_eq!(c.counter, 0);
        assert!(!c.current_value);
        assert!(!c.end_timer);
        assert_eq!(c.counter_mode, Some(CounterMode::Up));
        assert_eq!(c.max_timer, 1);
    }

    #[test]
    fn test_table_creates_lazily() {
        let mut table = MemoryTable::new();
        assert!(!table.contains("M1"));
        table.get_or_create("M1", Domain::Memory).current_value = true;
        assert!(table.get("M1").unwrap().read());
        assert_eq!(table.len(), 1);
    }
}
