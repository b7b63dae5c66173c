//! Per-run budget enforced from inside the interpreter
//!
//! A count hook fires every [`HOOK_INTERVAL`] VM instructions and raises an
//! error once the wall clock deadline or the instruction budget is spent.
//! Coroutines are metered too: the resume guard moves the hook onto the
//! thread being resumed. A breach is sticky: every later hook and every
//! guarded `pcall` re-raises it, so snippets cannot swallow it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mlua::{HookTriggers, Lua, Thread};

use crate::types::{FailureKind, ResourceLimits};

/// VM instructions between two budget checks
pub const HOOK_INTERVAL: u32 = 1000;

/// A budget that was exceeded during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Timeout(Duration),
    Instructions(u64),
    OutputLines(usize),
}

impl Breach {
    pub fn kind(&self) -> FailureKind {
        match self {
            Breach::Timeout(_) | Breach::Instructions(_) => FailureKind::Timeout,
            Breach::OutputLines(_) => FailureKind::OutputLimit,
        }
    }
}

impl std::fmt::Display for Breach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breach::Timeout(limit) => {
                write!(f, "time limit of {} ms exceeded", limit.as_millis())
            }
            Breach::Instructions(limit) => write!(f, "instruction limit of {limit} exceeded"),
            Breach::OutputLines(limit) => write!(f, "output limit of {limit} lines exceeded"),
        }
    }
}

/// Shared, single-threaded record of the first breach of a run
pub type BreachCell = Rc<Cell<Option<Breach>>>;

/// Hook triggers used for every thread of a run
fn triggers() -> HookTriggers {
    HookTriggers::new().every_nth_instruction(HOOK_INTERVAL)
}

/// Counters shared by every hook installed during one run. The main thread
/// and each coroutine get a clone, so instructions add up across threads.
#[derive(Debug, Clone)]
pub struct Meter {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    instruction_limit: Option<u64>,
    executed: Rc<Cell<u64>>,
    breach: BreachCell,
}

impl Meter {
    fn is_limited(&self) -> bool {
        self.deadline.is_some() || self.instruction_limit.is_some()
    }

    /// Handle for callbacks that record or check breaches
    pub fn breach(&self) -> BreachCell {
        Rc::clone(&self.breach)
    }

    /// Account for one hook interval; fails once a budget is spent
    fn tick(&self) -> mlua::Result<()> {
        if let Some(tripped) = self.breach.get() {
            return Err(mlua::Error::RuntimeError(tripped.to_string()));
        }

        let count = self.executed.get() + u64::from(HOOK_INTERVAL);
        self.executed.set(count);

        let tripped = match (self.instruction_limit, self.deadline, self.timeout) {
            (Some(limit), _, _) if count > limit => Some(Breach::Instructions(limit)),
            (_, Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                Some(Breach::Timeout(timeout))
            }
            _ => None,
        };

        match tripped {
            Some(tripped) => {
                self.breach.set(Some(tripped));
                Err(mlua::Error::RuntimeError(tripped.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Point the instruction hook at `thread`.
    ///
    /// The interpreter keeps one hook owner at a time, so the resume guard
    /// attaches the coroutine before resuming it and the resuming thread
    /// again afterwards.
    pub fn attach(&self, thread: &Thread) {
        if !self.is_limited() {
            return;
        }
        let meter = self.clone();
        thread.set_hook(triggers(), move |_, _| meter.tick());
    }
}

#[derive(Debug)]
pub struct Budget {
    meter: Meter,
}

impl Budget {
    /// Create the budget for one run. The deadline starts counting now.
    pub fn new(limits: &ResourceLimits) -> Self {
        let timeout = limits.timeout();
        Self {
            meter: Meter {
                timeout,
                deadline: timeout.map(|t| Instant::now() + t),
                instruction_limit: limits.instruction_limit,
                executed: Rc::new(Cell::new(0)),
                breach: Rc::new(Cell::new(None)),
            },
        }
    }

    /// First breach recorded during the run, if any
    pub fn breach(&self) -> Option<Breach> {
        self.meter.breach.get()
    }

    /// Handle for callbacks that record or check breaches
    pub fn handle(&self) -> BreachCell {
        self.meter.breach()
    }

    /// Meter shared with coroutine hooks
    pub fn meter(&self) -> Meter {
        self.meter.clone()
    }

    /// Install the instruction hook on the interpreter's main thread
    pub fn install(&self, lua: &Lua) {
        if !self.meter.is_limited() {
            return;
        }
        let meter = self.meter.clone();
        lua.set_hook(triggers(), move |_, _| meter.tick());
    }
}
