//! Simulation: owns every core together with the event queue and id generator.
//!
//! Cores never reach into each other. Each cycle the simulation:
//! 1. **Executes:** Runs every core for one cycle in the current mode, sharing
//!    one `CycleContext`.
//! 2. **Advances:** Increments the clock and drains the events now due, routing
//!    each one to the core that scheduled it.
//! 3. **Retires:** Detaches contexts that have finished.
//! 4. **Switches phase:** Moves from fast-forward to warmup to measurement once
//!    the configured instruction counts have executed.

use std::fmt;

use crate::common::error::{SimError, SimResult};
use crate::common::ids::IdGenerator;
use crate::config::{Config, SimulationConfig};
use crate::core::Core;
use crate::isa::Context;
use crate::sim::event::{CycleContext, EventQueue};
use crate::stats::SimStats;

/// Phase the simulation is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationMode {
    /// Functional execution only.
    FastForward,
    /// Cache and TLB warming without the pipeline.
    Warmup,
    /// Cycle-accurate pipeline execution.
    Measurement,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FastForward => "fast-forward",
            Self::Warmup => "warmup",
            Self::Measurement => "measurement",
        };
        f.write_str(name)
    }
}

/// Top-level simulator: cores, pending events and the clock.
#[derive(Debug)]
pub struct Simulation {
    /// Cores, indexed by core id.
    pub cores: Vec<Core>,
    events: EventQueue,
    ids: IdGenerator,
    cycle: u64,
    mode: SimulationMode,
    mode_instructions: u64,
    measurement_start: u64,
    settings: SimulationConfig,
}

impl Simulation {
    /// Creates a simulation with default cores and binds `contexts` to
    /// hardware threads in global thread order.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidConfig` if the configuration is rejected or
    /// there are more contexts than hardware threads.
    pub fn new(config: &Config, contexts: Vec<Box<dyn Context>>) -> SimResult<Self> {
        config.validate()?;
        let cores = (0..config.processor.num_cores)
            .map(|id| Core::new(id, config))
            .collect::<SimResult<Vec<_>>>()?;
        Self::with_cores(config, cores, contexts)
    }

    /// Creates a simulation around caller-built cores.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulator configuration the cores were built from.
    /// * `cores` - One core per configured core, in core id order.
    /// * `contexts` - Contexts for global threads `0..contexts.len()`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidConfig` if there are more contexts than
    /// hardware threads.
    pub fn with_cores(config: &Config, mut cores: Vec<Core>, contexts: Vec<Box<dyn Context>>) -> SimResult<Self> {
        let threads_per_core = config.processor.threads_per_core;
        let capacity = cores.len() * threads_per_core;
        if contexts.len() > capacity {
            return Err(SimError::InvalidConfig(format!(
                "{} contexts for {capacity} hardware threads",
                contexts.len()
            )));
        }
        for (thread, context) in contexts.into_iter().enumerate() {
            if let Some(core) = cores.get_mut(thread / threads_per_core) {
                core.attach(thread % threads_per_core, context);
            }
        }

        let settings = config.simulation.clone();
        let mode = if settings.fast_forward_instructions > 0 {
            SimulationMode::FastForward
        } else if settings.warmup_instructions > 0 {
            SimulationMode::Warmup
        } else {
            SimulationMode::Measurement
        };
        tracing::debug!(%mode, cores = cores.len(), threads_per_core, "simulation created");
        Ok(Self {
            cores,
            events: EventQueue::new(),
            ids: IdGenerator::new(),
            cycle: 0,
            mode,
            mode_instructions: 0,
            measurement_start: 0,
            settings,
        })
    }

    /// Current cycle.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current phase.
    pub const fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Number of events not yet delivered.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Returns true once every context has been retired.
    pub fn is_done(&self) -> bool {
        !self.cores.iter().any(Core::has_contexts)
    }

    /// Advances the simulation by one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a core; the simulation state is
    /// no longer trustworthy afterwards.
    pub fn step(&mut self) -> SimResult<()> {
        let mut executed = 0;
        let mut cx = CycleContext {
            now: self.cycle,
            events: &mut self.events,
            ids: &mut self.ids,
        };
        for core in &mut self.cores {
            match self.mode {
                SimulationMode::FastForward => executed += core.do_fast_forward_one_cycle(&mut cx),
                SimulationMode::Warmup => executed += core.do_warmup_one_cycle(&mut cx),
                SimulationMode::Measurement => core.do_measurement_one_cycle(&mut cx)?,
            }
        }

        self.cycle += 1;
        while let Some(event) = self.events.pop_due(self.cycle) {
            if let Some(core) = self.cores.get_mut(event.core()) {
                core.handle_event(event)?;
            }
        }

        for core in &mut self.cores {
            let _ = core.retire_finished_contexts();
        }
        self.advance_mode(executed);
        Ok(())
    }

    /// Steps until every context retires or `max_cycles` is reached.
    ///
    /// # Returns
    ///
    /// The statistics at the end of the run.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a core.
    pub fn run(&mut self) -> SimResult<SimStats> {
        while !self.is_done() {
            if self.settings.max_cycles.is_some_and(|max| self.cycle >= max) {
                tracing::debug!(cycle = self.cycle, "cycle limit reached");
                break;
            }
            self.step()?;
        }
        Ok(self.stats())
    }

    /// Snapshot of every counter.
    pub fn stats(&self) -> SimStats {
        let measurement_cycles = if self.mode == SimulationMode::Measurement {
            self.cycle - self.measurement_start
        } else {
            0
        };
        SimStats {
            cycles: self.cycle,
            measurement_cycles,
            threads: self.cores.iter().flat_map(Core::thread_stats).collect(),
            cores: self.cores.iter().map(Core::core_stats).collect(),
        }
    }

    fn advance_mode(&mut self, executed: u64) {
        self.mode_instructions += executed;
        let next = match self.mode {
            SimulationMode::FastForward if self.mode_instructions >= self.settings.fast_forward_instructions => {
                if self.settings.warmup_instructions > 0 {
                    SimulationMode::Warmup
                } else {
                    SimulationMode::Measurement
                }
            }
            SimulationMode::Warmup if self.mode_instructions >= self.settings.warmup_instructions => {
                SimulationMode::Measurement
            }
            _ => return,
        };
        tracing::debug!(from = %self.mode, to = %next, cycle = self.cycle, instructions = self.mode_instructions, "mode change");
        self.mode = next;
        self.mode_instructions = 0;
        if next == SimulationMode::Measurement {
            self.measurement_start = self.cycle;
            for core in &mut self.cores {
                core.resync_fetch(self.cycle);
            }
        }
    }
}
