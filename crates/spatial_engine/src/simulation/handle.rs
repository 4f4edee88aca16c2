//! Running the simulation loop on its own thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::foundation::time::Timer;
use crate::simulation::{SimulationError, SimulationLoop};

// Poll interval while paused
const PAUSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct LoopControl {
    running: AtomicBool,
    paused: AtomicBool,
}

/// Controls a simulation loop running on its own thread
///
/// Dropping the handle without calling [`SimulationHandle::join`] stops the
/// loop and detaches the thread.
#[derive(Debug)]
pub struct SimulationHandle {
    control: Arc<LoopControl>,
    thread: Option<JoinHandle<SimulationLoop>>,
}

impl SimulationLoop {
    /// Start ticking on a dedicated thread
    ///
    /// Each tick receives the wall time since the previous one, then the
    /// thread sleeps for whatever is left of the tick period. While paused,
    /// no ticks run and the paused time is not handed to the next tick.
    pub fn spawn(self) -> Result<SimulationHandle, SimulationError> {
        let control = Arc::new(LoopControl {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        });
        let thread_control = Arc::clone(&control);
        let thread = thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || self.run(&thread_control))?;
        log::info!("Simulation thread started");
        Ok(SimulationHandle {
            control,
            thread: Some(thread),
        })
    }

    fn run(mut self, control: &LoopControl) -> Self {
        let mut timer = Timer::new();
        while control.running.load(Ordering::Acquire) {
            if control.paused.load(Ordering::Acquire) {
                thread::sleep(PAUSE_POLL);
                timer.resync();
                continue;
            }
            let dt = timer.update();
            self.tick(dt);

            let sleep = self.rate.remaining(timer.since_last_update());
            if !sleep.is_zero() {
                thread::sleep(sleep);
            }
        }
        log::info!("Simulation thread stopped after {} ticks", self.ticks);
        self
    }
}

impl SimulationHandle {
    /// Ask the loop to stop after the current tick
    pub fn stop(&self) {
        self.control.running.store(false, Ordering::Release);
    }

    /// Suspend ticking
    pub fn pause(&self) {
        log::debug!("Simulation paused");
        self.control.paused.store(true, Ordering::Release);
    }

    /// Resume ticking
    pub fn resume(&self) {
        log::debug!("Simulation resumed");
        self.control.paused.store(false, Ordering::Release);
    }

    /// Whether ticking is suspended
    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::Acquire)
    }

    /// Whether the loop has not been asked to stop
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for it, getting the loop back
    pub fn join(mut self) -> Result<SimulationLoop, SimulationError> {
        self.stop();
        let thread = self.thread.take().ok_or(SimulationError::Panicked)?;
        thread.join().map_err(|_| SimulationError::Panicked)
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
