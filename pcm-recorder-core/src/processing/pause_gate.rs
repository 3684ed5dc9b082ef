use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateFlags {
    paused: bool,
    closed: bool,
}

/// Outcome of [`PauseGate::wait_while_paused`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    /// Not paused (or resumed); the caller may continue.
    Resumed,
    /// The gate was closed while waiting or before the call; the caller must exit.
    Closed,
}

/// Monitor gating the capture thread between running and paused.
///
/// One mutex guards the flags, one condition variable is broadcast on every
/// resume and on close. Waiting re-checks the flags in a loop, so spurious
/// wakeups and rapid pause/resume cycles are harmless.
#[derive(Debug, Default)]
pub struct PauseGate {
    flags: Mutex<GateFlags>,
    resumed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.flags.lock().paused = true;
    }

    pub fn resume(&self) {
        let mut flags = self.flags.lock();
        flags.paused = false;
        self.resumed.notify_all();
    }

    /// Wake every waiter for good. Used on session teardown.
    pub fn close(&self) {
        let mut flags = self.flags.lock();
        flags.closed = true;
        self.resumed.notify_all();
    }

    /// Re-arm a closed gate for a new session.
    pub fn reset(&self) {
        let mut flags = self.flags.lock();
        flags.paused = false;
        flags.closed = false;
    }

    pub fn is_paused(&self) -> bool {
        self.flags.lock().paused
    }

    pub fn is_closed(&self) -> bool {
        self.flags.lock().closed
    }

    /// Block while paused. Returns immediately when not paused.
    pub fn wait_while_paused(&self) -> GateWait {
        let mut flags = self.flags.lock();
        while flags.paused && !flags.closed {
            self.resumed.wait(&mut flags);
        }
        if flags.closed {
            GateWait::Closed
        } else {
            GateWait::Resumed
        }
    }
}
