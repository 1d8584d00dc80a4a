use serde::Serialize;

use crate::epoch::elapsed_ms;
use crate::message::{Attitude, InsStatus, Position, RawImu, SystemHealth, Velocity};

/// An epoch-tagged value carried into a snapshot.
///
/// `fresh` is true only when the value arrived for the snapshot's own epoch. Stale
/// values are carried forward from the last-known table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stamped<T> {
    pub value: T,
    pub epoch: u32,
    pub fresh: bool,
}

impl<T> Stamped<T> {
    pub fn fresh(value: T, epoch: u32) -> Self {
        Self {
            value,
            epoch,
            fresh: true,
        }
    }

    pub fn stale(value: T, epoch: u32) -> Self {
        Self {
            value,
            epoch,
            fresh: false,
        }
    }

    /// Milliseconds between this value's epoch and `at_epoch`.
    pub fn age_ms(&self, at_epoch: u32) -> u32 {
        elapsed_ms(self.epoch, at_epoch)
    }
}

/// A value without an epoch tag, aged on the host monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observed<T> {
    pub value: T,
    /// Milliseconds between receipt and snapshot finalization.
    pub age_ms: u32,
}

/// One time-aligned navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    pub epoch: u32,
    pub position: Stamped<Position>,
    pub velocity: Stamped<Velocity>,
    pub attitude: Option<Stamped<Attitude>>,
    pub ins: Option<Stamped<InsStatus>>,
    pub imu: Option<Observed<RawImu>>,
    pub health: Option<Observed<SystemHealth>>,
    /// Seconds since the assembler started, at the last message of the epoch.
    pub received_s: f64,
}

impl NavigationSnapshot {
    pub fn velocity_age_ms(&self) -> u32 {
        self.velocity.age_ms(self.epoch)
    }

    pub fn attitude_age_ms(&self) -> Option<u32> {
        self.attitude.map(|a| a.age_ms(self.epoch))
    }

    pub fn ins_age_ms(&self) -> Option<u32> {
        self.ins.map(|i| i.age_ms(self.epoch))
    }

    /// Yaw rate when the receiver marks it valid.
    pub fn yaw_rate(&self) -> Option<f64> {
        self.ins
            .filter(|ins| ins.value.z_ang_rate_valid())
            .map(|ins| ins.value.z_ang_rate())
    }

    /// Vehicle heading, preferring attitude over motion heading.
    pub fn heading(&self) -> f64 {
        self.attitude
            .map(|a| a.value.heading)
            .unwrap_or(self.velocity.value.heading)
    }
}
