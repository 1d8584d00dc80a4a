//! Cross-message snapshot assembly.
//!
//! Position, velocity, attitude and inertial status arrive as separate messages that
//! share an epoch tag. A NAV-PVAT frame carries the first three at once and is fed in
//! as its parts. The assembler keeps one accumulator for the newest epoch and
//! finalizes it when a newer epoch starts, when the receiver signals end of epoch, or
//! when the optional timeout elapses.
//!
//! ```text
//!   msg(epoch e)
//!        │
//!        ├── e == current ──────────► overwrite slot (fresh)
//!        ├── e newer than current ──► finalize current, open e seeded stale, apply
//!        └── e older than current ──► fill a non-fresh slot if newer than carried
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::epoch::is_newer;
use crate::message::{Attitude, DecodedMessage, InsStatus, Position, RawImu, SystemHealth, Velocity};
use crate::snapshot::{NavigationSnapshot, Observed, Stamped};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Also require a fresh attitude before emitting.
    pub require_attitude: bool,
    /// Finalize an epoch that has seen no message for this long.
    pub epoch_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerStats {
    pub emitted: u64,
    /// Epochs finalized without their required fields.
    pub incomplete: u64,
    pub late_merged: u64,
    pub late_discarded: u64,
    pub timed_out: u64,
}

/// An epoch-tagged message that feeds an accumulator slot.
#[derive(Debug, Clone, Copy)]
enum Part {
    Position(Position),
    Velocity(Velocity),
    Attitude(Attitude),
    Ins(InsStatus),
}

impl Part {
    fn from_message(msg: &DecodedMessage) -> Option<Self> {
        match msg {
            DecodedMessage::Position(p) => Some(Part::Position(*p)),
            DecodedMessage::Velocity(v) => Some(Part::Velocity(*v)),
            DecodedMessage::Attitude(a) => Some(Part::Attitude(*a)),
            DecodedMessage::InsStatus(i) => Some(Part::Ins(*i)),
            _ => None,
        }
    }

    fn epoch(&self) -> u32 {
        match self {
            Part::Position(p) => p.epoch,
            Part::Velocity(v) => v.epoch,
            Part::Attitude(a) => a.epoch,
            Part::Ins(i) => i.epoch,
        }
    }
}

/// Most recent value seen per message type, regardless of epoch.
#[derive(Debug, Default)]
struct LastKnown {
    position: Option<Position>,
    velocity: Option<Velocity>,
    attitude: Option<Attitude>,
    ins: Option<InsStatus>,
    imu: Option<(RawImu, Instant)>,
    health: Option<(SystemHealth, Instant)>,
}

impl LastKnown {
    fn remember(&mut self, part: Part) {
        fn keep_newer<T: Copy>(slot: &mut Option<T>, value: T, epoch: u32, old: impl Fn(&T) -> u32) {
            let replace = match slot {
                Some(current) => !is_newer(old(current), epoch),
                None => true,
            };
            if replace {
                *slot = Some(value);
            }
        }
        let epoch = part.epoch();
        match part {
            Part::Position(p) => keep_newer(&mut self.position, p, epoch, |v| v.epoch),
            Part::Velocity(v) => keep_newer(&mut self.velocity, v, epoch, |v| v.epoch),
            Part::Attitude(a) => keep_newer(&mut self.attitude, a, epoch, |v| v.epoch),
            Part::Ins(i) => keep_newer(&mut self.ins, i, epoch, |v| v.epoch),
        }
    }
}

#[derive(Debug)]
struct Accumulator {
    epoch: u32,
    position: Option<Stamped<Position>>,
    velocity: Option<Stamped<Velocity>>,
    attitude: Option<Stamped<Attitude>>,
    ins: Option<Stamped<InsStatus>>,
    last_update: Instant,
}

impl Accumulator {
    fn seeded(epoch: u32, last: &LastKnown, now: Instant) -> Self {
        Self {
            epoch,
            position: last.position.map(|v| Stamped::stale(v, v.epoch)),
            velocity: last.velocity.map(|v| Stamped::stale(v, v.epoch)),
            attitude: last.attitude.map(|v| Stamped::stale(v, v.epoch)),
            ins: last.ins.map(|v| Stamped::stale(v, v.epoch)),
            last_update: now,
        }
    }

    fn apply(&mut self, part: Part, fresh: bool) {
        let epoch = part.epoch();
        match part {
            Part::Position(value) => self.position = Some(Stamped { value, epoch, fresh }),
            Part::Velocity(value) => self.velocity = Some(Stamped { value, epoch, fresh }),
            Part::Attitude(value) => self.attitude = Some(Stamped { value, epoch, fresh }),
            Part::Ins(value) => self.ins = Some(Stamped { value, epoch, fresh }),
        }
    }

    /// Freshness and carried epoch of the slot `part` would write.
    fn slot(&self, part: &Part) -> (bool, Option<u32>) {
        fn view<T>(slot: &Option<Stamped<T>>) -> (bool, Option<u32>) {
            slot.as_ref()
                .map_or((false, None), |s| (s.fresh, Some(s.epoch)))
        }
        match part {
            Part::Position(_) => view(&self.position),
            Part::Velocity(_) => view(&self.velocity),
            Part::Attitude(_) => view(&self.attitude),
            Part::Ins(_) => view(&self.ins),
        }
    }
}

/// Joins decoded messages into per-epoch [`NavigationSnapshot`]s.
#[derive(Debug)]
pub struct SnapshotAssembler {
    config: AssemblerConfig,
    origin: Instant,
    current: Option<Accumulator>,
    last_known: LastKnown,
    last_finalized: Option<u32>,
    stats: AssemblerStats,
}

impl Default for SnapshotAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl SnapshotAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self::with_origin(config, Instant::now())
    }

    /// Use `origin` as time zero for [`NavigationSnapshot::received_s`].
    pub fn with_origin(config: AssemblerConfig, origin: Instant) -> Self {
        Self {
            config,
            origin,
            current: None,
            last_known: LastKnown::default(),
            last_finalized: None,
            stats: AssemblerStats::default(),
        }
    }

    /// Feed one decoded message received at `received`.
    ///
    /// Returns a snapshot when this message closes an epoch that has its required
    /// fields.
    pub fn push(&mut self, msg: &DecodedMessage, received: Instant) -> Option<NavigationSnapshot> {
        match msg {
            DecodedMessage::RawImu(imu) => {
                self.last_known.imu = Some((*imu, received));
                None
            }
            DecodedMessage::SystemHealth(health) => {
                self.last_known.health = Some((*health, received));
                None
            }
            DecodedMessage::EndOfEpoch { epoch } => self.end_of_epoch(*epoch),
            // Parts share one epoch, so only the first can close the previous one.
            DecodedMessage::Pvat(pvat) => [
                Some(Part::Position(pvat.position)),
                Some(Part::Velocity(pvat.velocity)),
                pvat.attitude.map(Part::Attitude),
            ]
            .into_iter()
            .flatten()
            .fold(None, |emitted, part| emitted.or(self.push_part(part, received))),
            _ => Part::from_message(msg).and_then(|part| self.push_part(part, received)),
        }
    }

    /// Finalize the open epoch if it has been idle for the configured timeout.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<NavigationSnapshot> {
        let timeout = self.config.epoch_timeout?;
        let idle = now.saturating_duration_since(self.current.as_ref()?.last_update);
        if idle < timeout {
            return None;
        }
        self.stats.timed_out += 1;
        self.finalize()
    }

    /// Finalize whatever epoch is open, e.g. at end of input.
    pub fn flush(&mut self) -> Option<NavigationSnapshot> {
        self.finalize()
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Epoch of the open accumulator.
    pub fn current_epoch(&self) -> Option<u32> {
        self.current.as_ref().map(|acc| acc.epoch)
    }

    fn push_part(&mut self, part: Part, received: Instant) -> Option<NavigationSnapshot> {
        let epoch = part.epoch();
        let mut emitted = None;

        match (self.current.as_mut(), self.last_finalized) {
            (Some(acc), _) if acc.epoch == epoch => {
                acc.apply(part, true);
                acc.last_update = received;
            }
            (Some(acc), _) if !is_newer(epoch, acc.epoch) => {
                let (fresh, carried) = acc.slot(&part);
                let newer_than_carried = carried.map_or(true, |c| is_newer(epoch, c));
                if !fresh && newer_than_carried {
                    acc.apply(part, false);
                    self.stats.late_merged += 1;
                } else {
                    self.stats.late_discarded += 1;
                    debug!(epoch, current = acc.epoch, "late message discarded");
                }
            }
            (Some(_), _) => {
                emitted = self.finalize();
                self.open(part, received);
            }
            (None, Some(last)) if !is_newer(epoch, last) => {
                self.stats.late_discarded += 1;
                debug!(epoch, last_finalized = last, "message for finalized epoch discarded");
            }
            (None, _) => self.open(part, received),
        }

        self.last_known.remember(part);
        emitted
    }

    fn open(&mut self, part: Part, received: Instant) {
        let mut acc = Accumulator::seeded(part.epoch(), &self.last_known, received);
        acc.apply(part, true);
        self.current = Some(acc);
    }

    fn end_of_epoch(&mut self, epoch: u32) -> Option<NavigationSnapshot> {
        let current = self.current.as_ref()?.epoch;
        if current == epoch || is_newer(epoch, current) {
            self.finalize()
        } else {
            None
        }
    }

    fn finalize(&mut self) -> Option<NavigationSnapshot> {
        let acc = self.current.take()?;
        self.last_finalized = Some(acc.epoch);

        let position = acc.position.filter(|p| p.fresh);
        let velocity = acc.velocity.filter(|v| v.fresh);
        let attitude_ok = !self.config.require_attitude || acc.attitude.is_some_and(|a| a.fresh);

        let (Some(position), Some(velocity), true) = (position, velocity, attitude_ok) else {
            self.stats.incomplete += 1;
            warn!(
                epoch = acc.epoch,
                position = acc.position.is_some_and(|p| p.fresh),
                velocity = acc.velocity.is_some_and(|v| v.fresh),
                "incomplete epoch dropped"
            );
            return None;
        };

        let at = acc.last_update;

        let snapshot = NavigationSnapshot {
            epoch: acc.epoch,
            position,
            velocity,
            attitude: acc.attitude,
            ins: acc.ins,
            imu: self.last_known.imu.map(|(imu, seen)| observed(imu, seen, at)),
            health: self
                .last_known
                .health
                .map(|(health, seen)| observed(health, seen, at)),
            received_s: at.saturating_duration_since(self.origin).as_secs_f64(),
        };

        self.stats.emitted += 1;
        debug!(epoch = snapshot.epoch, "snapshot emitted");
        Some(snapshot)
    }
}

fn observed<T>(value: T, seen: Instant, at: Instant) -> Observed<T> {
    let age = at.saturating_duration_since(seen).as_millis();
    Observed {
        value,
        age_ms: u32::try_from(age).unwrap_or(u32::MAX),
    }
}
