//! Per-robot movement worker.
//!
//! # Loop
//!
//! ```text
//! loop:
//!   ⓪ cancelled?            → release all, exit
//!   ① at destination?       → Idle, release all; next task or exit
//!   ② plan (live congestion) → empty: Blocked, backoff, ①
//!   ③ reserve_path          → fail: queue on blockers, Waiting, backoff;
//!                              waited ≥ replan_after: release all, ②
//!                              else ③ (via ⓪/①)
//!   ④ move point by point   → cancelled mid-path: release, exit
//!   ⑤ release path          → ①
//! ```
//!
//! The only suspension points are the backoff and per-step sleeps; no lock
//! is held across either.  Everything inside [`Worker::drive`] runs under
//! `catch_unwind`, so a failing step or a panicking observer turns into a
//! `Fault` for this robot alone.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use fl_core::{FleetConfig, RobotStatus, VertexId};
use fl_graph::{NavGraph, PathFinder};
use fl_traffic::TrafficManager;

use crate::interpolate::interpolate;
use crate::observer::{EventAction, FleetEvent, FleetObserver};
use crate::robot::RobotCell;
use crate::{FleetError, FleetResult};

enum Traverse {
    /// Walked the whole path.
    Completed,
    /// The active flag dropped mid-path.
    Cancelled,
}

pub(crate) struct Worker {
    pub(crate) cell:     Arc<RobotCell>,
    pub(crate) graph:    Arc<NavGraph>,
    pub(crate) traffic:  Arc<TrafficManager>,
    pub(crate) finder:   Arc<dyn PathFinder>,
    pub(crate) config:   FleetConfig,
    pub(crate) observer: Arc<dyn FleetObserver>,
}

impl Worker {
    /// Thread entry point.  Always releases every lane and clears the
    /// `running` flag before returning.
    pub(crate) fn run(self) {
        let id = self.cell.id().clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drive()));

        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        self.traffic.release_all(&id);

        if let Some(reason) = fault {
            let err = FleetError::MovementFault { robot: id.clone(), reason };
            warn!("{err}");
            let (position, vertex) = {
                let mut r = self.cell.lock();
                r.status = RobotStatus::Error;
                (r.position, r.last_vertex)
            };
            // The observer may be what panicked; never let it take the
            // thread down a second time.
            let report = panic::catch_unwind(AssertUnwindSafe(|| {
                self.observer.on_status(&id, position, RobotStatus::Error);
                self.emit(EventAction::Fault, RobotStatus::Error, Some(vertex), err.to_string());
            }));
            if report.is_err() {
                warn!("{id}: observer panicked while reporting a fault");
            }
        }

        self.cell.finish();
    }

    fn drive(&self) -> FleetResult<()> {
        let id = self.cell.id();
        let tolerance = self.config.arrival_tolerance;
        let mut waited = Duration::ZERO;
        let mut plan: Option<Vec<VertexId>> = None;

        loop {
            // ⓪
            if !self.cell.is_active() {
                return self.cancel();
            }

            // ①
            let (position, last_vertex, destination) = {
                let r = self.cell.lock();
                (r.position, r.last_vertex, r.destination)
            };
            let Some(dest) = destination else {
                self.traffic.release_all(id);
                return Ok(());
            };
            if position.distance(self.graph.position(dest)?) <= tolerance {
                match self.arrive(dest) {
                    Some(next) => {
                        debug!("{id}: continuing with queued task {next}");
                        plan = None;
                        waited = Duration::ZERO;
                        continue;
                    }
                    None => return Ok(()),
                }
            }

            // ②
            let path = match plan.take().filter(|p| p.last() == Some(&dest)) {
                Some(p) => p,
                None => {
                    self.cell.set_status(RobotStatus::Planning);
                    let snapshot = self.traffic.congestion_snapshot();
                    let path = self.finder.find_path(&self.graph, last_vertex, dest, &snapshot);
                    if path.is_empty() {
                        let err = FleetError::NoPathFound { from: last_vertex, to: dest };
                        debug!("{id}: {err}");
                        self.report(RobotStatus::Blocked);
                        self.emit(EventAction::Blocked, RobotStatus::Blocked, Some(last_vertex), err.to_string());
                        thread::sleep(self.config.backoff());
                        continue;
                    }
                    self.emit(
                        EventAction::Planned,
                        RobotStatus::Planning,
                        Some(last_vertex),
                        format!("{} vertices to {}", path.len(), self.graph.name(dest)?),
                    );
                    path
                }
            };

            // ③
            self.cell.set_status(RobotStatus::Reserving);
            if !self.traffic.reserve_path(id, &path) {
                let blockers = self.traffic.blocking_lanes(id, &path);
                for &lane in &blockers {
                    self.traffic.try_reserve_lane(id, lane, self.config.reservation_timeout());
                }
                if waited.is_zero() {
                    debug!("{id}: waiting on {} lane(s)", blockers.len());
                    self.emit(
                        EventAction::Waiting,
                        RobotStatus::Waiting,
                        Some(last_vertex),
                        format!("{} lane(s) held by others", blockers.len()),
                    );
                }
                self.report(RobotStatus::Waiting);

                let backoff = self.config.backoff();
                thread::sleep(backoff);
                waited += backoff;

                if waited >= self.config.replan_after() {
                    let err = FleetError::ReservationTimeout {
                        robot:     id.clone(),
                        waited_ms: waited.as_millis() as u64,
                    };
                    info!("{err}; re-planning");
                    self.traffic.release_all(id);
                    self.emit(EventAction::Replanned, RobotStatus::Planning, Some(last_vertex), err.to_string());
                    waited = Duration::ZERO;
                } else {
                    plan = Some(path);
                }
                continue;
            }
            waited = Duration::ZERO;
            self.emit(
                EventAction::Reserved,
                RobotStatus::Reserving,
                Some(last_vertex),
                format!("{} lane(s)", path.len().saturating_sub(1)),
            );

            if !self.cell.is_active() {
                return self.cancel();
            }

            // ④
            let walked = self.traverse(&path, dest)?;

            // ⑤
            self.traffic.release_path(id, &path);
            if let Traverse::Cancelled = walked {
                return self.cancel();
            }
        }
    }

    fn traverse(&self, path: &[VertexId], dest: VertexId) -> FleetResult<Traverse> {
        let id = self.cell.id();
        let waypoints = interpolate(&self.graph, path, self.config.interpolation_spacing)?;
        let step = self.config.step_delay();

        for wp in waypoints {
            if !self.cell.is_active() {
                return Ok(Traverse::Cancelled);
            }
            {
                let mut r = self.cell.lock();
                r.position = wp.pos;
                r.status = RobotStatus::Moving;
                if let Some(v) = wp.reached {
                    r.last_vertex = v;
                    r.path_history.push(v);
                }
            }
            self.observer.on_status(id, wp.pos, RobotStatus::Moving);
            thread::sleep(step);

            if wp.reached == Some(dest) {
                break;
            }
        }
        Ok(Traverse::Completed)
    }

    /// Mark arrival at `dest` and pop the next queued task, if any.
    fn arrive(&self, dest: VertexId) -> Option<VertexId> {
        let id = self.cell.id();
        self.traffic.release_all(id);

        let (position, next) = {
            let mut r = self.cell.lock();
            r.status = RobotStatus::Idle;
            r.destination = r.tasks.pop_front();
            (r.position, r.destination)
        };
        let name = self.graph.name(dest).unwrap_or("?");
        info!("{id} reached {name}");
        self.observer.on_status(id, position, RobotStatus::Idle);
        self.emit(EventAction::Arrived, RobotStatus::Idle, Some(dest), format!("reached {name}"));
        if let Some(next) = next {
            let next_name = self.graph.name(next).unwrap_or("?");
            self.emit(
                EventAction::DestinationSet,
                RobotStatus::Idle,
                Some(next),
                format!("Destination set to {next_name}"),
            );
        }
        next
    }

    fn cancel(&self) -> FleetResult<()> {
        let id = self.cell.id();
        let released = self.traffic.release_all(id);
        let (status, vertex) = {
            let r = self.cell.lock();
            (r.status, r.last_vertex)
        };
        debug!("{id}: cancelled, released {} lane(s)", released.len());
        self.emit(EventAction::Cancelled, status, Some(vertex), "movement cancelled");
        Ok(())
    }

    fn report(&self, status: RobotStatus) {
        let position = {
            let mut r = self.cell.lock();
            r.status = status;
            r.position
        };
        self.observer.on_status(self.cell.id(), position, status);
    }

    fn emit(&self, action: EventAction, status: RobotStatus, vertex: Option<VertexId>, detail: impl Into<String>) {
        let event = FleetEvent::now(self.cell.id().clone(), action, status, vertex, detail);
        self.observer.on_event(&event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}
