//! `FleetController`: owns the robot set and launches movement workers.
//!
//! All fleet state lives here: the graph, the robot table, the spawn
//! counter, and the worker handles.  Workers receive `Arc` handles to the
//! pieces they need and talk to each other only through the shared
//! [`TrafficManager`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use fl_core::{FleetConfig, Lane, Point, RobotId, RobotStatus, VertexId};
use fl_graph::{CongestionSnapshot, NavGraph, PathFinder};
use fl_traffic::{CollisionPair, LaneStatus, TrafficManager};

use crate::observer::{EventAction, Fanout, FleetEvent, FleetObserver};
use crate::robot::{Robot, RobotCell, RobotSnapshot};
use crate::worker::Worker;
use crate::{FleetBuilder, FleetError, FleetResult};

/// How often [`FleetController::wait_idle`] re-checks its workers.
const IDLE_POLL: Duration = Duration::from_millis(2);

struct WorkerHandle {
    robot:  RobotId,
    handle: JoinHandle<()>,
}

/// The fleet: robots, their destinations, and their movement workers.
///
/// Every method takes `&self`; share the controller behind an `Arc` to call
/// it from several threads (including from observer callbacks).
pub struct FleetController {
    graph:     RwLock<Arc<NavGraph>>,
    traffic:   Arc<TrafficManager>,
    finder:    Arc<dyn PathFinder>,
    config:    FleetConfig,
    event_log: Arc<dyn FleetObserver>,
    robots:    RwLock<BTreeMap<RobotId, Arc<RobotCell>>>,
    counter:   Mutex<u64>,
    workers:   Mutex<Vec<WorkerHandle>>,
}

impl FleetController {
    /// Controller with default configuration and routing.
    pub fn new(graph: NavGraph) -> Self {
        Self::from_parts(
            Arc::new(graph),
            Arc::default(),
            Arc::new(fl_graph::CachedPathFinder::new(
                fl_graph::CongestionAStar::default(),
                FleetConfig::default().path_cache_capacity,
            )),
            FleetConfig::default(),
            Arc::new(crate::NoopObserver),
        )
    }

    pub fn builder(graph: NavGraph) -> FleetBuilder {
        FleetBuilder::new(graph)
    }

    pub(crate) fn from_parts(
        graph:     Arc<NavGraph>,
        traffic:   Arc<TrafficManager>,
        finder:    Arc<dyn PathFinder>,
        config:    FleetConfig,
        event_log: Arc<dyn FleetObserver>,
    ) -> Self {
        Self {
            graph: RwLock::new(graph),
            traffic,
            finder,
            config,
            event_log,
            robots:  RwLock::new(BTreeMap::new()),
            counter: Mutex::new(0),
            workers: Mutex::new(Vec::new()),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn graph(&self) -> Arc<NavGraph> {
        self.graph.read().clone()
    }

    pub fn traffic(&self) -> &Arc<TrafficManager> {
        &self.traffic
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Replace the navigation graph.  Stops every worker and drops all
    /// robots, reservations, queues, priorities and congestion history.
    pub fn load_graph(&self, graph: NavGraph) {
        self.clear_all();
        self.traffic.reset();
        info!(
            "loaded graph with {} vertices and {} lanes",
            graph.vertex_count(),
            graph.lane_count()
        );
        *self.graph.write() = Arc::new(graph);
    }

    // ── Robots ────────────────────────────────────────────────────────────

    /// Place a new robot at `vertex`.  Returns its id and a
    /// `"Spawned at <name>"` message.
    pub fn spawn_robot(&self, vertex: VertexId) -> FleetResult<(RobotId, String)> {
        let graph = self.graph();
        let position = graph.position(vertex).map_err(|_| FleetError::InvalidVertexIndex(vertex))?;
        let name = graph.name(vertex)?.to_string();

        let id = {
            let mut counter = self.counter.lock();
            *counter += 1;
            RobotId::from_counter(*counter)
        };
        let cell = Arc::new(RobotCell::new(Robot::new(id.clone(), vertex, position)));
        self.robots.write().insert(id.clone(), cell);

        let message = format!("Spawned at {name}");
        info!("{id}: {message}");
        self.log_event(&id, EventAction::Spawned, RobotStatus::Idle, Some(vertex), &message);
        Ok((id, message))
    }

    /// Spawn at the nearest unoccupied vertex to `vertex` (by lane hops).
    pub fn spawn_robot_near(&self, vertex: VertexId) -> FleetResult<(RobotId, String)> {
        let target = self.nearest_available_vertex(vertex)?;
        self.spawn_robot(target)
    }

    /// Assign `vertex` as the robot's destination.
    ///
    /// Rejected when the robot is standing on `vertex` or `vertex` cannot be
    /// reached from its last vertex on the lane graph.  A robot between two
    /// vertices stands on neither, so it may be sent back to the one it just
    /// left.  Occupancy by other robots is not checked: traffic is
    /// arbitrated at reservation time.
    pub fn set_destination(&self, robot: &RobotId, vertex: VertexId) -> FleetResult<String> {
        let graph = self.graph();
        if !graph.contains(vertex) {
            return Err(FleetError::InvalidVertexIndex(vertex));
        }
        let cell = self.cell(robot)?;

        let (position, last_vertex) = {
            let r = cell.lock();
            (r.position, r.last_vertex)
        };
        if graph.vertex_at(position, self.config.arrival_tolerance) == Some(vertex) {
            return Err(already_there(robot, vertex));
        }
        self.check_reachable(&graph, robot, last_vertex, vertex)?;

        let name = graph.name(vertex)?;
        let status = {
            let mut r = cell.lock();
            r.destination = Some(vertex);
            r.status
        };
        let message = format!("Destination set to {name}");
        info!("{robot}: {message}");
        self.log_event(robot, EventAction::DestinationSet, status, Some(vertex), &message);
        Ok(message)
    }

    /// Append `vertex` to the robot's task queue.  With no destination set,
    /// it becomes the destination immediately.
    pub fn queue_destination(&self, robot: &RobotId, vertex: VertexId) -> FleetResult<String> {
        let graph = self.graph();
        if !graph.contains(vertex) {
            return Err(FleetError::InvalidVertexIndex(vertex));
        }
        let cell = self.cell(robot)?;
        let (has_destination, from) = {
            let r = cell.lock();
            let from = r.tasks.back().copied().or(r.destination).unwrap_or(r.last_vertex);
            (r.destination.is_some(), from)
        };
        if !has_destination {
            return self.set_destination(robot, vertex);
        }
        if from == vertex {
            return Err(already_there(robot, vertex));
        }
        self.check_reachable(&graph, robot, from, vertex)?;

        let name = graph.name(vertex)?;
        let (pending, status) = {
            let mut r = cell.lock();
            r.tasks.push_back(vertex);
            (r.tasks.len(), r.status)
        };
        let message = format!("Queued {name} ({pending} pending)");
        debug!("{robot}: {message}");
        self.log_event(robot, EventAction::TaskQueued, status, Some(vertex), &message);
        Ok(message)
    }

    fn check_reachable(
        &self,
        graph: &NavGraph,
        robot: &RobotId,
        from:  VertexId,
        to:    VertexId,
    ) -> FleetResult<()> {
        if graph.bfs_find(from, |v| v == to).is_none() {
            return Err(FleetError::DestinationOccupiedOrUnreachable {
                robot:  robot.clone(),
                vertex: to,
                reason: "no lane route exists",
            });
        }
        Ok(())
    }

    /// Launch a worker for every robot that has a destination, is not in
    /// `Error`, and has no worker running.  Returns how many were launched.
    ///
    /// `observer` receives per-step status callbacks and every worker
    /// event; the builder's event log receives the same events.
    pub fn start_movement(&self, observer: Arc<dyn FleetObserver>) -> FleetResult<usize> {
        let graph = self.graph();
        let observer: Arc<dyn FleetObserver> = Arc::new(Fanout {
            log:      Arc::clone(&self.event_log),
            callback: observer,
        });

        let candidates: Vec<Arc<RobotCell>> = self.robots.read().values().cloned().collect();
        let mut launched = 0;
        for cell in candidates {
            {
                let r = cell.lock();
                if r.destination.is_none() || r.status == RobotStatus::Error {
                    continue;
                }
            }
            if !cell.is_active() || !cell.claim() {
                continue;
            }

            let worker = Worker {
                cell:     Arc::clone(&cell),
                graph:    Arc::clone(&graph),
                traffic:  Arc::clone(&self.traffic),
                finder:   Arc::clone(&self.finder),
                config:   self.config.clone(),
                observer: Arc::clone(&observer),
            };
            let spawned = thread::Builder::new()
                .name(format!("robot-{}", cell.id()))
                .spawn(move || worker.run());
            let handle = match spawned {
                Ok(h) => h,
                Err(e) => {
                    cell.finish();
                    return Err(e.into());
                }
            };
            self.workers.lock().push(WorkerHandle { robot: cell.id().clone(), handle });
            launched += 1;
        }

        if launched > 0 {
            info!("started {launched} movement worker(s)");
        }
        Ok(launched)
    }

    /// Stop every worker, remove every robot, reset the id counter, and drop
    /// all reservations, queues and priorities.  Congestion history is kept.
    pub fn clear_all(&self) -> String {
        let cells: Vec<Arc<RobotCell>> = {
            let mut robots = self.robots.write();
            let cells = robots.values().cloned().collect();
            robots.clear();
            cells
        };
        for cell in &cells {
            cell.set_active(false);
            cell.lock().destination = None;
        }
        *self.counter.lock() = 0;

        let handles: Vec<WorkerHandle> = self.workers.lock().drain(..).collect();
        join_all(handles);
        self.traffic.clear_reservations();

        info!("system reset ({} robot(s) removed)", cells.len());
        "System reset complete".to_string()
    }

    /// Recover a robot: stop its worker, release its lanes, clear its
    /// destination, tasks and `Error` status, and snap it back onto its last
    /// known vertex.
    pub fn reset_robot(&self, robot: &RobotId) -> FleetResult<String> {
        let cell = self.cell(robot)?;
        cell.set_active(false);

        let mine: Vec<WorkerHandle> = {
            let mut workers = self.workers.lock();
            let (mine, rest): (Vec<_>, Vec<_>) = workers.drain(..).partition(|w| &w.robot == robot);
            *workers = rest;
            mine
        };
        join_all(mine);
        self.traffic.release_all(robot);

        let graph = self.graph();
        let vertex = {
            let mut r = cell.lock();
            r.destination = None;
            r.tasks.clear();
            r.status = RobotStatus::Idle;
            if let Ok(p) = graph.position(r.last_vertex) {
                r.position = p;
            }
            r.last_vertex
        };
        cell.set_active(true);

        let message = format!("{robot} reset at {}", graph.name(vertex)?);
        info!("{message}");
        self.log_event(robot, EventAction::Reset, RobotStatus::Idle, Some(vertex), &message);
        Ok(message)
    }

    /// Block until every worker has finished, or `timeout` elapses.
    /// Returns `true` if the fleet went idle in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let done = {
                let mut workers = self.workers.lock();
                let (finished, running): (Vec<_>, Vec<_>) =
                    workers.drain(..).partition(|w| w.handle.is_finished());
                *workers = running;
                (finished, workers.is_empty())
            };
            join_all(done.0);
            if done.1 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL);
        }
    }

    // ── Traffic façade ────────────────────────────────────────────────────

    pub fn lane_status(&self, lane: Lane) -> LaneStatus {
        self.traffic.lane_status(lane)
    }

    pub fn congestion(&self, lane: Lane) -> f64 {
        self.traffic.congestion(lane)
    }

    pub fn congestion_snapshot(&self) -> CongestionSnapshot {
        self.traffic.congestion_snapshot()
    }

    /// Robot pairs currently closer than `threshold`.
    pub fn detect_collisions(&self, threshold: f64) -> BTreeSet<CollisionPair> {
        let positions: Vec<(RobotId, Point)> = self
            .robots
            .read()
            .values()
            .map(|c| (c.id().clone(), c.lock().position))
            .collect();
        self.traffic
            .detect_collisions(positions.iter().map(|(r, p)| (r, p)), threshold)
    }

    /// [`detect_collisions`](Self::detect_collisions) at the configured
    /// default threshold.
    pub fn detect_collisions_default(&self) -> BTreeSet<CollisionPair> {
        self.detect_collisions(self.config.collision_threshold)
    }

    pub fn set_priority(&self, robot: &RobotId, weight: f64) -> FleetResult<()> {
        let cell = self.cell(robot)?;
        cell.lock().priority = weight;
        self.traffic.set_priority(robot, weight);
        Ok(())
    }

    /// The robot that should proceed when `a` and `b` contend; ties go to
    /// `a`.
    pub fn negotiate_priority(&self, a: &RobotId, b: &RobotId) -> FleetResult<RobotId> {
        self.cell(a)?;
        self.cell(b)?;
        Ok(self.traffic.negotiate_priority(a, b))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn robot_count(&self) -> usize {
        self.robots.read().len()
    }

    pub fn robot_ids(&self) -> Vec<RobotId> {
        self.robots.read().keys().cloned().collect()
    }

    pub fn robot_status(&self, robot: &RobotId) -> FleetResult<RobotSnapshot> {
        let cell = self.cell(robot)?;
        Ok(self.snapshot_of(&cell))
    }

    /// Snapshots of every robot, ordered by id.
    pub fn all_robot_status(&self) -> Vec<RobotSnapshot> {
        let cells: Vec<Arc<RobotCell>> = self.robots.read().values().cloned().collect();
        cells.iter().map(|c| self.snapshot_of(c)).collect()
    }

    /// The robot standing on `vertex` (within the arrival tolerance), if any.
    pub fn vertex_occupant(&self, vertex: VertexId) -> FleetResult<Option<RobotId>> {
        let graph = self.graph();
        let at = graph.position(vertex).map_err(|_| FleetError::InvalidVertexIndex(vertex))?;
        Ok(self.occupant_at(at))
    }

    /// BFS over lanes from `vertex` to the first vertex no robot stands on.
    pub fn nearest_available_vertex(&self, vertex: VertexId) -> FleetResult<VertexId> {
        let graph = self.graph();
        if !graph.contains(vertex) {
            return Err(FleetError::InvalidVertexIndex(vertex));
        }
        let occupied = self.occupied_positions();
        let tolerance = self.config.arrival_tolerance;
        graph
            .bfs_find(vertex, |v| {
                let p = graph.vertices()[v.index()];
                !occupied.iter().any(|o| o.distance(p) <= tolerance)
            })
            .ok_or(FleetError::NoAvailableVertex(vertex))
    }

    /// Unoccupied vertices within `radius` of `center`, nearest first.
    pub fn available_vertices_in_range(&self, center: VertexId, radius: f64) -> FleetResult<Vec<VertexId>> {
        let graph = self.graph();
        let at = graph.position(center).map_err(|_| FleetError::InvalidVertexIndex(center))?;
        let occupied = self.occupied_positions();
        let tolerance = self.config.arrival_tolerance;
        Ok(graph
            .vertices_within(at, radius)
            .into_iter()
            .filter(|v| {
                let p = graph.vertices()[v.index()];
                !occupied.iter().any(|o| o.distance(p) <= tolerance)
            })
            .collect())
    }

    /// Give every idle robot without a destination a random vertex other
    /// than its current one.  Deterministic for a given `seed` and robot
    /// set.  Returns one message per assignment.
    pub fn assign_random_destinations(&self, seed: u64) -> FleetResult<Vec<String>> {
        let graph = self.graph();
        let n = graph.vertex_count();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut messages = Vec::new();
        if n < 2 {
            return Ok(messages);
        }

        for id in self.robot_ids() {
            let cell = self.cell(&id)?;
            let current = {
                let r = cell.lock();
                if r.destination.is_some() || r.status != RobotStatus::Idle {
                    continue;
                }
                r.last_vertex
            };
            // Uniform over every vertex except `current`.
            let mut pick = rng.gen_range(0..n - 1);
            if pick >= current.index() {
                pick += 1;
            }
            let target = VertexId(pick as u32);
            match self.set_destination(&id, target) {
                Ok(msg) => messages.push(format!("{id}: {msg}")),
                Err(FleetError::DestinationOccupiedOrUnreachable { .. }) => {
                    warn!("{id}: random destination {target} unreachable, skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(messages)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn cell(&self, robot: &RobotId) -> FleetResult<Arc<RobotCell>> {
        self.robots
            .read()
            .get(robot)
            .cloned()
            .ok_or_else(|| FleetError::RobotNotFound(robot.clone()))
    }

    fn snapshot_of(&self, cell: &RobotCell) -> RobotSnapshot {
        let graph = self.graph();
        let vertex = cell.lock().last_vertex;
        let name = graph.name(vertex).unwrap_or("Unknown").to_string();
        cell.snapshot(name)
    }

    fn occupied_positions(&self) -> Vec<Point> {
        self.robots.read().values().map(|c| c.lock().position).collect()
    }

    fn occupant_at(&self, at: Point) -> Option<RobotId> {
        let tolerance = self.config.arrival_tolerance;
        self.robots
            .read()
            .values()
            .find(|c| c.lock().position.distance(at) <= tolerance)
            .map(|c| c.id().clone())
    }

    fn log_event(
        &self,
        robot:  &RobotId,
        action: EventAction,
        status: RobotStatus,
        vertex: Option<VertexId>,
        detail: &str,
    ) {
        self.event_log.on_event(&FleetEvent::now(robot.clone(), action, status, vertex, detail));
    }
}

impl Drop for FleetController {
    fn drop(&mut self) {
        for cell in self.robots.read().values() {
            cell.set_active(false);
        }
        let handles: Vec<WorkerHandle> = self.workers.get_mut().drain(..).collect();
        join_all(handles);
    }
}

fn already_there(robot: &RobotId, vertex: VertexId) -> FleetError {
    FleetError::DestinationOccupiedOrUnreachable {
        robot:  robot.clone(),
        vertex,
        reason: "robot is already there",
    }
}

/// Join `handles`, skipping the calling thread's own handle (an observer
/// may call back into the controller from a worker).
fn join_all(handles: Vec<WorkerHandle>) {
    let me = thread::current().id();
    for WorkerHandle { robot, handle } in handles {
        if handle.thread().id() == me {
            continue;
        }
        if handle.join().is_err() {
            warn!("{robot}: worker thread panicked outside its fault boundary");
        }
    }
}
