//! `fl-fleet`: robot set, destinations, and concurrent movement workers.
//!
//! # Movement state machine
//!
//! ```text
//! Idle → Planning → Reserving → Moving → Idle
//!   Planning  → Blocked → Planning      (no route; back off)
//!   Reserving → Waiting → Reserving     (lanes held; queue + back off)
//!   Waiting   → Planning                (waited ≥ replan_after)
//!   any active state → Error            (fault; until reset_robot)
//! ```
//!
//! One OS thread per robot with a destination (`robot-<id>`), started by
//! [`FleetController::start_movement`].  See [`worker`] for the loop.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use fl_fleet::{FleetBuilder, NoopObserver};
//!
//! let fleet = FleetBuilder::new(graph).config(FleetConfig::fast()).build()?;
//! let (a, _) = fleet.spawn_robot(VertexId(0))?;
//! fleet.set_destination(&a, VertexId(2))?;
//! fleet.start_movement(Arc::new(NoopObserver))?;
//! fleet.wait_idle(Duration::from_secs(5));
//! ```

pub mod builder;
pub mod controller;
pub mod error;
pub mod interpolate;
pub mod observer;
pub mod robot;
pub mod worker;


pub use builder::FleetBuilder;
pub use controller::FleetController;
pub use error::{FleetError, FleetResult};
pub use interpolate::{interpolate, Waypoint};
pub use observer::{EventAction, FleetEvent, FleetObserver, NoopObserver};
pub use robot::{Robot, RobotSnapshot};
