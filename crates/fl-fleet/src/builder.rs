//! Fluent builder for constructing a [`FleetController`].

use std::sync::Arc;

use fl_core::FleetConfig;
use fl_graph::{CachedPathFinder, CongestionAStar, NavGraph, PathFinder};
use fl_traffic::TrafficManager;

use crate::observer::{FleetObserver, NoopObserver};
use crate::{FleetController, FleetResult};

/// Fluent builder for [`FleetController`].
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                                                 |
/// |---------------------|---------------------------------------------------------|
/// | `.config(c)`        | `FleetConfig::default()`                                |
/// | `.path_finder(p)`   | `CachedPathFinder<CongestionAStar>` built from `config` |
/// | `.traffic(t)`       | a fresh `TrafficManager`                                |
/// | `.event_log(o)`     | `NoopObserver`                                          |
///
/// # Example
///
/// ```rust,ignore
/// let fleet = FleetBuilder::new(graph)
///     .config(FleetConfig::fast())
///     .event_log(Arc::new(EventLogObserver::new(MemoryWriter::new())))
///     .build()?;
/// ```
pub struct FleetBuilder {
    graph:     NavGraph,
    config:    FleetConfig,
    finder:    Option<Arc<dyn PathFinder>>,
    traffic:   Option<Arc<TrafficManager>>,
    event_log: Arc<dyn FleetObserver>,
}

impl FleetBuilder {
    pub fn new(graph: NavGraph) -> Self {
        Self {
            graph,
            config:    FleetConfig::default(),
            finder:    None,
            traffic:   None,
            event_log: Arc::new(NoopObserver),
        }
    }

    pub fn config(mut self, config: FleetConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the routing strategy.
    pub fn path_finder(mut self, finder: Arc<dyn PathFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Share an existing traffic manager (e.g. with a monitoring layer).
    pub fn traffic(mut self, traffic: Arc<TrafficManager>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    /// Sink receiving every [`FleetEvent`](crate::FleetEvent), including
    /// those raised by controller operations such as spawns and resets.
    pub fn event_log(mut self, observer: Arc<dyn FleetObserver>) -> Self {
        self.event_log = observer;
        self
    }

    /// Validate the configuration and return a ready controller.
    pub fn build(self) -> FleetResult<FleetController> {
        self.config.validate()?;

        let finder = self.finder.unwrap_or_else(|| {
            Arc::new(CachedPathFinder::new(
                CongestionAStar::new(self.config.congestion_penalty),
                self.config.path_cache_capacity,
            ))
        });
        let traffic = self.traffic.unwrap_or_default();

        Ok(FleetController::from_parts(
            Arc::new(self.graph),
            traffic,
            finder,
            self.config,
            self.event_log,
        ))
    }
}
