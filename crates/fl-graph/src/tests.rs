//! Unit tests for fl-graph.
//!
//! All tests use hand-crafted graphs so they run without any map file.

#[cfg(test)]
mod helpers {
    use fl_core::{Point, VertexId};
    use crate::{NavGraph, NavGraphBuilder};

    pub fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    /// Three vertices in a line: 0-1-2, unit spacing on the x axis.
    pub fn line_graph() -> NavGraph {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        let m = b.add_vertex(Point::new(1.0, 0.0), None);
        let c = b.add_vertex(Point::new(2.0, 0.0), None);
        b.add_lane(a, m).unwrap();
        b.add_lane(m, c).unwrap();
        b.build()
    }

    /// Line 0-1-2 plus a detour 0-3-2 through (1, 1).
    ///
    ///   direct: 1 + 1       = 2.0
    ///   detour: √2 + √2     ≈ 2.83
    pub fn detour_graph() -> NavGraph {
        let mut b = NavGraphBuilder::new();
        let n0 = b.add_vertex(Point::new(0.0, 0.0), None);
        let n1 = b.add_vertex(Point::new(1.0, 0.0), None);
        let n2 = b.add_vertex(Point::new(2.0, 0.0), None);
        let n3 = b.add_vertex(Point::new(1.0, 1.0), None);
        b.add_lane(n0, n1).unwrap();
        b.add_lane(n1, n2).unwrap();
        b.add_lane(n0, n3).unwrap();
        b.add_lane(n3, n2).unwrap();
        b.build()
    }

    /// Unit square 0(0,0) 1(1,0) 2(0,1) 3(1,1); two equal-cost routes 0→3.
    /// `lane_order` controls insertion order of the four lanes.
    pub fn square_graph(lane_order: &[(u32, u32)]) -> NavGraph {
        let mut b = NavGraphBuilder::new();
        b.add_vertex(Point::new(0.0, 0.0), None);
        b.add_vertex(Point::new(1.0, 0.0), None);
        b.add_vertex(Point::new(0.0, 1.0), None);
        b.add_vertex(Point::new(1.0, 1.0), None);
        for &(a, c) in lane_order {
            b.add_lane(v(a), v(c)).unwrap();
        }
        b.build()
    }
}

// ── Builder & structure ───────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use fl_core::{Lane, Point};
    use crate::{GraphError, NavGraphBuilder};
    use super::helpers::{line_graph, v};

    #[test]
    fn empty_build() {
        let g = NavGraphBuilder::new().build();
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.lane_count(), 0);
        assert!(g.is_empty());
        assert!(g.neighbors(v(0)).is_empty());
    }

    #[test]
    fn lanes_are_canonical_and_deduplicated() {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        let c = b.add_vertex(Point::new(1.0, 0.0), None);
        assert_eq!(b.add_lane(c, a).unwrap(), Lane::new(a, c));
        b.add_lane(a, c).unwrap();
        let g = b.build();
        assert_eq!(g.lane_count(), 1);
        assert_eq!(g.lanes()[0].lo(), a);
        assert!(g.contains_lane(Lane::new(c, a)));
    }

    #[test]
    fn self_loop_rejected() {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        assert!(matches!(b.add_lane(a, a), Err(GraphError::SelfLoop(_))));
    }

    #[test]
    fn unknown_vertex_rejected() {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        assert!(matches!(b.add_lane(a, v(9)), Err(GraphError::VertexNotFound(x)) if x == v(9)));
    }

    #[test]
    fn neighbors_sorted_and_undirected() {
        let g = line_graph();
        assert_eq!(g.neighbors(v(1)), &[v(0), v(2)]);
        assert_eq!(g.neighbors(v(0)), &[v(1)]);
        assert_eq!(g.neighbors(v(2)), &[v(1)]);
        assert_eq!(g.neighbors(v(1)).len(), 2);
    }

    #[test]
    fn lane_length_is_euclidean() {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        let c = b.add_vertex(Point::new(3.0, 4.0), None);
        let lane = b.add_lane(a, c).unwrap();
        let g = b.build();
        assert_eq!(g.lane_length(lane).unwrap(), 5.0);
    }

    #[test]
    fn position_out_of_range_errors() {
        let g = line_graph();
        assert!(g.position(v(2)).is_ok());
        assert!(matches!(g.position(v(3)), Err(GraphError::VertexNotFound(_))));
    }

    #[test]
    fn revisions_are_unique() {
        let a = line_graph();
        let b = line_graph();
        assert_ne!(a.revision(), b.revision());
    }
}

// ── Vertex names ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod names {
    use fl_core::Point;
    use crate::graph::generated_name;
    use crate::NavGraphBuilder;
    use super::helpers::v;

    #[test]
    fn generated_descriptive_names() {
        assert_eq!(generated_name(0), "North Entrance");
        assert_eq!(generated_name(1), "South-Exit");
        assert_eq!(generated_name(7), "Hub-Zone");
    }

    #[test]
    fn generated_letter_codes() {
        assert_eq!(generated_name(8), "I1");
        assert_eq!(generated_name(26), "A2");
    }

    #[test]
    fn explicit_names_kept_and_duplicates_suffixed() {
        let mut b = NavGraphBuilder::new();
        b.add_vertex(Point::new(0.0, 0.0), Some("dock"));
        b.add_vertex(Point::new(1.0, 0.0), Some("dock"));
        b.add_vertex(Point::new(2.0, 0.0), None);
        let g = b.build();
        assert_eq!(g.name(v(0)).unwrap(), "dock");
        assert_eq!(g.name(v(1)).unwrap(), "dock_1");
        assert_eq!(g.name(v(2)).unwrap(), "East Junction");
    }
}

// ── Spatial queries ───────────────────────────────────────────────────────────

#[cfg(test)]
mod spatial {
    use fl_core::Point;
    use super::helpers::{detour_graph, line_graph, v};

    #[test]
    fn nearest_vertex() {
        let g = line_graph();
        assert_eq!(g.nearest_vertex(Point::new(1.2, 0.3)), Some(v(1)));
        assert_eq!(g.nearest_vertex(Point::new(5.0, 0.0)), Some(v(2)));
    }

    #[test]
    fn vertex_at_respects_tolerance() {
        let g = line_graph();
        assert_eq!(g.vertex_at(Point::new(1.0005, 0.0), 1e-3), Some(v(1)));
        assert_eq!(g.vertex_at(Point::new(1.5, 0.0), 1e-3), None);
    }

    #[test]
    fn vertices_within_sorted_by_distance() {
        let g = detour_graph();
        let hits = g.vertices_within(Point::new(0.0, 0.0), 1.5);
        assert_eq!(hits, vec![v(0), v(1), v(3)]);
        assert!(g.vertices_within(Point::new(0.0, 0.0), -1.0).is_empty());
    }

    #[test]
    fn bfs_find_visits_nearest_hops_first() {
        let g = line_graph();
        assert_eq!(g.bfs_find(v(0), |x| x != v(0)), Some(v(1)));
        assert_eq!(g.bfs_find(v(0), |x| x == v(0)), Some(v(0)));
        assert_eq!(g.bfs_find(v(0), |_| false), None);
        assert_eq!(g.bfs_find(v(7), |_| true), None);
    }
}

// ── A* routing ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod astar {
    use fl_core::{Lane, Point};
    use crate::{
        path_cost, CongestionAStar, CongestionSnapshot, GraphError, NavGraphBuilder, PathFinder,
    };
    use super::helpers::{detour_graph, line_graph, square_graph, v};

    fn none() -> CongestionSnapshot {
        CongestionSnapshot::new()
    }

    #[test]
    fn same_start_and_end_is_empty() {
        let g = line_graph();
        assert!(CongestionAStar::default().find_path(&g, v(1), v(1), &none()).is_empty());
    }

    #[test]
    fn line_graph_route() {
        let g = line_graph();
        let path = CongestionAStar::default().find_path(&g, v(0), v(2), &none());
        assert_eq!(path, vec![v(0), v(1), v(2)]);
        let back = CongestionAStar::default().find_path(&g, v(2), v(0), &none());
        assert_eq!(back, vec![v(2), v(1), v(0)]);
    }

    #[test]
    fn disconnected_is_empty() {
        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        let c = b.add_vertex(Point::new(1.0, 0.0), None);
        let island = b.add_vertex(Point::new(5.0, 5.0), None);
        b.add_lane(a, c).unwrap();
        let g = b.build();
        assert!(CongestionAStar::default().find_path(&g, a, island, &none()).is_empty());
    }

    #[test]
    fn out_of_range_is_empty() {
        let g = line_graph();
        assert!(CongestionAStar::default().find_path(&g, v(0), v(99), &none()).is_empty());
    }

    #[test]
    fn shortest_without_congestion() {
        let g = detour_graph();
        let path = CongestionAStar::default().find_path(&g, v(0), v(2), &none());
        assert_eq!(path, vec![v(0), v(1), v(2)]);
    }

    #[test]
    fn congestion_diverts_route() {
        let g = detour_graph();
        let mut c = none();
        // (0,1) now costs 1 × (1 + 0.5 × 2) = 2 → direct total 3 > detour 2.83.
        c.set(Lane::new(v(0), v(1)), 0.5);
        let path = CongestionAStar::default().find_path(&g, v(0), v(2), &c);
        assert_eq!(path, vec![v(0), v(3), v(2)]);
    }

    #[test]
    fn congestion_read_for_canonical_lane_in_both_directions() {
        let g = detour_graph();
        let mut c = none();
        c.set(Lane::new(v(1), v(2)), 0.5);
        // Travelling 2 → 0 crosses (1,2) "backwards"; penalty must still apply.
        let path = CongestionAStar::default().find_path(&g, v(2), v(0), &c);
        assert_eq!(path, vec![v(2), v(3), v(0)]);
    }

    #[test]
    fn zero_penalty_ignores_congestion() {
        let g = detour_graph();
        let mut c = none();
        c.set(Lane::new(v(0), v(1)), 0.9);
        let path = CongestionAStar::new(0.0).find_path(&g, v(0), v(2), &c);
        assert_eq!(path, vec![v(0), v(1), v(2)]);
        assert_eq!(CongestionAStar::new(-3.0).penalty_factor(), 0.0);
    }

    #[test]
    fn equal_cost_tie_breaks_on_lowest_vertex_id() {
        let orders: [&[(u32, u32)]; 2] = [
            &[(0, 1), (1, 3), (0, 2), (2, 3)],
            &[(2, 3), (0, 2), (3, 1), (1, 0)],
        ];
        for order in orders {
            let g = square_graph(order);
            let path = CongestionAStar::default().find_path(&g, v(0), v(3), &none());
            assert_eq!(path, vec![v(0), v(1), v(3)]);
        }
    }

    #[test]
    fn route_reports_typed_errors() {
        let g = line_graph();
        let astar = CongestionAStar::default();
        assert!(matches!(
            astar.route(&g, v(0), v(5), &none()),
            Err(GraphError::VertexNotFound(_))
        ));
        assert!(astar.route(&g, v(1), v(1), &none()).unwrap().is_empty());

        let mut b = NavGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0), None);
        let c = b.add_vertex(Point::new(1.0, 0.0), None);
        let g2 = b.build();
        assert!(matches!(astar.route(&g2, a, c, &none()), Err(GraphError::NoRoute { .. })));
    }

    #[test]
    fn raising_congestion_never_lowers_path_cost() {
        let g = detour_graph();
        let path = [v(0), v(1), v(2)];
        let mut c = none();
        let mut last = path_cost(&g, &path, &c, 2.0).unwrap();
        for step in 1..=5 {
            c.set(Lane::new(v(0), v(1)), step as f64 * 0.1);
            let cost = path_cost(&g, &path, &c, 2.0).unwrap();
            assert!(cost > last, "step {step}: {cost} <= {last}");
            last = cost;
        }
        // Congesting an unused lane leaves the cost unchanged.
        let before = path_cost(&g, &path, &c, 2.0).unwrap();
        c.set(Lane::new(v(0), v(3)), 0.9);
        assert_eq!(path_cost(&g, &path, &c, 2.0).unwrap(), before);
    }

    #[test]
    fn path_cost_rejects_non_lanes() {
        let g = detour_graph();
        assert!(path_cost(&g, &[v(0), v(2)], &none(), 2.0).is_none());
    }
}

// ── Congestion snapshot & cache ───────────────────────────────────────────────

#[cfg(test)]
mod cache {
    use fl_core::Lane;
    use crate::{CachedPathFinder, CongestionAStar, CongestionSnapshot, PathFinder};
    use super::helpers::{detour_graph, v};

    #[test]
    fn fingerprint_tracks_contents() {
        let mut a = CongestionSnapshot::new();
        let mut b = CongestionSnapshot::new();
        assert_eq!(a.fingerprint(), b.fingerprint());
        a.set(Lane::new(v(0), v(1)), 0.1);
        assert_ne!(a.fingerprint(), b.fingerprint());
        b.set(Lane::new(v(1), v(0)), 0.1);
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.set(Lane::new(v(1), v(0)), 0.19);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn repeated_query_hits_cache() {
        let g = detour_graph();
        let finder = CachedPathFinder::new(CongestionAStar::default(), 16);
        let c = CongestionSnapshot::new();
        let first = finder.find_path(&g, v(0), v(2), &c);
        let second = finder.find_path(&g, v(0), v(2), &c);
        assert_eq!(first, second);
        assert_eq!(finder.stats(), (1, 1));
        assert_eq!(finder.len(), 1);
    }

    #[test]
    fn changed_congestion_is_not_served_stale() {
        let g = detour_graph();
        let finder = CachedPathFinder::new(CongestionAStar::default(), 16);
        let mut c = CongestionSnapshot::new();
        assert_eq!(finder.find_path(&g, v(0), v(2), &c), vec![v(0), v(1), v(2)]);
        c.set(Lane::new(v(0), v(1)), 0.5);
        assert_eq!(finder.find_path(&g, v(0), v(2), &c), vec![v(0), v(3), v(2)]);
        assert_eq!(finder.stats(), (0, 2));
    }

    #[test]
    fn different_graph_revisions_do_not_share_entries() {
        let g1 = detour_graph();
        let g2 = detour_graph();
        let finder = CachedPathFinder::new(CongestionAStar::default(), 16);
        let c = CongestionSnapshot::new();
        finder.find_path(&g1, v(0), v(2), &c);
        finder.find_path(&g2, v(0), v(2), &c);
        assert_eq!(finder.stats(), (0, 2));
    }

    #[test]
    fn full_cache_is_cleared() {
        let g = detour_graph();
        let finder = CachedPathFinder::new(CongestionAStar::default(), 2);
        let c = CongestionSnapshot::new();
        finder.find_path(&g, v(0), v(1), &c);
        finder.find_path(&g, v(0), v(2), &c);
        assert_eq!(finder.len(), 2);
        finder.find_path(&g, v(0), v(3), &c);
        assert_eq!(finder.len(), 1);
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let g = detour_graph();
        let finder = CachedPathFinder::new(CongestionAStar::default(), 0);
        let c = CongestionSnapshot::new();
        finder.find_path(&g, v(0), v(2), &c);
        finder.find_path(&g, v(0), v(2), &c);
        assert!(finder.is_empty());
    }
}

// ── Randomized properties ─────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use fl_core::{Lane, Point, VertexId};
    use proptest::prelude::*;
    use crate::{path_cost, CongestionAStar, CongestionSnapshot, NavGraph, NavGraphBuilder, PathFinder};

    fn build(points: &[(i32, i32)], edges: &[(usize, usize)]) -> NavGraph {
        let mut b = NavGraphBuilder::new();
        for &(x, y) in points {
            b.add_vertex(Point::new(x as f64, y as f64), None);
        }
        let n = points.len();
        for &(a, c) in edges {
            let (a, c) = (a % n, c % n);
            if a != c {
                b.add_lane(VertexId(a as u32), VertexId(c as u32)).unwrap();
            }
        }
        b.build()
    }

    /// Bellman-Ford reference distance over the same cost model.
    fn reference_cost(g: &NavGraph, start: VertexId, end: VertexId, c: &CongestionSnapshot) -> Option<f64> {
        let mut dist = vec![f64::INFINITY; g.vertex_count()];
        dist[start.index()] = 0.0;
        for _ in 0..g.vertex_count() {
            for &lane in g.lanes() {
                let w = path_cost(g, &[lane.lo(), lane.hi()], c, 2.0).unwrap();
                let (a, b) = (lane.lo().index(), lane.hi().index());
                if dist[a] + w < dist[b] {
                    dist[b] = dist[a] + w;
                }
                if dist[b] + w < dist[a] {
                    dist[a] = dist[b] + w;
                }
            }
        }
        dist[end.index()].is_finite().then_some(dist[end.index()])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn paths_follow_lanes_and_are_optimal(
            points in prop::collection::vec((0i32..20, 0i32..20), 2..10),
            edges in prop::collection::vec((0usize..10, 0usize..10), 0..20),
            scores in prop::collection::vec(0.0f64..1.0, 20),
            start in 0usize..10,
            end in 0usize..10,
        ) {
            let g = build(&points, &edges);
            let n = points.len();
            let (s, e) = (VertexId((start % n) as u32), VertexId((end % n) as u32));
            let c: CongestionSnapshot = g
                .lanes()
                .iter()
                .zip(scores.iter())
                .map(|(&l, &sc)| (l, sc))
                .collect();

            let path = CongestionAStar::default().find_path(&g, s, e, &c);
            if s == e {
                prop_assert!(path.is_empty());
                return Ok(());
            }
            match reference_cost(&g, s, e, &c) {
                None => prop_assert!(path.is_empty()),
                Some(best) => {
                    prop_assert_eq!(path.first().copied(), Some(s));
                    prop_assert_eq!(path.last().copied(), Some(e));
                    for lane in Lane::from_path(&path) {
                        prop_assert!(g.contains_lane(lane));
                    }
                    let cost = path_cost(&g, &path, &c, 2.0).unwrap();
                    prop_assert!((cost - best).abs() < 1e-9, "A* {} vs reference {}", cost, best);
                }
            }
        }
    }
}
