//! Unit tests for fl-traffic.

#[cfg(test)]
mod helpers {
    use fl_core::{Lane, RobotId, VertexId};

    pub fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    pub fn lane(a: u32, b: u32) -> Lane {
        Lane::new(v(a), v(b))
    }

    pub fn r(name: &str) -> RobotId {
        RobotId::new(name)
    }

    pub fn path(ids: &[u32]) -> Vec<VertexId> {
        ids.iter().copied().map(VertexId).collect()
    }
}

// ── Path reservation ──────────────────────────────────────────────────────────

#[cfg(test)]
mod reservation {
    use super::helpers::*;
    use crate::{LaneStatus, TrafficManager};

    #[test]
    fn reserve_line_path() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1, 2])));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Reserved);
        assert_eq!(tm.lane_status(lane(1, 2)), LaneStatus::Reserved);
        assert_eq!(tm.holder(lane(2, 1)), Some(r("A")));
        assert_eq!(tm.held_lanes(&r("A")), vec![lane(0, 1), lane(1, 2)]);
    }

    #[test]
    fn conflicting_reservation_is_all_or_nothing() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[1, 2])));
        // B wants 0-1 (free) and 1-2 (held): nothing may be granted.
        assert!(!tm.reserve_path(&r("B"), &path(&[0, 1, 2])));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Free);
        assert_eq!(tm.holder(lane(1, 2)), Some(r("A")));
        assert!(tm.held_lanes(&r("B")).is_empty());
    }

    #[test]
    fn reserving_own_lanes_again_succeeds() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        assert!(tm.reserve_path(&r("A"), &path(&[1, 0])));
        assert_eq!(tm.reserved_count(), 1);
    }

    #[test]
    fn short_paths_reserve_nothing() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[])));
        assert!(tm.reserve_path(&r("A"), &path(&[3])));
        assert_eq!(tm.reserved_count(), 0);
    }

    #[test]
    fn release_then_other_robot_reserves() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1, 2]);
        assert!(tm.reserve_path(&r("A"), &p));
        tm.release_path(&r("A"), &p);
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Free);
        assert!(tm.reserve_path(&r("B"), &p));
    }

    #[test]
    fn release_ignores_lanes_held_by_others() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        tm.release_path(&r("B"), &path(&[0, 1]));
        assert_eq!(tm.holder(lane(0, 1)), Some(r("A")));
    }

    #[test]
    fn blocking_lanes_lists_foreign_holders_only() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[1, 2])));
        assert!(tm.reserve_path(&r("B"), &path(&[3, 4])));
        assert_eq!(tm.blocking_lanes(&r("B"), &path(&[0, 1, 2, 3, 4])), vec![lane(1, 2)]);
    }

    #[test]
    fn concurrent_reservations_never_overlap() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let tm = Arc::new(TrafficManager::new());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tm = Arc::clone(&tm);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let robot = r(&format!("R{i}"));
                    barrier.wait();
                    tm.reserve_path(&robot, &path(&[0, 1, 2, 3]))
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        let holder = tm.holder(lane(0, 1)).unwrap();
        assert_eq!(tm.holder(lane(1, 2)), Some(holder.clone()));
        assert_eq!(tm.holder(lane(2, 3)), Some(holder));
    }
}

// ── Waiting queues ────────────────────────────────────────────────────────────

#[cfg(test)]
mod queueing {
    use std::thread;
    use std::time::Duration;

    use super::helpers::*;
    use crate::{LaneStatus, TrafficManager};

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn free_lane_granted_immediately() {
        let tm = TrafficManager::new();
        assert!(tm.try_reserve_lane(&r("A"), lane(0, 1), LONG));
        assert_eq!(tm.holder(lane(0, 1)), Some(r("A")));
        assert!(tm.try_reserve_lane(&r("A"), lane(0, 1), LONG));
        assert_eq!(tm.queue_len(lane(0, 1)), 0);
    }

    #[test]
    fn held_lane_enqueues_and_becomes_contested() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Contested);
        assert_eq!(tm.waiters(lane(0, 1)), vec![r("B")]);
    }

    #[test]
    fn requeue_refreshes_instead_of_duplicating() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        assert!(!tm.try_reserve_lane(&r("C"), lane(0, 1), LONG));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        assert_eq!(tm.waiters(lane(0, 1)), vec![r("B"), r("C")]);
    }

    #[test]
    fn release_promotes_in_fifo_order() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1]);
        assert!(tm.reserve_path(&r("A"), &p));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        assert!(!tm.try_reserve_lane(&r("C"), lane(0, 1), LONG));

        tm.release_path(&r("A"), &p);
        assert_eq!(tm.holder(lane(0, 1)), Some(r("B")));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Contested);

        tm.release_path(&r("B"), &p);
        assert_eq!(tm.holder(lane(0, 1)), Some(r("C")));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Reserved);

        tm.release_path(&r("C"), &p);
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Free);
    }

    #[test]
    fn expired_waiter_is_not_promoted() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1]);
        assert!(tm.reserve_path(&r("A"), &p));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), Duration::from_millis(1)));
        assert!(!tm.try_reserve_lane(&r("C"), lane(0, 1), LONG));
        thread::sleep(Duration::from_millis(20));

        tm.release_path(&r("A"), &p);
        assert_eq!(tm.holder(lane(0, 1)), Some(r("C")));
        assert_eq!(tm.queue_len(lane(0, 1)), 0);
    }

    #[test]
    fn expired_waiters_do_not_count_as_contention() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), Duration::from_millis(1)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Reserved);
    }

    #[test]
    fn promotion_bumps_congestion() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1]);
        assert!(tm.reserve_path(&r("A"), &p));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        tm.release_path(&r("A"), &p);
        assert!((tm.congestion(lane(0, 1)) - 0.19).abs() < 1e-12);
    }

    #[test]
    fn release_all_releases_held_and_withdraws_queued() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1, 2])));
        assert!(tm.reserve_path(&r("B"), &path(&[5, 6])));
        assert!(!tm.try_reserve_lane(&r("A"), lane(5, 6), LONG));
        assert!(!tm.try_reserve_lane(&r("B"), lane(1, 2), LONG));

        let released = tm.release_all(&r("A"));
        assert_eq!(released, vec![lane(0, 1), lane(1, 2)]);
        // B was waiting on 1-2 and is promoted.
        assert_eq!(tm.holder(lane(1, 2)), Some(r("B")));
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Free);
        // A no longer waits on 5-6.
        assert_eq!(tm.queue_len(lane(5, 6)), 0);
    }

    #[test]
    fn clear_reservations_keeps_congestion() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1])));
        assert!(!tm.try_reserve_lane(&r("B"), lane(0, 1), LONG));
        tm.set_priority(&r("A"), 3.0);

        tm.clear_reservations();
        assert_eq!(tm.lane_status(lane(0, 1)), LaneStatus::Free);
        assert_eq!(tm.queue_len(lane(0, 1)), 0);
        assert_eq!(tm.priority(&r("A")), 0.0);
        assert!((tm.congestion(lane(0, 1)) - 0.1).abs() < 1e-12);

        tm.reset();
        assert_eq!(tm.congestion(lane(0, 1)), 0.0);
    }
}

// ── Congestion & priority ─────────────────────────────────────────────────────

#[cfg(test)]
mod scoring {
    use super::helpers::*;
    use crate::TrafficManager;

    #[test]
    fn congestion_follows_ewma() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1]);
        let expected = [0.1, 0.19, 0.271, 0.3439, 0.40951];
        for want in expected {
            assert!(tm.reserve_path(&r("A"), &p));
            tm.release_path(&r("A"), &p);
            let got = tm.congestion(lane(0, 1));
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn congestion_never_reaches_one() {
        let tm = TrafficManager::new();
        let p = path(&[0, 1]);
        for _ in 0..500 {
            assert!(tm.reserve_path(&r("A"), &p));
        }
        let c = tm.congestion(lane(0, 1));
        assert!(c > 0.99 && c < 1.0);
    }

    #[test]
    fn snapshot_reflects_scores() {
        let tm = TrafficManager::new();
        assert!(tm.reserve_path(&r("A"), &path(&[0, 1, 2])));
        let snap = tm.congestion_snapshot();
        assert_eq!(snap.len(), 2);
        assert!((snap.get(lane(1, 2)) - 0.1).abs() < 1e-12);
        assert_eq!(snap.get(lane(7, 8)), 0.0);
    }

    #[test]
    fn negotiate_prefers_higher_weight_and_ties_go_first() {
        let tm = TrafficManager::new();
        let (a, b) = (r("A"), r("B"));
        assert_eq!(tm.negotiate_priority(&a, &b), a);
        assert_eq!(tm.negotiate_priority(&b, &a), b);

        tm.set_priority(&b, 1.5);
        assert_eq!(tm.negotiate_priority(&a, &b), b);
        tm.set_priority(&a, 1.5);
        assert_eq!(tm.negotiate_priority(&a, &b), a);
        assert_eq!(tm.priority(&r("Z")), 0.0);
    }
}

// ── Proximity ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod collisions {
    use std::collections::BTreeMap;

    use fl_core::{Point, RobotId};

    use super::helpers::*;
    use crate::{detect_collisions, CollisionPair, TrafficManager};

    fn positions(entries: &[(&str, f64, f64)]) -> BTreeMap<RobotId, Point> {
        entries.iter().map(|&(n, x, y)| (r(n), Point::new(x, y))).collect()
    }

    #[test]
    fn close_pair_flagged() {
        let pos = positions(&[("A", 0.0, 0.0), ("B", 1.0, 0.0), ("C", 10.0, 10.0)]);
        let found = TrafficManager::new().detect_collisions(&pos, 2.0);
        assert_eq!(found.len(), 1);
        assert!(found.contains(&CollisionPair::new(r("A"), r("B"))));
    }

    #[test]
    fn pair_order_is_canonical() {
        let p = CollisionPair::new(r("B"), r("A"));
        assert_eq!(p.first(), &r("A"));
        assert_eq!(p.second(), &r("B"));
        assert!(p.contains(&r("B")));
        assert_eq!(p.to_string(), "A<->B");
    }

    #[test]
    fn extreme_coordinates_stay_in_edge_cells() {
        let pos = positions(&[
            ("A", 1e300, 0.0),
            ("B", 1e300, 0.5),
            ("C", -1e300, 1e300),
            ("D", -1e300, 1e300 + 0.5),
            ("E", 0.0, 0.0),
        ]);
        let found = detect_collisions(&pos, 1.0);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&CollisionPair::new(r("A"), r("B"))));
        assert!(found.contains(&CollisionPair::new(r("C"), r("D"))));
    }

    #[test]
    fn distance_equal_to_threshold_is_not_a_collision() {
        let pos = positions(&[("A", 0.0, 0.0), ("B", 2.0, 0.0)]);
        assert!(detect_collisions(&pos, 2.0).is_empty());
    }

    #[test]
    fn neighbors_across_cell_borders_are_found() {
        // Straddle the cell boundary at x = 4 (cell edge 4.0) and y = -4.
        let pos = positions(&[
            ("A", 3.9, 0.0),
            ("B", 4.1, 0.0),
            ("C", -0.1, -3.9),
            ("D", 0.1, -4.1),
        ]);
        let found = detect_collisions(&pos, 2.0);
        assert!(found.contains(&CollisionPair::new(r("A"), r("B"))));
        assert!(found.contains(&CollisionPair::new(r("C"), r("D"))));
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        let pos = positions(&[("A", 0.0, 0.0), ("B", 0.0, 0.0), ("C", f64::NAN, 0.0)]);
        assert!(detect_collisions(&pos, 0.0).is_empty());
        assert!(detect_collisions(&pos, -1.0).is_empty());
        assert!(detect_collisions(&pos, f64::INFINITY).is_empty());
        let found = detect_collisions(&pos, 1.0);
        assert_eq!(found.len(), 1);
        assert!(!found.iter().any(|p| p.contains(&r("C"))));
    }
}

// ── Randomized properties ─────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use std::collections::BTreeSet;

    use fl_core::{Point, RobotId};
    use proptest::prelude::*;

    use crate::{detect_collisions, CollisionPair};

    fn brute_force(robots: &[(RobotId, Point)], threshold: f64) -> BTreeSet<CollisionPair> {
        let mut out = BTreeSet::new();
        for (i, (ra, pa)) in robots.iter().enumerate() {
            for (rb, pb) in &robots[i + 1..] {
                if pa.distance_sq(*pb) < threshold * threshold {
                    out.insert(CollisionPair::new(ra.clone(), rb.clone()));
                }
            }
        }
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn grid_matches_brute_force(
            coords in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 0..40),
            threshold in 0.1f64..15.0,
        ) {
            let robots: Vec<(RobotId, Point)> = coords
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| (RobotId::from_counter(i as u64 + 1), Point::new(x, y)))
                .collect();
            let fast = detect_collisions(robots.iter().map(|(r, p)| (r, p)), threshold);
            prop_assert_eq!(fast, brute_force(&robots, threshold));
        }
    }
}
