//! Aggregator behavior under concurrent appliance changes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use houseload_sim::appliances::ApplianceCatalog;
use houseload_sim::sim::aggregator::Aggregator;
use houseload_sim::sim::clock::VirtualClock;
use houseload_sim::sim::engine::Simulation;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn counts_stay_consistent_while_ticking() {
    let clock = Arc::new(VirtualClock::new(50.0));
    let sim = Arc::new(Simulation::new(
        Arc::new(ApplianceCatalog::household()),
        9,
        clock,
    ));
    let handle = Aggregator::new(sim.clone(), Duration::from_millis(2)).spawn();

    let writers: Vec<_> = (0..9)
        .map(|house| {
            let sim = sim.clone();
            tokio::spawn(async move {
                for step in 0..50 {
                    let lights = (step * 7 + house) % 21;
                    sim.set_appliance_count(house, "LED Lights", lights)
                        .expect("in range");
                    sim.set_appliance_count(house, "Microwave", step % 2)
                        .expect("in range");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.expect("writer task");
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.stop().await;

    for house in 0..9 {
        let final_lights = (49 * 7 + house) % 21;
        assert_eq!(sim.appliance_count(house, "LED Lights"), Ok(final_lights));
        assert_eq!(
            sim.inspect(house, "LED Lights", |g| g.active_records()),
            Ok(final_lights)
        );
        assert_eq!(
            sim.inspect(house, "Microwave", |g| g.active_records()),
            Ok(1)
        );
    }
    let snap = sim.tick();
    assert!(!snap.has_faults());
    let sum: f64 = snap.houses.iter().map(|h| h.watts).sum();
    assert!((snap.watts - sum).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn direct_ticks_never_move_snapshot_backwards() {
    let clock = Arc::new(VirtualClock::new(10.0));
    let sim = Arc::new(Simulation::new(
        Arc::new(ApplianceCatalog::household()),
        9,
        clock,
    ));
    for house in 0..9 {
        sim.set_appliance_count(house, "Refrigerator", 2)
            .expect("in range");
    }
    let handle = Aggregator::new(sim.clone(), Duration::from_millis(1)).spawn();

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let sim = sim.clone();
            tokio::task::spawn_blocking(move || {
                let mut last_tick = 0.0;
                let mut last_seen = 0.0;
                for _ in 0..300 {
                    let snap = sim.tick();
                    assert!(snap.sim_secs >= last_tick);
                    last_tick = snap.sim_secs;

                    let seen = sim.snapshot().sim_secs;
                    assert!(seen >= last_seen, "snapshot went from {last_seen} to {seen}");
                    last_seen = seen;
                }
            })
        })
        .collect();
    for caller in callers {
        caller.await.expect("caller task");
    }
    handle.stop().await;
}

#[tokio::test]
async fn stopped_aggregator_leaves_latest_snapshot() {
    let (time, sim) = common::test_simulation();
    sim.set_appliance_count(0, "Heater", 2).expect("in range");
    time.advance_secs(5.0);

    let handle = Aggregator::new(sim.clone(), Duration::from_millis(5)).spawn();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(handle.ticks() > 0);
    handle.stop().await;

    let snap = sim.snapshot();
    assert!((snap.watts - 100.0).abs() < 1e-9);
    assert_eq!(snap.sim_secs, 5.0);
}

#[tokio::test]
async fn paused_clock_freezes_aggregated_readings() {
    let clock = Arc::new(VirtualClock::new(1.0));
    let sim = Arc::new(Simulation::new(
        Arc::new(ApplianceCatalog::household()),
        1,
        clock,
    ));
    sim.set_appliance_count(0, "Dryer", 1).expect("in range");
    sim.pause_simulation();

    let handle = Aggregator::new(sim.clone(), Duration::from_millis(5)).spawn();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let first = sim.snapshot();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = sim.snapshot();
    handle.stop().await;

    assert!(second.paused);
    assert_eq!(first.sim_secs, second.sim_secs);
    assert_eq!(first.watts, second.watts);
}
