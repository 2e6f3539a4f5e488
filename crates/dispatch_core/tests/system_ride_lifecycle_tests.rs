mod support;

use std::time::Duration;

use dispatch_core::session::{FINDING_DRIVER_MESSAGE, NO_DRIVERS_MESSAGE};
use dispatch_core::test_helpers::{ScriptedDriverSearch, TEST_DROPOFF, TEST_PICKUP};
use dispatch_core::{
    DispatchError, Leg, LegOutcome, RideSession, RideStatus, SessionSnapshot, VehicleClass,
};
use tokio::time::{sleep, Instant};

use support::session::{five_point_route, leg_recorder, session, wait_for_status};

#[tokio::test(start_paused = true)]
async fn full_ride_walks_every_status() {
    let search = ScriptedDriverSearch::succeed_after(0).with_delay(Duration::from_secs(5));
    let mut session = session(search);
    let route = five_point_route();

    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    assert_eq!(session.status(), Some(RideStatus::Searching));
    assert_eq!(
        session.search_status().message.as_deref(),
        Some(FINDING_DRIVER_MESSAGE)
    );
    assert!(session.fare().is_none());

    wait_for_status(&session, RideStatus::Approaching).await;
    let snapshot = session.snapshot();
    let ride = snapshot.ride.expect("ride");
    assert!(ride.driver.is_some());
    assert_eq!(ride.search_attempts, 1);
    assert!(!snapshot.search.is_searching);
    assert_eq!(snapshot.search.message, None);
    assert_eq!(session.fare(), Some(12.75));

    // Approach leg.
    let start = Instant::now();
    let (approach_log, observer) = leg_recorder(start);
    let handle = session.start_leg(Leg::Approach, observer).expect("approach");
    assert_eq!(handle.finished().await, LegOutcome::Completed);
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert_eq!(session.status(), Some(RideStatus::InProgress));

    let approach = approach_log.lock().expect("log").clone();
    assert_eq!(approach.len(), 4);
    for (i, (at, update)) in approach.iter().enumerate() {
        assert_eq!(update.leg, Leg::Approach);
        assert_eq!(*at, Duration::from_secs(i as u64));
        assert_eq!(update.position, route[i]);
        assert_eq!(update.progress, i as f64 / 4.0);
    }

    // Trip leg: 10 minutes of routed duration.
    let start = Instant::now();
    let (trip_log, observer) = leg_recorder(start);
    let handle = session.start_leg(Leg::Trip, observer).expect("trip");
    sleep(Duration::from_millis(2_500)).await;
    let mid = session.snapshot().ride.expect("ride");
    assert_eq!(mid.progress, 0.5);
    assert_eq!(mid.driver_position, Some(route[2]));
    assert_eq!(handle.finished().await, LegOutcome::Completed);

    let minutes: Vec<u64> = trip_log
        .lock()
        .expect("log")
        .iter()
        .map(|(_, update)| update.remaining_minutes)
        .collect();
    assert_eq!(minutes, vec![10, 8, 5, 3]);

    let done = session.snapshot().ride.expect("ride");
    assert_eq!(done.status(), RideStatus::Completed);
    assert_eq!(done.progress, 1.0);
    assert_eq!(done.driver_position, route.last().copied());
}

#[tokio::test(start_paused = true)]
async fn exhausted_search_shows_message_then_clears() {
    let search = ScriptedDriverSearch::never();
    let calls = search.calls();
    let mut session = session(search);

    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);

    // Attempt 2 failed at 1 s; attempt 3 starts at 2 s.
    sleep(Duration::from_millis(1_500)).await;
    let status = session.search_status();
    assert!(status.is_searching);
    assert_eq!(status.attempts, 3);
    assert_eq!(status.max_attempts, 3);
    assert_eq!(status.message.as_deref(), Some("Searching again... (3/3)"));

    sleep(Duration::from_secs(1)).await;
    let snapshot = session.snapshot();
    assert_eq!(
        snapshot.ride.as_ref().map(|ride| ride.status()),
        Some(RideStatus::Unmatched)
    );
    assert!(!snapshot.search.is_searching);
    assert_eq!(snapshot.search.message.as_deref(), Some(NO_DRIVERS_MESSAGE));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);

    // Display window is three seconds after exhaustion at t = 2 s.
    sleep(Duration::from_secs(3)).await;
    assert_eq!(session.snapshot(), SessionSnapshot::default());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_message_shows_during_retry_delay() {
    let search = ScriptedDriverSearch::never().with_delay(Duration::from_secs(5));
    let calls = search.calls();
    let mut session = session(search);

    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    sleep(Duration::from_millis(4_500)).await;
    assert_eq!(
        session.search_status().message.as_deref(),
        Some(FINDING_DRIVER_MESSAGE)
    );

    // The first attempt fails at 5 s; the second starts at 6 s.
    sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    let status = session.search_status();
    assert!(status.is_searching);
    assert_eq!(status.attempts, 2);
    assert_eq!(status.message.as_deref(), Some("Searching again... (2/3)"));
    assert_eq!(session.status(), Some(RideStatus::Searching));
}

#[tokio::test(start_paused = true)]
async fn cancel_search_stops_the_retry_chain() {
    let search = ScriptedDriverSearch::never();
    let calls = search.calls();
    let mut session = session(search);

    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    sleep(Duration::from_millis(500)).await;
    session.cancel_search();
    assert_eq!(session.status(), Some(RideStatus::Cancelled));
    assert!(!session.search_status().is_searching);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(session.status(), Some(RideStatus::Cancelled));

    session.cancel_search();
    assert_eq!(session.status(), Some(RideStatus::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn cancel_search_during_no_drivers_display_clears_it() {
    let mut session = session(ScriptedDriverSearch::never());
    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Accessible);

    wait_for_status(&session, RideStatus::Unmatched).await;
    session.cancel_search();
    assert_eq!(session.snapshot(), SessionSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn cancel_ride_mid_leg_freezes_progress() {
    let mut session = session(ScriptedDriverSearch::succeed_after(0));
    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    wait_for_status(&session, RideStatus::Approaching).await;

    let (log, observer) = leg_recorder(Instant::now());
    let handle = session.start_leg(Leg::Approach, observer).expect("approach");
    sleep(Duration::from_millis(1_500)).await;

    assert!(session.cancel_ride());
    sleep(Duration::from_secs(10)).await;

    assert_eq!(log.lock().expect("log").len(), 2);
    assert_eq!(handle.finished().await, LegOutcome::Cancelled);
    let ride = session.snapshot().ride.expect("ride");
    assert_eq!(ride.status(), RideStatus::Cancelled);
    assert_eq!(ride.progress, 0.25);

    assert!(!session.cancel_ride());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_leg_handle_keeps_status() {
    let mut session = session(ScriptedDriverSearch::succeed_after(0));
    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    wait_for_status(&session, RideStatus::Approaching).await;

    let handle = session.start_leg(Leg::Approach, |_| {}).expect("approach");
    sleep(Duration::from_secs(1)).await;
    drop(handle);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(session.status(), Some(RideStatus::Approaching));
}

#[tokio::test(start_paused = true)]
async fn legs_must_run_in_order() {
    let mut idle = session(ScriptedDriverSearch::succeed_after(0));
    assert_eq!(
        idle.start_leg(Leg::Approach, |_| {}).err(),
        Some(DispatchError::NoActiveRide)
    );

    let mut session = session(ScriptedDriverSearch::succeed_after(0));
    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    assert_eq!(
        session.start_leg(Leg::Approach, |_| {}).err(),
        Some(DispatchError::LegNotReady {
            leg: Leg::Approach,
            status: RideStatus::Searching
        })
    );

    wait_for_status(&session, RideStatus::Approaching).await;
    assert_eq!(
        session.start_leg(Leg::Trip, |_| {}).err(),
        Some(DispatchError::LegNotReady {
            leg: Leg::Trip,
            status: RideStatus::Approaching
        })
    );
}

#[tokio::test(start_paused = true)]
async fn new_request_replaces_the_previous_ride() {
    let search = ScriptedDriverSearch::never();
    let calls = search.calls();
    let mut session: RideSession = session(search);

    session.request_ride(TEST_PICKUP, TEST_DROPOFF, VehicleClass::Standard);
    sleep(Duration::from_millis(1_500)).await;
    session.request_ride(TEST_DROPOFF, TEST_PICKUP, VehicleClass::Accessible);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.search.attempts, 0);
    assert_eq!(
        snapshot.request.map(|request| request.class),
        Some(VehicleClass::Accessible)
    );

    wait_for_status(&session, RideStatus::Unmatched).await;
    // Two attempts from the first chain, three from the second.
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 5);
}
