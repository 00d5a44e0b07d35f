mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::TestApp;
use coop_energy_api::db::transaction::claim_row;
use coop_energy_api::entities::{energy_bond, energy_zone_summary};
use coop_energy_api::errors::ServiceError;
use coop_energy_api::metrics::OPTIMISTIC_LOCK_CONFLICTS;
use coop_energy_api::services::energy_zones::EnergyMovementRequest;
use rust_decimal_macros::dec;
use sea_orm::TransactionTrait;
use serde_json::json;

fn lock_conflicts(resource: &str) -> u64 {
    OPTIMISTIC_LOCK_CONFLICTS.with_label_values(&[resource]).get()
}

// 20 concurrent reservations of 1 kWh against 10 kWh of headroom: exactly 10 must land.
#[tokio::test]
async fn concurrent_reservations_never_oversubscribe() {
    let app = TestApp::new().await;
    let zone_id = app.create_zone("Huerta Norte", "46015", 10.0).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let zones = app.state.services.zones.clone();
        tasks.push(tokio::spawn(async move {
            zones
                .reserve_energy(
                    zone_id,
                    EnergyMovementRequest {
                        kwh: dec!(1),
                        note: None,
                    },
                    None,
                )
                .await
        }));
    }

    let mut applied = 0;
    for task in tasks {
        match task.await.expect("reservation task panicked") {
            Ok(_) => applied += 1,
            Err(err) => assert_matches!(err, ServiceError::CapacityShortage(_)),
        }
    }
    assert_eq!(applied, 10, "exactly 10 reservations should succeed");

    let zone = app
        .get(&format!("/api/v1/energy-zone-summaries/{}", zone_id))
        .await;
    assert_eq!(zone.data()["reserved_kwh_day"], 10.0);
    assert_eq!(zone.data()["available_kwh_day"], 0.0);
    assert_eq!(zone.data()["status"], "red");
    assert_eq!(zone.data()["version"], 11);

    let movements = app
        .get(&format!("/api/v1/energy-zone-summaries/{}/movements", zone_id))
        .await;
    assert_eq!(movements.body["pagination"]["total"], 10);
}

#[tokio::test]
async fn reservations_on_separate_zones_are_independent() {
    let app = TestApp::new().await;
    let north = app.create_zone("Norte", "46015", 5.0).await;
    let south = app.create_zone("Sur", "46025", 5.0).await;

    let mut tasks = Vec::new();
    for zone_id in [north, south, north, south, north, south] {
        let zones = app.state.services.zones.clone();
        tasks.push(tokio::spawn(async move {
            zones
                .reserve_energy(
                    zone_id,
                    EnergyMovementRequest {
                        kwh: dec!(1.5),
                        note: Some("batch".to_string()),
                    },
                    None,
                )
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.expect("reservation task panicked").is_ok());
    }

    for zone_id in [north, south] {
        let zone = app
            .get(&format!("/api/v1/energy-zone-summaries/{}", zone_id))
            .await;
        assert_eq!(zone.data()["reserved_kwh_day"], 4.5);
        assert_eq!(zone.data()["available_kwh_day"], 0.5);
    }
}

// Same race as above, but with a real pool and parallel workers so writers meet on the
// database lock instead of queueing for the single connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_on_a_shared_pool_never_fail_or_oversubscribe() {
    let app = TestApp::with_config(|cfg| {
        cfg.db_max_connections = 8;
    })
    .await;
    let zone_id = app.create_zone("Huerta Sur", "46016", 10.0).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let zones = app.state.services.zones.clone();
        tasks.push(tokio::spawn(async move {
            zones
                .reserve_energy(
                    zone_id,
                    EnergyMovementRequest {
                        kwh: dec!(1),
                        note: None,
                    },
                    None,
                )
                .await
        }));
    }

    let mut applied = 0;
    let mut shortages = 0;
    for task in tasks {
        match task.await.expect("reservation task panicked") {
            Ok(_) => applied += 1,
            Err(ServiceError::CapacityShortage(_)) => shortages += 1,
            Err(other) => panic!("reservation failed with {:?}", other),
        }
    }
    assert_eq!(applied, 10);
    assert_eq!(shortages, 10);

    let zone = app
        .get(&format!("/api/v1/energy-zone-summaries/{}", zone_id))
        .await;
    assert_eq!(zone.data()["reserved_kwh_day"], 10.0);
    assert_eq!(zone.data()["version"], 11);

    let movements = app
        .get(&format!("/api/v1/energy-zone-summaries/{}/movements", zone_id))
        .await;
    assert_eq!(movements.body["pagination"]["total"], 10);
}

#[tokio::test]
async fn reservation_against_a_locked_zone_is_a_conflict() {
    let app = TestApp::with_config(|cfg| {
        cfg.db_max_connections = 4;
        cfg.db_busy_timeout_ms = 50;
        cfg.optimistic_lock_attempts = 2;
    })
    .await;
    let zone_id = app.create_zone("Marjal", "46017", 10.0).await;
    let uri = format!("/api/v1/energy-zone-summaries/{}/reserve-energy", zone_id);
    let conflicts_before = lock_conflicts("energy-zone-summaries");

    let holder = app.state.db.begin().await.unwrap();
    claim_row::<energy_zone_summary::Entity>(
        &holder,
        energy_zone_summary::Column::Id,
        energy_zone_summary::Column::Version,
        zone_id,
    )
    .await
    .unwrap();

    let response = app.post(&uri, json!({ "kwh": 2 })).await;
    assert_eq!(response.status, StatusCode::CONFLICT, "{}", response.body);
    assert_eq!(response.body["success"], false);
    assert_eq!(
        response.body["message"],
        format!("Record {} was modified concurrently, please retry", zone_id)
    );
    assert!(lock_conflicts("energy-zone-summaries") >= conflicts_before + 2);

    holder.rollback().await.unwrap();

    let response = app.post(&uri, json!({ "kwh": 2 })).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["reserved_kwh_day"], 2.0);
    assert_eq!(response.data()["version"], 2);

    let movements = app
        .get(&format!("/api/v1/energy-zone-summaries/{}/movements", zone_id))
        .await;
    assert_eq!(movements.body["pagination"]["total"], 1);
}

#[tokio::test]
async fn transition_against_a_locked_record_is_a_conflict() {
    let app = TestApp::with_config(|cfg| {
        cfg.db_max_connections = 4;
        cfg.db_busy_timeout_ms = 50;
        cfg.optimistic_lock_attempts = 1;
    })
    .await;
    let id = app.create_bond("Locked roof").await;
    let uri = format!("/api/v1/energy-bonds/{}/approve", id);
    let conflicts_before = lock_conflicts("energy-bonds");

    let holder = app.state.db.begin().await.unwrap();
    claim_row::<energy_bond::Entity>(&holder, energy_bond::Column::Id, energy_bond::Column::Version, id)
        .await
        .unwrap();

    let response = app.post_as_actor(&uri, None).await;
    assert_eq!(response.status, StatusCode::CONFLICT, "{}", response.body);
    assert!(lock_conflicts("energy-bonds") > conflicts_before);

    holder.rollback().await.unwrap();

    let response = app.post_as_actor(&uri, None).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["status"], "approved");

    let trail = app.get(&format!("/api/v1/energy-bonds/{}/transitions", id)).await;
    assert_eq!(trail.data().as_array().unwrap().len(), 1);
}
