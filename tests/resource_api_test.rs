mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::TestApp;
use serde_json::{json, Value};

async fn create_product(app: &TestApp, name: &str, sku: &str, category: &str, price: f64) -> Value {
    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": name, "sku": sku, "category": category, "price": price }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.data().clone()
}

#[tokio::test]
async fn listing_is_paginated() {
    let app = TestApp::new().await;
    for n in 0..25 {
        create_product(&app, &format!("Panel {}", n), &format!("PNL-{:03}", n), "solar", 100.0 + n as f64)
            .await;
    }

    let response = app.get("/api/v1/products?per_page=10&page=3").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Products retrieved");
    assert_eq!(response.data().as_array().unwrap().len(), 5);
    assert_eq!(
        response.body["pagination"],
        json!({ "current_page": 3, "per_page": 10, "total": 25, "last_page": 3 })
    );

    let first = app.get("/api/v1/products?per_page=10").await;
    assert_eq!(first.data().as_array().unwrap().len(), 10);
    assert_eq!(first.body["pagination"]["current_page"], 1);
}

#[tokio::test]
async fn listing_supports_search_sort_and_filters() {
    let app = TestApp::new().await;
    create_product(&app, "Solar panel", "SOL-1", "solar", 250.0).await;
    create_product(&app, "Solar inverter", "SOL-2", "solar", 900.0).await;
    create_product(&app, "Heat pump", "HP-1", "thermal", 4200.0).await;

    let response = app.get("/api/v1/products?search=solar&sort_by=price&sort_order=asc").await;
    assert_eq!(response.status, StatusCode::OK);
    let names: Vec<&str> = response
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Solar panel", "Solar inverter"]);

    let response = app.get("/api/v1/products?min_price=500&max_price=5000&sort_by=price&sort_order=desc").await;
    assert_eq!(response.body["pagination"]["total"], 2);
    assert_eq!(response.data()[0]["sku"], "HP-1");

    let response = app.get("/api/v1/products?category=thermal").await;
    assert_eq!(response.body["pagination"]["total"], 1);

    let response = app.get("/api/v1/products?min_price=900&max_price=100").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["min_price"].is_array());

    let response = app.get("/api/v1/products?sort_by=colour").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["sort_by"].is_array());
}

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;
    let product = create_product(&app, "Battery", "BAT-10", "storage", 3100.5).await;
    assert_eq!(product["unit"], "unit");
    assert_eq!(product["is_active"], true);
    assert_eq!(product["price"], 3100.5);
    let uri = format!("/api/v1/products/{}", product["id"].as_str().unwrap());

    let fetched = app.get(&uri).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["message"], "Product retrieved");

    let updated = app.put(&uri, json!({ "price": 2999, "is_active": false })).await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["message"], "Product updated");
    assert_eq!(updated.data()["price"], 2999.0);
    assert_eq!(updated.data()["is_active"], false);
    assert_eq!(updated.data()["name"], "Battery");

    let deleted = app.delete(&uri).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Product deleted");
    assert!(deleted.body.get("data").is_none());

    let missing = app.get(&uri).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["success"], false);
}

#[tokio::test]
async fn duplicate_sku_conflicts() {
    let app = TestApp::new().await;
    create_product(&app, "Meter", "MTR-1", "metering", 80.0).await;

    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "Meter v2", "sku": "MTR-1", "category": "metering", "price": 90 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["success"], false);

    let listing = app.get("/api/v1/products").await;
    assert_eq!(listing.body["pagination"]["total"], 1);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/products", json!({ "name": "  ", "sku": "X-1", "category": "misc", "price": -1 }))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["name"].is_array());
    assert!(response.body["errors"]["price"].is_array());

    let response = app.post("/api/v1/products", json!({ "name": "No sku" })).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post(
            "/api/v1/providers",
            json!({ "name": "Sunco", "provider_type": "installer", "website": "not a url" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["website"].is_array());

    let response = app.get("/api/v1/products/not-a-uuid").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn articles_remember_their_first_publication() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/articles",
            json!({ "title": "Winter tariffs", "slug": "winter-tariffs", "body": "..." }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.data()["status"], "draft");
    assert!(response.data()["published_at"].is_null());
    let uri = format!("/api/v1/articles/{}", response.id());

    let published = app.put(&uri, json!({ "status": "published" })).await;
    assert_eq!(published.status, StatusCode::OK, "{}", published.body);
    assert_eq!(published.data()["published_at"], "2026-03-01T09:00:00Z");

    app.clock.advance(Duration::days(30));
    let archived = app.put(&uri, json!({ "status": "archived" })).await;
    assert_eq!(archived.data()["status"], "archived");
    assert_eq!(archived.data()["published_at"], "2026-03-01T09:00:00Z");

    let response = app
        .post(
            "/api/v1/articles",
            json!({ "title": "Bad slug", "slug": "Bad Slug", "body": "...", "status": "live" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["slug"].is_array());
    assert!(response.body["errors"]["status"].is_array());
}

#[tokio::test]
async fn stats_group_and_measure_whitelisted_columns() {
    let app = TestApp::new().await;
    create_product(&app, "Panel A", "A-1", "solar", 100.0).await;
    create_product(&app, "Panel B", "A-2", "solar", 300.0).await;
    create_product(&app, "Pump", "B-1", "thermal", 1000.0).await;

    let response = app.get("/api/v1/products/stats?group_by=category").await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["message"], "Product statistics retrieved");
    assert_eq!(
        response.body["data"],
        json!([
            { "bucket": "solar", "value": 2.0 },
            { "bucket": "thermal", "value": 1.0 },
        ])
    );

    let response = app
        .get("/api/v1/products/stats?metric=sum&column=price&group_by=category&order=asc")
        .await;
    assert_eq!(
        response.body["data"],
        json!([
            { "bucket": "solar", "value": 400.0 },
            { "bucket": "thermal", "value": 1000.0 },
        ])
    );

    let response = app.get("/api/v1/products/stats?metric=avg&column=price").await;
    assert_eq!(response.body["data"][0]["value"], 1400.0 / 3.0);
    assert!(response.body["data"][0]["bucket"].is_null());

    let response = app.get("/api/v1/products/stats?period=month").await;
    assert_eq!(response.body["data"], json!([{ "bucket": "2026-03", "value": 3.0 }]));
}

#[tokio::test]
async fn stats_reject_unknown_columns() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/products/stats?group_by=sku").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["group_by"].is_array());

    let response = app.get("/api/v1/products/stats?metric=sum").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["column"].is_array());

    let response = app.get("/api/v1/products/stats?group_by=category&period=day").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/api/v1/products/stats?status=draft").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["errors"]["status"].is_array());
}

#[tokio::test]
async fn faqs_default_to_unpublished() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/faqs",
            json!({ "question": "How are zones billed?", "answer": "Monthly.", "category": "billing" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.data()["is_published"], false);
    assert_eq!(response.data()["position"], 0);

    let response = app.get("/api/v1/faqs?is_published=true").await;
    assert_eq!(response.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn responses_carry_request_ids() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/status", None, &[("x-request-id", "trace-abc")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-request-id"], "trace-abc");
    assert_eq!(response.body["meta"]["request_id"], "trace-abc");
    assert_eq!(response.body["message"], "Service is running");
    assert_eq!(response.body["data"]["status"], "ok");

    let response = app.get("/api/v1/products").await;
    let header = response.headers["x-request-id"].to_str().unwrap().to_string();
    assert!(!header.is_empty());
    assert_eq!(response.body["meta"]["request_id"], header.as_str());
    assert!(response.body["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_routes_use_the_envelope() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/solar-farms").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "The requested resource does not exist");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn operational_endpoints_respond() {
    let app = TestApp::new().await;

    let health = app.get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.data()["status"], "up");

    let live = app.get("/health/live").await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.data()["ready"], true);
    assert_eq!(ready.data()["database"], "up");

    let metrics = app.get("/metrics").await;
    assert_eq!(metrics.status, StatusCode::OK);
}
