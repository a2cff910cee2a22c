//! API integration tests against a real PostgreSQL database.
//!
//! Each test gets a freshly migrated database from `#[sqlx::test]`.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use natours_api::{api, AppConfig, AppState};

fn app(pool: PgPool) -> Router {
    api::router(AppState::new(AppConfig::default(), pool))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn tour_payload(name: &str, price: f64, rating: f64, difficulty: &str) -> Value {
    json!({
        "name": name,
        "duration": 5,
        "maxGroupSize": 20,
        "difficulty": difficulty,
        "ratingsAverage": rating,
        "ratingsQuantity": 10,
        "price": price,
        "summary": "A memorable journey",
        "startDates": []
    })
}

/// Create a tour and return its id
async fn seed(app: &Router, payload: Value) -> String {
    let (status, body) = send_json(app, "POST", "/api/v1/tours", payload).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["tour"]["id"].as_str().unwrap().to_string()
}

async fn seed_priced(app: &Router, prices: &[f64]) {
    for (i, price) in prices.iter().enumerate() {
        seed(app, tour_payload(&format!("Tour number {:02}", i), *price, 4.5, "easy")).await;
    }
}

fn prices(body: &Value) -> Vec<f64> {
    body["data"]["tours"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["price"].as_f64().unwrap())
        .collect()
}

#[sqlx::test]
#[ignore]
async fn create_then_get_returns_written_fields(pool: PgPool) {
    let app = app(pool);
    let payload = json!({
        "name": "The Forest Hiker",
        "duration": 5,
        "maxGroupSize": 25,
        "difficulty": "easy",
        "ratingsAverage": 4.7,
        "ratingsQuantity": 37,
        "price": 397,
        "summary": "Breathtaking hike through the Canadian Banff National Park",
        "description": "Ut enim ad minim veniam",
        "startDates": ["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z"]
    });

    let (status, created) = send_json(&app, "POST", "/api/v1/tours", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "success");
    assert_eq!(created["message"], "New tour has been created");

    let id = created["data"]["tour"]["id"].as_str().unwrap();
    let (status, fetched) = get(&app, &format!("/api/v1/tours/{}", id)).await;
    assert_eq!(status, StatusCode::OK);

    let tour = &fetched["data"]["tour"];
    for field in ["name", "duration", "maxGroupSize", "difficulty", "ratingsQuantity", "summary", "description", "startDates"] {
        assert_eq!(tour[field], payload[field], "field {}", field);
    }
    assert_eq!(tour["price"].as_f64(), Some(397.0));
    assert_eq!(tour["ratingsAverage"].as_f64(), Some(4.7));
}

#[sqlx::test]
#[ignore]
async fn get_unknown_tour_is_404(pool: PgPool) {
    let app = app(pool);
    let (status, body) = get(&app, &format!("/api/v1/tours/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["code"], "NOT_FOUND");
}

#[sqlx::test]
#[ignore]
async fn delete_is_idempotent(pool: PgPool) {
    let app = app(pool);
    let id = seed(&app, tour_payload("The Snow Adventurer", 997.0, 4.5, "hard")).await;

    for _ in 0..2 {
        let request = Request::delete(format!("/api/v1/tours/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    let (status, _) = get(&app, &format!("/api/v1/tours/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test]
#[ignore]
async fn list_sorted_by_descending_price(pool: PgPool) {
    let app = app(pool);
    seed_priced(&app, &[497.0, 1997.0, 397.0, 2997.0, 997.0]).await;

    let (status, body) = get(&app, "/api/v1/tours?sort=-price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(prices(&body), vec![2997.0, 1997.0, 997.0, 497.0, 397.0]);
}

#[sqlx::test]
#[ignore]
async fn list_projects_requested_fields(pool: PgPool) {
    let app = app(pool);
    seed_priced(&app, &[497.0, 997.0]).await;

    let (status, body) = get(&app, "/api/v1/tours?fields=name,price").await;
    assert_eq!(status, StatusCode::OK);
    for tour in body["data"]["tours"].as_array().unwrap() {
        let mut keys: Vec<&str> = tour.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "name", "price"]);
    }

    let (_, body) = get(&app, "/api/v1/tours").await;
    let tour = body["data"]["tours"][0].as_object().unwrap();
    assert!(!tour.contains_key("createdAt"));
    assert!(tour.contains_key("summary"));
}

#[sqlx::test]
#[ignore]
async fn list_paginates_in_sort_order(pool: PgPool) {
    let app = app(pool);
    seed_priced(&app, &[500.0, 100.0, 400.0, 200.0, 300.0]).await;

    let (_, body) = get(&app, "/api/v1/tours?sort=price&page=2&limit=2").await;
    assert_eq!(prices(&body), vec![300.0, 400.0]);

    let (_, body) = get(&app, "/api/v1/tours?sort=price&page=3&limit=2").await;
    assert_eq!(prices(&body), vec![500.0]);

    let (status, body) = get(&app, "/api/v1/tours?sort=price&page=4&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["data"]["tours"], json!([]));
}

#[sqlx::test]
#[ignore]
async fn list_filters_with_comparison_operators(pool: PgPool) {
    let app = app(pool);
    seed_priced(&app, &[397.0, 497.0, 997.0, 1497.0]).await;

    let (status, body) = get(&app, "/api/v1/tours?price%5Bgte%5D=497&price%5Blt%5D=1497&sort=price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prices(&body), vec![497.0, 997.0]);

    let (_, body) = get(&app, "/api/v1/tours?difficulty=hard").await;
    assert_eq!(body["total"], 0);
}

#[sqlx::test]
#[ignore]
async fn top_tours_alias_overrides_caller_params(pool: PgPool) {
    let app = app(pool);
    let seeds = [
        ("The Sea Explorer", 497.0, 4.8),
        ("The Forest Hiker", 397.0, 4.7),
        ("The City Wanderer", 1197.0, 4.6),
        ("The Park Camper", 1497.0, 4.9),
        ("The Sports Lover", 2997.0, 4.8),
        ("The Wine Taster", 1997.0, 4.5),
        ("The Star Gazer", 997.0, 4.4),
    ];
    for (name, price, rating) in seeds {
        seed(&app, tour_payload(name, price, rating, "medium")).await;
    }

    let (status, body) = get(&app, "/api/v1/tours/top-5-cheap?limit=50&sort=name&fields=description").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);

    let tours = body["data"]["tours"].as_array().unwrap();
    let names: Vec<&str> = tours.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "The Park Camper",
            "The Sea Explorer",
            "The Sports Lover",
            "The Forest Hiker",
            "The City Wanderer",
        ]
    );

    for tour in tours {
        let mut keys: Vec<&str> = tour.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["difficulty", "id", "name", "price", "ratingsAverage", "summary"]);
    }
}

#[sqlx::test]
#[ignore]
async fn update_applies_validated_changes(pool: PgPool) {
    let app = app(pool);
    let id = seed(&app, tour_payload("The Northern Lights", 1497.0, 4.9, "easy")).await;
    let uri = format!("/api/v1/tours/{}", id);

    let (status, body) = send_json(&app, "PATCH", &uri, json!({ "price": 1297, "difficulty": "medium" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tour"]["price"].as_f64(), Some(1297.0));
    assert_eq!(body["data"]["tour"]["difficulty"], "medium");
    assert_eq!(body["data"]["tour"]["name"], "The Northern Lights");

    let (status, body) = send_json(&app, "PATCH", &uri, json!({ "ratingsAverage": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (_, body) = get(&app, &uri).await;
    assert_eq!(body["data"]["tour"]["ratingsAverage"].as_f64(), Some(4.9));

    let (_, body) = send_json(&app, "PATCH", &uri, json!({ "description": "Auroras over the fjords" })).await;
    assert_eq!(body["data"]["tour"]["description"], "Auroras over the fjords");

    let (status, body) = send_json(&app, "PATCH", &uri, json!({ "description": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tour"]["description"], Value::Null);

    let missing = format!("/api/v1/tours/{}", Uuid::new_v4());
    let (status, _) = send_json(&app, "PATCH", &missing, json!({ "price": 10 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test]
#[ignore]
async fn duplicate_name_is_conflict(pool: PgPool) {
    let app = app(pool);
    seed(&app, tour_payload("The Desert Dreamer", 697.0, 4.5, "easy")).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/tours",
        tour_payload("The Desert Dreamer", 797.0, 4.5, "easy"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");
}

#[sqlx::test]
#[ignore]
async fn stats_order_by_average_rating(pool: PgPool) {
    let app = app(pool);
    seed(&app, tour_payload("The Easy Stroller", 300.0, 3.8, "easy")).await;
    seed(&app, tour_payload("The Easy Paddler", 500.0, 4.2, "easy")).await;
    seed(&app, tour_payload("The Hard Climber", 1500.0, 4.8, "hard")).await;

    let (status, body) = get(&app, "/api/v1/tours/tour-stats").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["status"], "success");
    let stats = body["data"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["difficulty"], "HARD");
    assert_eq!(stats[1]["difficulty"], "EASY");

    let easy = &stats[1];
    assert_eq!(easy["totalTours"], 2);
    assert_eq!(easy["totalRatings"], 20);
    assert!((easy["avgRating"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    assert_eq!(easy["avgPrice"].as_f64(), Some(400.0));
    assert_eq!(easy["minPrice"].as_f64(), Some(300.0));
    assert_eq!(easy["maxPrice"].as_f64(), Some(500.0));
    assert_eq!(easy["maxDuration"], 5);
}

#[sqlx::test]
#[ignore]
async fn monthly_plan_groups_starts_by_month(pool: PgPool) {
    let app = app(pool);
    let plan = [
        ("The Sea Explorer", vec!["2021-06-19T09:00:00Z", "2021-07-20T09:00:00Z", "2022-06-05T09:00:00Z"]),
        ("The Forest Hiker", vec!["2021-07-25T09:00:00Z", "2021-12-31T18:00:00Z"]),
        ("The Park Camper", vec!["2021-07-30T09:00:00Z", "2021-06-01T09:00:00Z", "2021-03-11T09:00:00Z"]),
        ("The Star Gazer", vec![]),
    ];
    for (name, dates) in plan {
        let mut payload = tour_payload(name, 997.0, 4.5, "medium");
        payload["startDates"] = json!(dates);
        seed(&app, payload).await;
    }

    let (status, body) = get(&app, "/api/v1/tours/monthly-plan/2021").await;
    assert_eq!(status, StatusCode::OK);

    let months = body["data"]["plan"].as_array().unwrap();
    assert_eq!(months.len(), 3);
    assert_eq!(months[0]["month"], 7);
    assert_eq!(months[0]["toursPerMonth"], 3);
    assert_eq!(
        months[0]["tours"],
        json!(["The Sea Explorer", "The Forest Hiker", "The Park Camper"])
    );
    assert_eq!(months[1]["month"], 6);
    assert_eq!(months[1]["toursPerMonth"], 2);
    // March and December tie on one start each; lower month wins
    assert_eq!(months[2]["month"], 3);
    assert!(months.iter().all(|m| m.get("_id").is_none()));
}

#[sqlx::test]
#[ignore]
async fn monthly_plan_for_empty_year_is_empty(pool: PgPool) {
    let app = app(pool);
    let mut payload = tour_payload("The Sea Explorer", 497.0, 4.8, "medium");
    payload["startDates"] = json!(["2021-06-19T09:00:00Z"]);
    seed(&app, payload).await;

    let (status, body) = get(&app, "/api/v1/tours/monthly-plan/1999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["plan"], json!([]));
}

#[sqlx::test]
#[ignore]
async fn readiness_check_reaches_database(pool: PgPool) {
    let app = app(pool);
    let (status, body) = get(&app, "/api/v1/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
