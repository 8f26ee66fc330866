mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_charge_options() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/points/charge-options", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["presets"],
        json!([1000, 3000, 5000, 10000, 20000, 50000])
    );
    assert_eq!(body["min_custom"], 1);
    assert_eq!(body["max_custom"], 1_000_000);
}

#[tokio::test]
async fn test_charge_earn_spend_flow() {
    let app = TestApp::new();
    let token = app.member("ledger@example.com").await;

    let (status, charged) = app
        .post("/api/points/charge", Some(&token), json!({ "amount": 5000 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(charged["type"], "charge");
    assert_eq!(charged["source"], "card_charge");
    assert_eq!(charged["balance_after"], 5000);

    // Lotte Duty Free earns 10 points per 1000 KRW
    let store_id = app.store_id("Lotte Duty Free Seoul").await;
    let (status, earned) = app
        .post(
            "/api/points/earn",
            Some(&token),
            json!({ "store_id": store_id, "purchase_amount": 25_500 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(earned["type"], "earn");
    assert_eq!(earned["amount"], 255);
    assert_eq!(earned["description"], "Purchase at Lotte Duty Free Seoul");

    let (status, spent) = app
        .post(
            "/api/points/spend",
            Some(&token),
            json!({ "amount": 1255, "store_id": store_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(spent["type"], "spend");
    assert_eq!(spent["balance_after"], 4000);
    assert_eq!(spent["description"], "Spent at Lotte Duty Free Seoul");

    assert_eq!(app.balance(&token).await, 4000);

    let (status, page) = app.get("/api/points/transactions", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    let kinds: Vec<&str> = page["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&"charge") && kinds.contains(&"earn") && kinds.contains(&"spend"));

    let (_, earned_only) = app
        .get("/api/points/transactions?type=earn", Some(&token))
        .await;
    assert_eq!(earned_only["total"], 1);
    assert_eq!(earned_only["transactions"][0]["amount"], 255);
}

#[tokio::test]
async fn test_overspend_leaves_balance_untouched() {
    let app = TestApp::new();
    let token = app.member("frugal@example.com").await;
    app.post("/api/points/charge", Some(&token), json!({ "amount": 100 }))
        .await;

    let (status, body) = app
        .post("/api/points/spend", Some(&token), json!({ "amount": 101 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_points");

    assert_eq!(app.balance(&token).await, 100);
    let (_, page) = app.get("/api/points/transactions", Some(&token)).await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_invalid_amounts() {
    let app = TestApp::new();
    let token = app.member("amounts@example.com").await;

    for amount in [0, -10, 1_000_001] {
        let (status, _) = app
            .post("/api/points/charge", Some(&token), json!({ "amount": amount }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "charge {amount}");
    }

    let (status, _) = app
        .post("/api/points/spend", Some(&token), json!({ "amount": 0 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let store_id = app.store_id("Myeongdong Shopping Street").await;
    let (status, _) = app
        .post(
            "/api/points/earn",
            Some(&token),
            json!({ "store_id": store_id, "purchase_amount": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/api/points/earn",
            Some(&token),
            json!({ "store_id": uuid::Uuid::new_v4(), "purchase_amount": 10_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Store not found");

    let (status, _) = app
        .get("/api/points/transactions?page_size=500", Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_balances_are_per_member() {
    let app = TestApp::new();
    let alice = app.member("alice@example.com").await;
    let bob = app.member("bob@example.com").await;

    app.post("/api/points/charge", Some(&alice), json!({ "amount": 3000 }))
        .await;

    assert_eq!(app.balance(&alice).await, 3000);
    assert_eq!(app.balance(&bob).await, 0);

    let (_, code) = app.get("/api/users/me/code", Some(&alice)).await;
    assert_eq!(code["points_balance"], 3000);
}
