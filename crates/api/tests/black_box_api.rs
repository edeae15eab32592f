use std::sync::Arc;

use larder_api::app::{AppServices, build_app};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_item(client: &reqwest::Client, srv: &TestServer, name: &str, quantity: i64) -> Value {
    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({
            "image": format!("{name}.png"),
            "name": name,
            "category": "pantry",
            "quantity": quantity,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn create_recipe(client: &reqwest::Client, srv: &TestServer, name: &str, ingredients: Value) -> Value {
    let res = client
        .post(srv.url("/recipes"))
        .json(&json!({
            "image": "",
            "name": name,
            "description": "test recipe",
            "ingredients": ingredients,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn list_recipes(client: &reqwest::Client, srv: &TestServer) -> Vec<Value> {
    let res = client.get(srv.url("/recipes")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn craft(client: &reqwest::Client, srv: &TestServer, recipe_id: &str) -> reqwest::Response {
    client
        .post(srv.url("/recipes/craft"))
        .json(&json!({ "recipeId": recipe_id }))
        .send()
        .await
        .unwrap()
}

fn quantity_of(items: &[Value], id: &Value) -> i64 {
    items
        .iter()
        .find(|i| &i["id"] == id)
        .and_then(|i| i["quantity"].as_i64())
        .expect("item missing from listing")
}

#[tokio::test]
async fn root_and_health_respond() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "working server");

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn craft_lifecycle_updates_stock_and_availability() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let a = create_item(&client, &srv, "flour", 5).await;
    let b = create_item(&client, &srv, "eggs", 2).await;
    let recipe = create_recipe(
        &client,
        &srv,
        "pancakes",
        json!([
            { "inventoryId": a["id"], "amountNeeded": 2 },
            { "inventoryId": b["id"], "amountNeeded": 3 },
        ]),
    )
    .await;
    assert_eq!(recipe["amount"], 0);

    let listed = list_recipes(&client, &srv).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "pancakes");
    assert_eq!(listed[0]["craftable"], false);

    // Top up eggs to exactly what is needed.
    let res = client
        .put(srv.url(&format!("/inventory/{}", b["id"].as_str().unwrap())))
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let listed = list_recipes(&client, &srv).await;
    assert_eq!(listed[0]["craftable"], true);

    let res = craft(&client, &srv, recipe["id"].as_str().unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": true }));

    let items: Vec<Value> = client
        .get(srv.url("/inventory"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quantity_of(&items, &a["id"]), 3);
    assert_eq!(quantity_of(&items, &b["id"]), 0);

    let listed = list_recipes(&client, &srv).await;
    assert_eq!(listed[0]["amount"], 1);
    assert_eq!(listed[0]["craftable"], false);
}

#[tokio::test]
async fn dangling_ingredient_is_not_craftable_but_crafts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let a = create_item(&client, &srv, "butter", 5).await;
    let gone = create_item(&client, &srv, "saffron", 9).await;
    let recipe = create_recipe(
        &client,
        &srv,
        "risotto",
        json!([
            { "inventoryId": a["id"], "amountNeeded": 2 },
            { "inventoryId": gone["id"], "amountNeeded": 1 },
        ]),
    )
    .await;

    let res = client
        .delete(srv.url(&format!("/inventory/{}", gone["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let listed = list_recipes(&client, &srv).await;
    assert_eq!(listed[0]["craftable"], false);

    let res = craft(&client, &srv, recipe["id"].as_str().unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let items: Vec<Value> = client
        .get(srv.url("/inventory"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(quantity_of(&items, &a["id"]), 3);

    let res = client
        .get(srv.url(&format!("/recipes/{}", recipe["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    let stored: Value = res.json().await.unwrap();
    assert_eq!(stored["amount"], 1);
}

#[tokio::test]
async fn craft_unknown_recipe_succeeds_without_changes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let a = create_item(&client, &srv, "salt", 4).await;

    let res = craft(&client, &srv, "0190f5c4-7d3a-7b4e-9a1c-3f2e1d0c9b8a").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let items: Vec<Value> = client
        .get(srv.url("/inventory"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quantity_of(&items, &a["id"]), 4);
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = craft(&client, &srv, "not-a-uuid").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = client.get(srv.url("/recipes/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.delete(srv.url("/inventory/42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_records_are_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let ghost = "0190f5c4-7d3a-7b4e-9a1c-3f2e1d0c9b8a";

    let res = client.get(srv.url(&format!("/recipes/{ghost}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client.delete(srv.url(&format!("/recipes/{ghost}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url(&format!("/inventory/{ghost}")))
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client.delete(srv.url(&format!("/inventory/{ghost}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({ "image": "", "name": "  ", "category": "pantry", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let a = create_item(&client, &srv, "rice", 1).await;
    let res = client
        .put(srv.url(&format!("/inventory/{}", a["id"].as_str().unwrap())))
        .json(&json!({ "quantity": -3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/recipes"))
        .json(&json!({
            "image": "",
            "name": "air",
            "description": "",
            "ingredients": [{ "inventoryId": a["id"], "amountNeeded": 0 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unparsable_bodies_get_json_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/recipes/craft"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
    assert!(body["message"].is_string());

    let res = client
        .post(srv.url("/recipes/craft"))
        .json(&json!({ "id": "0190f5c4-7d3a-7b4e-9a1c-3f2e1d0c9b8a" }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let res = client
        .post(srv.url("/recipes"))
        .json(&json!({
            "image": "",
            "name": "soup",
            "description": "",
            "ingredients": [{ "inventoryId": "0190f5c4-7d3a-7b4e-9a1c-3f2e1d0c9b8a", "amountNeeded": -2 }],
        }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}
