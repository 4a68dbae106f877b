use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::{build_app, with_middleware};
use crate::state::AppState;
use crate::users::password::verify_password;

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::in_memory();
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&v).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send_raw(&self.router, req).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, None).await
    }

    async fn create_product(&self, name: &str, price: f64) -> String {
        let (status, body) = self
            .post("/products", json!({ "name": name, "price": price, "stock": 10 }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_user(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/users",
                json!({ "name": "Ada", "email": email, "password": "hunter22" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_invoice(&self) -> String {
        let user = self.create_user("buyer@example.com").await;
        let product = self.create_product("Widget", 5.0).await;
        let (status, body) = self
            .post(
                "/invoices",
                json!({ "userId": user, "items": [{ "productId": product, "quantity": 2 }] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

async fn send_raw(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

// ---- process wiring ----

#[tokio::test]
async fn root_returns_welcome_message() {
    let app = TestApp::new();
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn unmatched_route_and_verb_return_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");

    let (status, body) = app.send("PATCH", "/products", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn panicking_handler_becomes_500() {
    async fn boom() -> &'static str {
        panic!("kaboom")
    }
    let router = with_middleware(Router::new().route("/boom", get(boom)));
    let req = Request::builder().uri("/boom").body(Body::empty()).unwrap();
    let (status, body) = send_raw(&router, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server error");
    assert_eq!(body["error"], "kaboom");
}

#[tokio::test]
async fn malformed_json_is_rejected_with_400() {
    let app = TestApp::new();
    let req = Request::builder()
        .method("POST")
        .uri("/products")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = send_raw(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");

    let (status, _) = app
        .post("/products", json!({ "name": "Widget", "price": "cheap" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---- products ----

#[tokio::test]
async fn widget_lifecycle() {
    let app = TestApp::new();

    let (status, created) = app
        .post("/products", json!({ "name": "Widget", "price": 9.99 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["stock"], 0);
    assert_eq!(created["price"], 9.99);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = app.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["price"], 9.99);
    assert_eq!(fetched["stock"], 0);

    let (status, body) = app.delete(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    let (status, _) = app.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_products_returns_everything_in_order() {
    let app = TestApp::new();
    app.create_product("A", 1.0).await;
    app.create_product("B", 2.0).await;
    let (status, body) = app.get("/products").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
async fn create_product_requires_name_and_price() {
    let app = TestApp::new();
    let (status, body) = app.post("/products", json!({ "price": 3.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["name"].is_string());

    let (status, body) = app
        .post("/products", json!({ "name": "Widget", "price": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["price"].is_string());

    let (_, list) = app.get("/products").await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn negative_update_is_rejected_and_record_kept() {
    let app = TestApp::new();
    let id = app.create_product("Widget", 4.5).await;

    let (status, body) = app
        .put(&format!("/products/{id}"), json!({ "price": -2 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["price"].is_string());

    let (status, body) = app
        .put(&format!("/products/{id}"), json!({ "stock": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["stock"].is_string());

    let (_, stored) = app.get(&format!("/products/{id}")).await;
    assert_eq!(stored["price"], 4.5);
    assert_eq!(stored["stock"], 10);
}

#[tokio::test]
async fn update_merges_supplied_fields() {
    let app = TestApp::new();
    let id = app.create_product("Widget", 4.5).await;

    let (status, body) = app
        .put(
            &format!("/products/{id}"),
            json!({ "stock": 3, "description": "now in blue" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Widget");
    assert_eq!(body["price"], 4.5);
    assert_eq!(body["stock"], 3);
    assert_eq!(body["description"], "now in blue");
}

#[tokio::test]
async fn update_unknown_product_is_404() {
    let app = TestApp::new();
    let (status, _) = app
        .put(&format!("/products/{}", Uuid::new_v4()), json!({ "price": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_missing_records_is_404() {
    let app = TestApp::new();
    for resource in ["products", "users", "invoices"] {
        let (status, body) = app
            .delete(&format!("/{resource}/{}", Uuid::new_v4()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{resource}");
        assert!(body["message"].as_str().unwrap().ends_with("not found"));

        let (status, _) = app.delete(&format!("/{resource}/not-an-id")).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{resource}");
    }
}

#[tokio::test]
async fn reading_or_updating_missing_records_is_404() {
    let app = TestApp::new();
    let updates = [
        ("users", json!({ "name": "Grace" })),
        ("invoices", json!({ "status": "paid" })),
    ];
    for (resource, update) in updates {
        let uri = format!("/{resource}/{}", Uuid::new_v4());
        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{resource}");
        assert!(body["message"].as_str().unwrap().ends_with("not found"));

        let (status, _) = app.put(&uri, update).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{resource}");
    }

    let (_, all) = app.get("/invoices").await;
    assert!(all.as_array().unwrap().is_empty());
}

// ---- users ----

#[tokio::test]
async fn created_user_has_hashed_password_and_never_exposes_it() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/users",
            json!({ "name": "Ada", "email": "Ada@Example.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());

    let id = body["id"].as_str().unwrap();
    let stored = app
        .state
        .users
        .find(Uuid::parse_str(id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, "hunter22");
    assert!(verify_password("hunter22", &stored.password_hash).unwrap());

    let (_, one) = app.get(&format!("/users/{id}")).await;
    let (_, all) = app.get("/users").await;
    for text in [one.to_string(), all.to_string()] {
        assert!(!text.contains("password"));
        assert!(!text.contains("hunter22"));
        assert!(!text.contains("argon2"));
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let app = TestApp::new();
    app.create_user("ada@example.com").await;

    let (status, body) = app
        .post(
            "/users",
            json!({ "name": "Other", "email": "ADA@example.com ", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["email"].is_string());

    let (_, all) = app.get("/users").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_user_reports_each_missing_field() {
    let app = TestApp::new();
    let (status, body) = app.post("/users", json!({ "email": "x@y.io" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("password"));
    assert!(!errors.contains_key("email"));
}

#[tokio::test]
async fn update_user_rehashes_only_changed_password() {
    let app = TestApp::new();
    let id = app.create_user("ada@example.com").await;
    let uuid = Uuid::parse_str(&id).unwrap();
    let original = app.state.users.find(uuid).await.unwrap().unwrap();

    let (status, body) = app
        .put(&format!("/users/{id}"), json!({ "password": "hunter22" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("password").is_none());
    let same = app.state.users.find(uuid).await.unwrap().unwrap();
    assert_eq!(same.password_hash, original.password_hash);

    let (status, _) = app
        .put(&format!("/users/{id}"), json!({ "password": "new-secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let changed = app.state.users.find(uuid).await.unwrap().unwrap();
    assert_ne!(changed.password_hash, original.password_hash);
    assert_ne!(changed.password_hash, "new-secret");
    assert!(verify_password("new-secret", &changed.password_hash).unwrap());
}

#[tokio::test]
async fn update_user_role_and_email_rules() {
    let app = TestApp::new();
    let ada = app.create_user("ada@example.com").await;
    app.create_user("bob@example.com").await;

    let (status, body) = app
        .put(&format!("/users/{ada}"), json!({ "role": "superuser" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");

    let (status, body) = app
        .put(&format!("/users/{ada}"), json!({ "role": "admin", "name": "Ada L." }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["name"], "Ada L.");

    let (status, body) = app
        .put(&format!("/users/{ada}"), json!({ "email": "Bob@Example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["email"].is_string());

    let (status, body) = app
        .put(&format!("/users/{ada}"), json!({ "email": "ADA@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
}

// ---- invoices ----

#[tokio::test]
async fn invoice_with_unknown_user_is_rejected() {
    let app = TestApp::new();
    let product = app.create_product("Widget", 5.0).await;
    let (status, body) = app
        .post(
            "/invoices",
            json!({
                "userId": Uuid::new_v4(),
                "items": [{ "productId": product, "quantity": 1, "price": 5.0 }],
                "totalAmount": 5.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["userId"].is_string());

    let (_, all) = app.get("/invoices").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invoice_with_unknown_product_is_rejected() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let product = app.create_product("Widget", 5.0).await;
    let missing = Uuid::new_v4();
    let (status, body) = app
        .post(
            "/invoices",
            json!({
                "userId": user,
                "items": [
                    { "productId": product, "quantity": 1 },
                    { "productId": missing, "quantity": 1 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["productId"]
        .as_str()
        .unwrap()
        .contains(&missing.to_string()));

    let (_, all) = app.get("/invoices").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invoice_requires_items_and_positive_quantity() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let product = app.create_product("Widget", 5.0).await;

    let (status, body) = app
        .post("/invoices", json!({ "userId": user, "items": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["items"].is_string());

    let (status, body) = app
        .post(
            "/invoices",
            json!({ "userId": user, "items": [{ "productId": product, "quantity": 0 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["quantity"].is_string());
}

#[tokio::test]
async fn invoice_captures_prices_and_defaults_to_pending() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let widget = app.create_product("Widget", 5.0).await;
    let gadget = app.create_product("Gadget", 20.0).await;

    let (status, body) = app
        .post(
            "/invoices",
            json!({
                "userId": user,
                "items": [
                    { "productId": widget, "quantity": 2 },
                    { "productId": gadget, "quantity": 1, "price": 18.0 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["items"][0]["price"], 5.0);
    assert_eq!(body["items"][1]["price"], 18.0);
    assert_eq!(body["totalAmount"], 28.0);
    assert!(body["paymentDate"].is_null());

    let id = body["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/invoices/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["userId"], user);
}

#[tokio::test]
async fn paying_sets_payment_date_exactly_once() {
    let app = TestApp::new();
    let id = app.create_invoice().await;

    let (status, first) = app
        .put(&format!("/invoices/{id}"), json!({ "status": "paid" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "paid");
    let paid_at = first["paymentDate"].as_str().unwrap().to_string();

    let (status, second) = app
        .put(
            &format!("/invoices/{id}"),
            json!({ "status": "paid", "paymentDate": "2030-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["paymentDate"], paid_at.as_str());
}

#[tokio::test]
async fn invalid_status_is_rejected_and_status_kept() {
    let app = TestApp::new();
    let id = app.create_invoice().await;

    let (status, body) = app
        .put(&format!("/invoices/{id}"), json!({ "status": "shipped" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].is_string());

    let (_, stored) = app.get(&format!("/invoices/{id}")).await;
    assert_eq!(stored["status"], "pending");
}

#[tokio::test]
async fn deleting_referenced_user_leaves_invoice_intact() {
    let app = TestApp::new();
    let id = app.create_invoice().await;
    let (_, invoice) = app.get(&format!("/invoices/{id}")).await;
    let user = invoice["userId"].as_str().unwrap();

    let (status, _) = app.delete(&format!("/users/{user}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, still) = app.get(&format!("/invoices/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(still["userId"], user);

    let (status, body) = app.delete(&format!("/invoices/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Invoice deleted successfully");
}

#[tokio::test]
async fn null_items_are_reported_on_items() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let (status, body) = app
        .post("/invoices", json!({ "userId": user, "items": null }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["items"].is_string());
}

#[tokio::test]
async fn malformed_reference_ids_are_reported_on_their_field() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let product = app.create_product("Widget", 5.0).await;

    let (status, body) = app
        .post(
            "/invoices",
            json!({ "userId": "not-a-user", "items": [{ "productId": product, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["userId"].is_string());

    let (status, body) = app
        .post(
            "/invoices",
            json!({ "userId": user, "items": [{ "productId": "widget-42", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["productId"]
        .as_str()
        .unwrap()
        .contains("widget-42"));

    let (_, all) = app.get("/invoices").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn overflowing_total_is_rejected() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let product = app.create_product("Widget", 5.0).await;

    let (status, body) = app
        .post(
            "/invoices",
            json!({
                "userId": user,
                "items": [{ "productId": product, "quantity": 2, "price": 1e308 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["errors"]["totalAmount"].is_string());

    let (_, all) = app.get("/invoices").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_payment_date_is_rejected_and_invoice_unpaid() {
    let app = TestApp::new();
    let id = app.create_invoice().await;

    let (status, body) = app
        .put(
            &format!("/invoices/{id}"),
            json!({ "status": "paid", "paymentDate": "next friday" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["paymentDate"].is_string());

    let (_, stored) = app.get(&format!("/invoices/{id}")).await;
    assert_eq!(stored["status"], "pending");
    assert!(stored["paymentDate"].is_null());
}
