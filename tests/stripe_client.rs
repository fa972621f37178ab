//! `StripeClient` against a local mock server.

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_kit::stripe::{NewPaymentLink, NewPrice, NewProduct, StripeApi, StripeClient, StripeError};

fn client(server: &MockServer) -> StripeClient {
    StripeClient::with_base_url("sk_test_123".into(), "2024-06-20".into(), &server.uri())
        .expect("failed to build test StripeClient")
}

#[tokio::test]
async fn lookup_key_query_and_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .and(query_param("lookup_keys[]", "price_CYS-TENT-1_usd_75000"))
        .and(query_param("active", "true"))
        .and(query_param("expand[]", "data.product"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(header("stripe-version", "2024-06-20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": false,
            "data": [{
                "id": "price_1",
                "active": true,
                "currency": "usd",
                "unit_amount": 75000,
                "lookup_key": "price_CYS-TENT-1_usd_75000",
                "product": { "id": "prod_1", "name": "Tent", "active": true, "metadata": { "sku": "CYS-TENT-1" } }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let price = client(&server)
        .find_price_by_lookup_key("price_CYS-TENT-1_usd_75000")
        .await
        .unwrap()
        .expect("price should be found");
    assert_eq!(price.id, "price_1");
    assert_eq!(price.product.id(), "prod_1");
    assert_eq!(price.unit_amount, Some(75000));
}

#[tokio::test]
async fn empty_lookup_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "has_more": false })))
        .mount(&server)
        .await;

    let found = client(&server).find_price_by_lookup_key("price_x_usd_1").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn create_product_posts_form_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/products"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("name=Tent"))
        .and(body_string_contains("metadata%5Bsku%5D=CYS-TENT-1"))
        .and(body_string_contains("metadata%5Blookup_key%5D=prod_CYS-TENT-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "prod_1",
            "name": "Tent",
            "active": true,
            "metadata": { "sku": "CYS-TENT-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let product = client(&server)
        .create_product(&NewProduct {
            name: "Tent".into(),
            sku: "CYS-TENT-1".into(),
        })
        .await
        .unwrap();
    assert_eq!(product.id, "prod_1");
    assert_eq!(product.metadata.get("sku").map(String::as_str), Some("CYS-TENT-1"));
}

#[tokio::test]
async fn create_payment_link_sends_line_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_links"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_1"))
        .and(body_string_contains("line_items%5B0%5D%5Bquantity%5D=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "plink_1",
            "url": "https://buy.stripe.com/test_1",
            "active": true,
            "metadata": {}
        })))
        .mount(&server)
        .await;

    let link = client(&server)
        .create_payment_link(&NewPaymentLink {
            price_id: "price_1".into(),
            quantity: 1,
            sku: "CYS-TENT-1".into(),
        })
        .await
        .unwrap();
    assert_eq!(link.url, "https://buy.stripe.com/test_1");
}

#[tokio::test]
async fn list_products_passes_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("starting_after", "prod_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "prod_10", "active": true }],
            "has_more": true
        })))
        .mount(&server)
        .await;

    let page = client(&server).list_products(Some("prod_9")).await.unwrap();
    assert!(page.has_more);
    assert_eq!(page.data[0].id, "prod_10");
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_links"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "type": "invalid_request_error", "code": "rate_limit", "message": "Too many requests" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_payment_links(None).await.unwrap_err();
    assert!(err.is_rate_limited(), "expected RateLimited, got {err:?}");
    assert!(err.to_string().contains("Too many requests"));
}

#[tokio::test]
async fn error_envelope_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "type": "invalid_request_error", "code": "parameter_missing", "message": "Missing required param: name." }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_product(&NewProduct {
            name: String::new(),
            sku: "X".into(),
        })
        .await
        .unwrap_err();
    match err {
        StripeError::Api { status, code, message } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("parameter_missing"));
            assert_eq!(message, "Missing required param: name.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_price_transfers_lookup_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/prices"))
        .and(body_string_contains("lookup_key=price_CYS-TENT-1_usd_75000"))
        .and(body_string_contains("transfer_lookup_key=true"))
        .and(body_string_contains("unit_amount=75000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "price_2",
            "product": "prod_1",
            "active": true,
            "currency": "usd",
            "unit_amount": 75000,
            "lookup_key": "price_CYS-TENT-1_usd_75000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let price = client(&server)
        .create_price(&NewPrice {
            product_id: "prod_1".into(),
            currency: "usd".into(),
            unit_amount: 75000,
            lookup_key: "price_CYS-TENT-1_usd_75000".into(),
        })
        .await
        .unwrap();
    assert_eq!(price.id, "price_2");
}
