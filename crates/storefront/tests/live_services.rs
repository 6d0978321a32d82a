//! Integration tests against running backend services.
//!
//! These tests require:
//! - The products service on port 8082 (or `SHOPHUB_PRODUCTS_BASE_URL`)
//! - The cart/auth service on port 9090 (or `SHOPHUB_CART_BASE_URL`)
//! - A seeded test account (`SHOPHUB_TEST_USERNAME` / `SHOPHUB_TEST_PASSWORD`)
//!
//! Run with: cargo test -p shophub-storefront -- --ignored

use url::Url;

use shophub_storefront::services::{AuthClient, CartClient, ProductsClient};

fn products_base_url() -> Url {
    let raw = std::env::var("SHOPHUB_PRODUCTS_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8082".to_string());
    Url::parse(&raw).expect("valid products base URL")
}

fn cart_base_url() -> Url {
    let raw = std::env::var("SHOPHUB_CART_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:9090".to_string());
    Url::parse(&raw).expect("valid cart base URL")
}

fn test_credentials() -> (String, String) {
    (
        std::env::var("SHOPHUB_TEST_USERNAME").unwrap_or_else(|_| "testuser".to_string()),
        std::env::var("SHOPHUB_TEST_PASSWORD").unwrap_or_else(|_| "testpassword".to_string()),
    )
}

#[tokio::test]
#[ignore = "Requires running products service"]
async fn test_product_list_parses() {
    let client = ProductsClient::new(&products_base_url());

    let products = client
        .get_all_products()
        .await
        .expect("Failed to fetch products");

    // A seeded catalog has at least one product with a name.
    assert!(!products.is_empty());
    assert!(!products[0].product_name.is_empty());
}

#[tokio::test]
#[ignore = "Requires running products service"]
async fn test_product_by_id_roundtrip() {
    let client = ProductsClient::new(&products_base_url());

    let products = client
        .get_all_products()
        .await
        .expect("Failed to fetch products");
    let first = products.first().expect("seeded catalog is empty");

    let fetched = client
        .get_product_by_id(first.id)
        .await
        .expect("Failed to fetch product by id");
    assert_eq!(fetched.id, first.id);
}

#[tokio::test]
#[ignore = "Requires running cart service and a seeded test account"]
async fn test_login_and_fetch_server_cart() {
    let auth = AuthClient::new(&cart_base_url());
    let cart = CartClient::new(&cart_base_url());
    let (username, password) = test_credentials();

    let login = auth
        .login(&username, &password)
        .await
        .expect("Failed to log in test account");

    let token = secrecy::SecretString::from(login.token);
    let records = cart
        .find_all_for_user(&token, login.userid)
        .await
        .expect("Failed to fetch server cart");

    let count = cart
        .total_count(&token, login.userid)
        .await
        .expect("Failed to fetch cart count");

    assert_eq!(records.len() as i64, count);
}
