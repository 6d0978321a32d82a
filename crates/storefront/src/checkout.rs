//! Checkout flow: shipping/payment validation and order building.
//!
//! The order payload is built from the local cart lines - what the shopper
//! sees is what gets ordered, even if the server cart has drifted. Placing
//! an order requires an authenticated session; the view maps
//! [`CheckoutError::NotAuthenticated`] to a sign-in redirect.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shophub_core::{OrderStatus, ProductId, UserId};

use crate::auth::AuthIdentity;
use crate::cart::{CartEngine, CartLineItem};
use crate::services::{ApiError, OrdersClient};

/// Flat shipping fee applied to every order.
const SHIPPING_AMOUNT: Decimal = Decimal::from_parts(1000, 0, 0, false, 2); // 10.00

/// Shipping address collected at checkout.
#[derive(Debug, Clone, Default)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub postal_code: String,
    pub house_no: String,
    pub area: String,
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Payment method collected at checkout.
///
/// Validated locally, never sent to the order service - payment capture
/// happens out of band.
#[derive(Debug, Clone)]
pub enum Payment {
    CashOnDelivery,
    Card {
        number: String,
        expiry: String,
        cvv: String,
    },
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No active session; the view redirects to sign-in.
    #[error("sign in required to place an order")]
    NotAuthenticated,

    /// A required address field is empty.
    #[error("please complete the address fields")]
    IncompleteAddress,

    /// Card payment selected but card fields are empty.
    #[error("please complete the card details")]
    IncompleteCardDetails,

    /// Order service error; the cart is preserved.
    #[error("order service error: {0}")]
    Api(#[from] ApiError),
}

/// One order line in the payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl From<&CartLineItem> for OrderItem {
    fn from(line: &CartLineItem) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.base_price,
            total_price: line.line_total(),
        }
    }
}

/// The `createOrderFromCart` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_amount: Decimal,
    pub shipping_fullname: String,
    pub shipping_phone: String,
    pub shipping_pincode: String,
    pub shipping_house_no: String,
    pub shipping_area: String,
    pub shipping_landmark: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_country: String,
    pub order_items: Vec<OrderItem>,
}

/// Validate the checkout form.
///
/// Required address fields: full name, house number, city, postal code. Card
/// payments additionally require every card field.
///
/// # Errors
///
/// Returns `IncompleteAddress` or `IncompleteCardDetails` accordingly.
pub fn validate(address: &ShippingAddress, payment: &Payment) -> Result<(), CheckoutError> {
    let required = [
        &address.full_name,
        &address.house_no,
        &address.city,
        &address.postal_code,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(CheckoutError::IncompleteAddress);
    }

    if let Payment::Card {
        number,
        expiry,
        cvv,
    } = payment
        && (number.trim().is_empty() || expiry.trim().is_empty() || cvv.trim().is_empty())
    {
        return Err(CheckoutError::IncompleteCardDetails);
    }

    Ok(())
}

/// Build the order payload from the local cart.
///
/// The total is the sum of the line totals, so the payload is internally
/// consistent regardless of server cart drift.
#[must_use]
pub fn build_order(
    identity: &AuthIdentity,
    lines: &[CartLineItem],
    address: &ShippingAddress,
) -> OrderRequest {
    let order_items: Vec<OrderItem> = lines.iter().map(OrderItem::from).collect();
    let total_amount: Decimal = order_items.iter().map(|item| item.total_price).sum();

    OrderRequest {
        user_id: identity.id,
        order_number: generate_order_number(),
        status: OrderStatus::Pending,
        total_amount,
        shipping_amount: SHIPPING_AMOUNT,
        shipping_fullname: address.full_name.clone(),
        shipping_phone: address.phone.clone(),
        shipping_pincode: address.postal_code.clone(),
        shipping_house_no: address.house_no.clone(),
        shipping_area: address.area.clone(),
        shipping_landmark: address.landmark.clone(),
        shipping_city: address.city.clone(),
        shipping_state: address.state.clone(),
        shipping_country: address.country.clone(),
        order_items,
    }
}

/// Validate, build, and submit an order; clear the cart on success.
///
/// The cart is cleared only after the service confirms the order - any
/// failure leaves it intact for another attempt.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session, a validation error for an
/// incomplete form, or `Api` if the service rejects the order.
pub async fn place_order(
    engine: &mut CartEngine,
    orders: &OrdersClient,
    identity: Option<&AuthIdentity>,
    address: &ShippingAddress,
    payment: &Payment,
) -> Result<String, CheckoutError> {
    let identity = identity.ok_or(CheckoutError::NotAuthenticated)?;
    validate(address, payment)?;

    let order = build_order(identity, engine.lines(), address);
    orders
        .create_order_from_cart(identity.bearer_token(), &order)
        .await?;

    engine.clear_cart();
    tracing::info!(order_number = %order.order_number, "Order placed");

    Ok(order.order_number)
}

/// Client-generated order number: timestamp plus a short random suffix.
fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::rng().random_range(0..10_000);
    format!("ORD-{millis}{suffix:04}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Meera Iyer".to_string(),
            phone: "9999999999".to_string(),
            postal_code: "560001".to_string(),
            house_no: "12B".to_string(),
            area: "MG Road".to_string(),
            landmark: String::new(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            country: "India".to_string(),
        }
    }

    fn line(product_id: i64, price_cents: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            product_id: ProductId::new(product_id),
            product_name: format!("product-{product_id}"),
            image_url: None,
            base_price: Decimal::new(price_cents, 2),
            quantity,
        }
    }

    fn identity() -> AuthIdentity {
        AuthIdentity::for_tests(55, "meera", "jwt.here")
    }

    #[test]
    fn test_validate_requires_core_address_fields() {
        let mut incomplete = address();
        incomplete.city = String::new();

        assert!(matches!(
            validate(&incomplete, &Payment::CashOnDelivery),
            Err(CheckoutError::IncompleteAddress)
        ));
        assert!(validate(&address(), &Payment::CashOnDelivery).is_ok());
    }

    #[test]
    fn test_validate_optional_fields_may_be_empty() {
        let mut sparse = address();
        sparse.phone = String::new();
        sparse.area = String::new();
        sparse.state = String::new();
        sparse.country = String::new();

        assert!(validate(&sparse, &Payment::CashOnDelivery).is_ok());
    }

    #[test]
    fn test_validate_card_requires_card_fields() {
        let card = Payment::Card {
            number: "4111111111111111".to_string(),
            expiry: "12/27".to_string(),
            cvv: String::new(),
        };

        assert!(matches!(
            validate(&address(), &card),
            Err(CheckoutError::IncompleteCardDetails)
        ));
    }

    #[test]
    fn test_build_order_totals_and_items() {
        let lines = vec![line(1, 999, 2), line(2, 450, 1)];
        let order = build_order(&identity(), &lines, &address());

        assert_eq!(order.user_id, UserId::new(55));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(2448, 2)); // 19.98 + 4.50
        assert_eq!(order.shipping_amount, Decimal::new(1000, 2));
        assert_eq!(order.order_items.len(), 2);
        assert_eq!(order.order_items[0].total_price, Decimal::new(1998, 2));
        assert!(order.order_number.starts_with("ORD-"));
    }

    #[test]
    fn test_order_request_wire_shape() {
        let order = build_order(&identity(), &[line(1, 999, 2)], &address());
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["userId"], 55);
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["shippingPincode"], "560001");
        assert_eq!(value["shippingHouseNo"], "12B");
        assert_eq!(value["orderItems"][0]["productId"], 1);
        assert_eq!(value["orderItems"][0]["unitPrice"], 9.99);
        assert_eq!(value["orderItems"][0]["totalPrice"], 19.98);
        assert_eq!(value["totalAmount"], 19.98);
        assert_eq!(value["shippingAmount"], 10.0);
    }
}
