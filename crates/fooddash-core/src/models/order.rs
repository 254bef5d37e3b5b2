use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i64,
    pub menu_item_id: Option<i64>,
    pub item_name: String,
    pub item_price: f64,
    pub quantity: i32,
    pub subtotal: f64,
    pub special_instructions: Option<String>,
}

/// Order as returned by `GET /orders/{id}` and `GET /orders/my-orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub restaurant_id: Option<i64>,
    pub restaurant_name: Option<String>,
    pub status: String,
    pub subtotal: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub tax: Option<f64>,
    pub discount: Option<f64>,
    pub total_amount: f64,
    pub delivery_address: Option<String>,
    pub special_instructions: Option<String>,
    pub delivery_partner_id: Option<i64>,
    pub delivery_partner_name: Option<String>,
    pub estimated_delivery_time: Option<NaiveDateTime>,
    pub actual_delivery_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub order_items: Vec<OrderItemResponse>,
    pub ordered_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderItem {
    pub menu_item_id: i64,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub restaurant_id: i64,
    pub items: Vec<PlaceOrderItem>,
    pub delivery_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}
