use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Restaurant as returned by `GET /restaurants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cuisine_type: Option<String>,
    pub rating: Option<f64>,
    pub total_reviews: Option<i32>,
    pub average_delivery_time: Option<i32>,
    pub price_range: Option<String>,
    pub is_open: Option<bool>,
    pub is_vegetarian_only: Option<bool>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub logo_url: Option<String>,
    pub image_urls: Option<String>,
    pub is_active: Option<bool>,
    pub is_currently_open: Option<bool>,
    pub distance: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Menu item as returned by `GET /restaurants/{id}/menu`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    pub id: i64,
    pub restaurant_id: Option<i64>,
    pub restaurant_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub dietary_tag: Option<String>,
    pub is_available: Option<bool>,
    pub image_url: Option<String>,
    pub order_count: Option<i32>,
    pub is_active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Query parameters accepted by `GET /restaurants`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}
