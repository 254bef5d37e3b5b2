//! Domain methods for the dashboard API client.

use async_trait::async_trait;
use fooddash_core::models::{
    AuthResponse, LoginRequest, MenuItemResponse, OrderResponse, PlaceOrderRequest,
    RegisterRequest, RestaurantQuery, RestaurantResponse, UserResponse,
};
use fooddash_core::{AuthApi, TransportError};

use crate::{decode_json, ApiClient};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";

fn restaurant_query_pairs(query: &RestaurantQuery) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(cuisine) = &query.cuisine_type {
        pairs.push(("cuisineType", cuisine.clone()));
    }
    if let Some(page) = query.page {
        pairs.push(("page", page.to_string()));
    }
    if let Some(size) = query.size {
        pairs.push(("size", size.to_string()));
    }
    pairs
}

#[async_trait]
impl AuthApi for ApiClient {
    /// Login never presents a stored credential, so a 401 here means bad
    /// credentials rather than an expired session.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, TransportError> {
        let http = self.client.post(self.build_url(LOGIN_PATH)).json(request);
        let response = self.execute_anonymous(http, LOGIN_PATH).await?;
        decode_json(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, TransportError> {
        let http = self.client.post(self.build_url(REGISTER_PATH)).json(request);
        let response = self.execute_anonymous(http, REGISTER_PATH).await?;
        decode_json(response).await
    }
}

impl ApiClient {
    /// List restaurants with optional filters.
    pub async fn list_restaurants(
        &self,
        query: &RestaurantQuery,
    ) -> Result<Vec<RestaurantResponse>, TransportError> {
        self.get("/restaurants", &restaurant_query_pairs(query))
            .await
    }

    pub async fn get_restaurant(&self, id: i64) -> Result<RestaurantResponse, TransportError> {
        self.get(&format!("/restaurants/{}", id), &[]).await
    }

    /// Menu of a restaurant.
    pub async fn get_menu(&self, restaurant_id: i64) -> Result<Vec<MenuItemResponse>, TransportError> {
        self.get(&format!("/restaurants/{}/menu", restaurant_id), &[])
            .await
    }

    pub async fn create_order(
        &self,
        order: &PlaceOrderRequest,
    ) -> Result<OrderResponse, TransportError> {
        self.post_json("/orders", order).await
    }

    /// Orders placed by the logged-in user.
    pub async fn my_orders(&self) -> Result<Vec<OrderResponse>, TransportError> {
        self.get("/orders/my-orders", &[]).await
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderResponse, TransportError> {
        self.get(&format!("/orders/{}", id), &[]).await
    }

    /// Per-restaurant analytics. The payload shape is owned by the server.
    pub async fn restaurant_analytics(
        &self,
        restaurant_id: i64,
    ) -> Result<serde_json::Value, TransportError> {
        self.get(&format!("/analytics/restaurant/{}", restaurant_id), &[])
            .await
    }

    pub async fn system_analytics(&self) -> Result<serde_json::Value, TransportError> {
        self.get("/analytics/system", &[]).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, TransportError> {
        self.get("/users", &[]).await
    }

    pub async fn get_user(&self, id: i64) -> Result<UserResponse, TransportError> {
        self.get(&format!("/users/{}", id), &[]).await
    }

    /// Delete a previously uploaded file.
    pub async fn delete_file(&self, folder: &str, filename: &str) -> Result<(), TransportError> {
        self.delete(&format!(
            "/files/{}/{}",
            urlencoding::encode(folder),
            urlencoding::encode(filename)
        ))
        .await
    }
}
