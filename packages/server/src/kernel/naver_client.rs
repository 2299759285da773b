use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{BaseProductFetcher, FetchFailure, FetchOutcome, FetchSort, SkippedItem};
use crate::common::utils::{clean_html_text, parse_price};
use crate::domains::products::models::Product;

pub const DEFAULT_BASE_URL: &str = "https://openapi.naver.com";

const SHOP_SEARCH_PATH: &str = "/v1/search/shop.json";
const MAX_DISPLAY: u32 = 100;
const CATEGORY_FIELDS: [&str; 4] = ["category1", "category2", "category3", "category4"];

/// Naver Shopping search API client
pub struct NaverFetcher {
    client_id: String,
    client_secret: String,
    base_url: String,
    client: reqwest::Client,
}

/// Shopping search query string
#[derive(Debug, Serialize)]
struct ShopSearchParams<'a> {
    query: &'a str,
    display: u32,
    start: u32,
    sort: &'static str,
}

/// Shopping search response. Items stay as raw JSON so one malformed entry
/// only costs that entry.
#[derive(Debug, Deserialize)]
struct ShopSearchResponse {
    #[serde(default)]
    items: Vec<Value>,
}

impl NaverFetcher {
    pub fn new(
        client_id: String,
        client_secret: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client_id,
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn request(&self, params: &ShopSearchParams<'_>) -> FetchOutcome {
        let url = format!("{}{}", self.base_url, SHOP_SEARCH_PATH);

        let response = match self
            .client
            .get(&url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(params)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return FetchOutcome::failed(FetchFailure::Transport(e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return FetchOutcome::failed(FetchFailure::Unauthorized);
        }
        if !status.is_success() {
            return FetchOutcome::failed(FetchFailure::Status(status.as_u16()));
        }

        let body: ShopSearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => return FetchOutcome::failed(FetchFailure::Decode(e.to_string())),
        };

        map_items(body.items)
    }
}

#[async_trait]
impl BaseProductFetcher for NaverFetcher {
    async fn fetch(
        &self,
        query: &str,
        display: u32,
        start: u32,
        sort: FetchSort,
    ) -> FetchOutcome {
        let params = ShopSearchParams {
            query,
            display: display.clamp(1, MAX_DISPLAY),
            start: start.max(1),
            sort: sort.as_str(),
        };

        let outcome = self.request(&params).await;

        match &outcome.failure {
            Some(FetchFailure::Unauthorized) => {
                warn!(query = %query, "Shopping API authentication failed, check client id/secret");
            }
            Some(failure) => {
                warn!(query = %query, error = %failure, "Shopping API search failed");
            }
            None => {
                debug!(
                    query = %query,
                    products = outcome.products.len(),
                    skipped = outcome.skipped.len(),
                    "Shopping API search complete"
                );
            }
        }

        outcome
    }
}

fn map_items(items: Vec<Value>) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for (index, item) in items.iter().enumerate() {
        match product_from_item(item) {
            Ok(product) => outcome.products.push(product),
            Err(reason) => {
                warn!(index, reason = %reason, "Skipping shopping API item");
                outcome.skipped.push(SkippedItem { index, reason });
            }
        }
    }

    outcome
}

fn product_from_item(item: &Value) -> std::result::Result<Product, String> {
    let obj = item
        .as_object()
        .ok_or_else(|| "item is not a JSON object".to_string())?;

    let id = raw_field(obj, "productId");
    if id.trim().is_empty() {
        return Err("missing productId".to_string());
    }

    let price = parse_price(&raw_field(obj, "lprice"));
    if !price.is_finite() || price > Product::MAX_PRICE {
        return Err(format!("price {} out of storable range", price));
    }

    let mut categories = Vec::new();
    for field in CATEGORY_FIELDS {
        let category = clean_html_text(&raw_field(obj, field));
        if category.is_empty() {
            break;
        }
        categories.push(category);
    }

    Ok(Product {
        id: id.trim().to_string(),
        name: clean_html_text(&raw_field(obj, "title")),
        price,
        image_url: raw_field(obj, "image"),
        url: raw_field(obj, "link"),
        mall_name: clean_html_text(&raw_field(obj, "mallName")),
        product_type: raw_field(obj, "productType"),
        maker: clean_html_text(&raw_field(obj, "maker")),
        categories,
    })
}

/// Read a field as text. The API is loose about types (`lprice` and
/// `productType` show up as both strings and numbers).
fn raw_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
