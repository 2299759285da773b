//! Test fixtures for products, upstream payloads and images.

use std::sync::Arc;

use reindeer_core::domains::products::Product;
use reindeer_core::kernel::{BaseImageStore, BaseProductFetcher, BaseProductStore, ServerDeps};
use serde_json::{json, Value};

/// A product with predictable field values
pub fn sample_product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price: 15900.0,
        image_url: format!("https://img.example.com/{}.jpg", id),
        url: format!("https://shop.example.com/products/{}", id),
        mall_name: "테스트몰".to_string(),
        product_type: "1".to_string(),
        maker: "Acme".to_string(),
        categories: vec!["디지털/가전".to_string(), "노트북".to_string()],
    }
}

/// One item as the shopping API returns it
pub fn upstream_item(id: &str, title: &str, image: &str) -> Value {
    json!({
        "title": title,
        "link": format!("https://search.shopping.naver.com/gate.nhn?id={}", id),
        "image": image,
        "lprice": "1,299,000",
        "hprice": "",
        "mallName": "네이버",
        "productId": id,
        "productType": "1",
        "brand": "",
        "maker": "삼성전자",
        "category1": "디지털/가전",
        "category2": "노트북",
        "category3": "",
        "category4": ""
    })
}

/// Full shopping API response body
pub fn upstream_body(items: Vec<Value>) -> Value {
    json!({
        "lastBuildDate": "Mon, 01 Jan 2024 00:00:00 +0900",
        "total": items.len(),
        "start": 1,
        "display": items.len(),
        "items": items
    })
}

/// A small PNG: white backdrop with a dark square in the middle
pub fn sample_png() -> Vec<u8> {
    use image::{ImageBuffer, ImageEncoder, Rgba, RgbaImage};

    let mut img: RgbaImage = ImageBuffer::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
    for y in 2..6 {
        for x in 2..6 {
            img.put_pixel(x, y, Rgba([20, 20, 20, 255]));
        }
    }

    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), 8, 8, image::ExtendedColorType::Rgba8)
        .expect("Failed to encode fixture PNG");
    buf
}

pub fn deps_with(
    fetcher: Arc<dyn BaseProductFetcher>,
    product_store: Arc<dyn BaseProductStore>,
    image_store: Arc<dyn BaseImageStore>,
) -> Arc<ServerDeps> {
    Arc::new(ServerDeps::new(fetcher, product_store, image_store))
}
