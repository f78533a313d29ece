//! 测试公共工具：本地图片 CDN 和样例数据

#![allow(dead_code)]

use axum::body::Body;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;

/// 图片内容大小，超过一个写入块
pub const IMAGE_BYTES: usize = 10_000;

/// 启动本地图片 CDN
///
/// - `/media/photo.jpg` 返回图片
/// - `/missing/photo.jpg` 返回 404
pub async fn start_cdn() -> SocketAddr {
    let app = Router::new()
        .route(
            "/media/photo.jpg",
            get(|| async { (StatusCode::OK, vec![0xABu8; IMAGE_BYTES]) }),
        )
        .route(
            "/missing/photo.jpg",
            get(|| async { StatusCode::NOT_FOUND }),
        );

    serve(app).await
}

/// 在随机端口上启动一个 HTTP 服务
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// 分 `chunks` 次、每次间隔 `delay` 返回 `byte` 填充的 4096 字节块
pub fn slow_body(byte: u8, chunks: usize, delay: Duration) -> Body {
    let stream = futures::stream::unfold(0, move |sent| async move {
        if sent == chunks {
            return None;
        }
        tokio::time::sleep(delay).await;
        Some((Ok::<_, std::io::Error>(vec![byte; 4096]), sent + 1))
    });
    Body::from_stream(stream)
}

/// 一个地点、一条评论，每个 URL 一张图片（裸 `url` 候选）
pub fn bare_url_output(image_urls: &[String]) -> Value {
    let images: Vec<Value> = image_urls.iter().map(|u| json!({"url": u})).collect();
    json!([{
        "name": "Tiger Hill",
        "placeType": "attraction",
        "url": "https://example.com/tiger-hill",
        "reviews": [{"username": "traveller", "images": images}]
    }])
}

pub fn inputs(save_images: bool) -> Value {
    json!({"keyword": "darjeeling", "saveImages": save_images, "maxPlaces": 1, "maxReviews": 1})
}

/// 一个地点、一条评论、一张图片
pub fn one_image_output(image_url: &str) -> Value {
    json!([{
        "name": "Tiger Hill",
        "placeType": "attraction",
        "placeLocation": "Darjeeling",
        "url": "https://example.com/tiger-hill",
        "placeCoords": {"lat": 27.0, "lng": 88.3},
        "reviews": [{
            "username": "traveller",
            "rating": 5,
            "text": "sunrise over Kanchenjunga",
            "images": [{"480w": image_url}]
        }]
    }])
}

pub fn files_with_ext(dir: &Path, ext: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().path())
                .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(ext))
                .collect()
        })
        .unwrap_or_default()
}
