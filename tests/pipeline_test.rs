mod common;

use axum::routing::get;
use axum::Router;
use common::{bare_url_output, files_with_ext, one_image_output, serve, slow_body, start_cdn, IMAGE_BYTES};
use review_exporter::services::ImageFetcher;
use review_exporter::{
    logger, AppError, Config, DownloadError, ImageSession, JobFlow, JobOutcome, JobRequest,
};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn request(save_images: bool) -> JobRequest {
    JobRequest {
        keyword: "darjeeling".to_string(),
        save_images,
        max_places: 1,
        max_reviews: 1,
    }
}

fn flow(output_root: &std::path::Path) -> JobFlow {
    JobFlow::new(Config {
        output_root: output_root.to_path_buf(),
        max_concurrent_downloads: 2,
        ..Config::default()
    })
}

#[tokio::test]
async fn test_fetch_saves_image_under_path_name() {
    logger::init();
    let cdn = start_cdn().await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ImageFetcher::new(ImageSession::new().unwrap(), dir.path());

    let file_name = assert_ok!(
        fetcher
            .fetch(&format!("http://{}/media/photo.jpg?w=2400&h=-1", cdn))
            .await
    );

    assert_eq!(file_name, "media-photo.jpg");
    let bytes = std::fs::read(dir.path().join(&file_name)).unwrap();
    assert_eq!(bytes.len(), IMAGE_BYTES);
}

#[tokio::test]
async fn test_fetch_non_success_status_is_download_error() {
    let cdn = start_cdn().await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ImageFetcher::new(ImageSession::new().unwrap(), dir.path());

    let err = assert_err!(fetcher.fetch(&format!("http://{}/missing/photo.jpg", cdn)).await);

    assert!(matches!(err, DownloadError::BadStatus { .. }));
    assert!(!dir.path().join("missing-photo.jpg").exists());
}

#[tokio::test]
async fn test_fetch_write_failure_is_download_error() {
    let cdn = start_cdn().await;
    let dir = tempfile::tempdir().unwrap();
    // 图片目录不存在，写文件会失败
    let fetcher = ImageFetcher::new(ImageSession::new().unwrap(), dir.path().join("absent"));

    let err = assert_err!(fetcher.fetch(&format!("http://{}/media/photo.jpg", cdn)).await);

    assert!(matches!(err, DownloadError::Write { .. }));
}

#[tokio::test]
async fn test_job_downloads_reachable_image() {
    logger::init();
    let cdn = start_cdn().await;
    let root = tempfile::tempdir().unwrap();
    let output = one_image_output(&format!("http://{}/media/photo.jpg?w=480&h=270", cdn));

    let outcome = flow(root.path())
        .run(request(true), output.as_array().cloned().unwrap())
        .await;

    let JobOutcome::Complete(report) = outcome else {
        panic!("任务应该成功");
    };
    assert_eq!(report.reviews, 1);
    assert_eq!(report.images, 1);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed_downloads, 0);
    assert_eq!(report.image_rows[0].file_name, "media-photo.jpg");
    assert_eq!(
        report.image_rows[0].url,
        Some(format!("http://{}/media/photo.jpg?w=2400&h=-1", cdn))
    );

    let job_dir = root.path().join("darjeeling");
    assert!(job_dir.join("images").join("media-photo.jpg").exists());
    assert_eq!(files_with_ext(&job_dir, "json").len(), 1);
    assert_eq!(files_with_ext(&job_dir, "xlsx").len(), 1);
}

#[tokio::test]
async fn test_unreachable_image_does_not_fail_job() {
    let cdn = start_cdn().await;
    let root = tempfile::tempdir().unwrap();
    let output = one_image_output(&format!("http://{}/missing/photo.jpg?w=480", cdn));

    let outcome = flow(root.path())
        .run(request(true), output.as_array().cloned().unwrap())
        .await;

    let JobOutcome::Complete(report) = outcome else {
        panic!("图片下载失败不应导致任务失败");
    };
    assert_eq!(report.downloaded, 0);
    assert_eq!(report.failed_downloads, 1);
    assert_eq!(report.image_rows.len(), 1);
    assert_eq!(report.image_rows[0].file_name, "");
    assert!(report.artifact.unwrap().exists());

    let image_dir = root.path().join("darjeeling").join("images");
    assert!(image_dir.is_dir());
    assert_eq!(std::fs::read_dir(&image_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_repeated_jobs_get_distinct_files() {
    let root = tempfile::tempdir().unwrap();
    let output = one_image_output("https://cdn.example/p.jpg");
    let records = output.as_array().cloned().unwrap();

    let first = flow(root.path()).run(request(false), records.clone()).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = flow(root.path()).run(request(false), records).await;

    assert!(first.is_complete());
    assert!(second.is_complete());
    let job_dir = root.path().join("darjeeling");
    assert_eq!(files_with_ext(&job_dir, "json").len(), 2);
    assert_eq!(files_with_ext(&job_dir, "xlsx").len(), 2);
}

#[tokio::test]
async fn test_colliding_file_names_never_mix_bodies() {
    let slow = serve(Router::new().route(
        "/img.jpg",
        get(|| async { slow_body(0xAA, 4, Duration::from_millis(50)) }),
    ))
    .await;
    let fast = serve(Router::new().route("/img.jpg", get(|| async { vec![0xBBu8; 10] }))).await;

    let root = tempfile::tempdir().unwrap();
    let output = bare_url_output(&[
        format!("http://{}/img.jpg", slow),
        format!("http://{}/img.jpg", fast),
    ]);

    let outcome = flow(root.path())
        .run(request(true), output.as_array().cloned().unwrap())
        .await;

    let JobOutcome::Complete(report) = outcome else {
        panic!("任务应该成功");
    };
    assert_eq!(report.downloaded, 2);
    assert!(report.image_rows.iter().all(|row| row.file_name == "img.jpg"));

    // 只剩最终文件，内容是其中一次下载的完整内容
    let image_dir = root.path().join("darjeeling").join("images");
    assert_eq!(std::fs::read_dir(&image_dir).unwrap().count(), 1);
    let bytes = std::fs::read(image_dir.join("img.jpg")).unwrap();
    let slow_bytes = vec![0xAAu8; 4 * 4096];
    let fast_bytes = vec![0xBBu8; 10];
    assert!(bytes == slow_bytes || bytes == fast_bytes, "文件内容混杂: {} 字节", bytes.len());
}

#[tokio::test]
async fn test_replay_archive_reproduces_job() {
    let root = tempfile::tempdir().unwrap();
    let output = one_image_output("https://cdn.example/p.jpg?w=480");

    let JobOutcome::Complete(first) = flow(root.path())
        .run(request(false), output.as_array().cloned().unwrap())
        .await
    else {
        panic!("任务应该成功");
    };

    let replay_root = tempfile::tempdir().unwrap();
    let JobOutcome::Complete(replayed) = flow(replay_root.path()).replay(&first.archive).await else {
        panic!("重放应该成功");
    };

    assert_eq!(replayed.reviews, first.reviews);
    assert_eq!(replayed.images, first.images);
    assert_eq!(replayed.image_rows[0].url, first.image_rows[0].url);
    let job_dir = replay_root.path().join("darjeeling");
    assert_eq!(files_with_ext(&job_dir, "json").len(), 1);
    assert_eq!(files_with_ext(&job_dir, "xlsx").len(), 1);
}

#[tokio::test]
async fn test_replay_missing_archive_is_error() {
    let root = tempfile::tempdir().unwrap();

    let outcome = flow(root.path())
        .replay(&root.path().join("absent.json"))
        .await;

    assert!(matches!(outcome, JobOutcome::Error(AppError::Io { .. })));
}
