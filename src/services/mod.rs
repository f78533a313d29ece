pub mod archive_writer;
pub mod image_fetcher;
pub mod image_resolver;
pub mod tabulator;
pub mod workbook_writer;

pub use image_fetcher::ImageFetcher;
