pub mod image_session;

pub use image_session::ImageSession;
