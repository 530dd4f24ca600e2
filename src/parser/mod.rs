pub mod filename;
pub mod media;

pub use filename::parse_filename;
pub use media::extract_media_info;
