pub mod cloudinary;
pub mod db;
pub mod mapbox;
pub mod memory;

pub use cloudinary::CloudinaryImageStore;
pub use db::DbAdapter;
pub use mapbox::MapboxGeocoder;
pub use memory::MemoryStore;
