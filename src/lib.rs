pub mod cache;
pub mod clock;
pub mod decode;
pub mod fade;
pub mod listing;
pub mod loader;
pub mod preload;
pub mod res_cache;
pub mod session;
pub mod settings;
