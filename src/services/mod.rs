//! Service layer

pub mod io;

pub use io::ImageIOService;
