pub mod discover;
pub mod geotiff;
pub mod geotiff_writer;
pub mod preview;
