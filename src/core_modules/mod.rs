pub mod blur;
pub mod edge_detector;
pub mod grayscale;
pub mod histogram;
pub mod params;
pub mod pixel_buffer;
