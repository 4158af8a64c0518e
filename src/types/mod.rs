pub mod bounding_box;
pub mod file_names;
pub mod period;
pub mod request;
