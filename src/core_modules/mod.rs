pub mod blob_detector;
pub mod color_mask;
pub mod controller;
pub mod frame;
pub mod moment;
pub mod pixel;
pub mod smart_blob;
pub mod target_detector;
pub mod target_state;
pub mod velocity;
