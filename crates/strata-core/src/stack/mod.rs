pub mod build;
pub mod mean;
pub mod sigma_clip;

pub use build::Stack;
