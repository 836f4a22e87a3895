pub mod consts;
pub mod error;
pub mod tile;
pub mod mask;
pub mod validate;
pub mod io;
pub mod stack;
pub mod pipeline;
