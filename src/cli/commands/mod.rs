mod serve;
mod transform;

pub use serve::execute_serve;
pub use transform::{execute_transform, transform_reader};
