pub mod model;
pub mod yaml_config;

pub use model::*;
pub use yaml_config::{from_file, from_reader, from_yaml_str};
