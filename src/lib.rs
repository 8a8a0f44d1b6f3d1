//! AutoSky: builds a Source engine 3D skybox from the `AutoSky` visgroup of a VMF map

pub mod error;
pub mod geom;
pub mod replace;
pub mod service;
pub mod settings;
pub mod sky;
pub mod vmf;

pub use error::{Error, Result};
