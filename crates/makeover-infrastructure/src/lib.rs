pub mod config_service;
pub mod image_files;
pub mod paths;
pub mod secret_service;

pub use crate::config_service::ConfigService;
pub use crate::image_files::{load_image, load_images, save_artifact};
pub use crate::paths::{MakeoverPaths, PathError};
pub use crate::secret_service::SecretServiceImpl;
