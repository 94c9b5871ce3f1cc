pub mod compute;
pub mod error;
pub mod media;
pub mod metadata;
pub mod reference;
pub mod task;

pub use compute::*;
pub use error::{CloudError, Result};
pub use media::*;
pub use metadata::*;
pub use reference::*;
pub use task::*;
