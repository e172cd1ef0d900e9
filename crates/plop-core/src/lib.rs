//! plop-core: shared vocabulary for the plop content-addressed store
//!
//! - `error`: the workspace-wide error taxonomy
//! - `types`: content addresses and boxed (external) object names
//! - `zbase32`: the text encoding used for keys and object names

pub mod error;
pub mod types;
pub mod zbase32;

pub use error::{Error, Result};
pub use types::{BoxedName, ContentAddress, ADDRESS_SIZE};
