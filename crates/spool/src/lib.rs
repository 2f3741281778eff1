//! Spool upload server library.
//!
//! This library exposes the HTTP host modules for testing purposes.
//! The main entry point is the `spool` binary.

pub mod body;
pub mod dispatch;
pub mod upload;

pub use body::{BodyReader, BoxError};
pub use dispatch::{Dispatcher, Handler, HealthHandler, RequestContext};
pub use upload::{render_uploads, status_for, UploadHandler};
