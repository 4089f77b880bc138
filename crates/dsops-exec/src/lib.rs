pub mod command;
pub mod error;
pub mod render;
pub mod secure_buffer;
mod template;

pub use command::{build_env, build_env_from_secure_buffers, check_dangerous, mask, run, ExecRequest, ValidationWarning};
pub use error::{CommandError, RenderError};
pub use render::{render_to_file, validate_output_path, RenderFormat, RenderRequest};
pub use secure_buffer::{LockedBuffer, SecureBuffer};
