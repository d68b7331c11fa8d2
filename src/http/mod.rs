//! HTTP plumbing shared by the middleware layers.
//!
//! Cookie parsing/building and urlencoded form buffering.

pub mod cookies;
pub mod form;

pub use cookies::{append_set_cookie, get_cookie, strict_cookie};
pub use form::{FormFields, buffer_body, is_urlencoded, read_form};
