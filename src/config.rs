//! Process-scope configuration flags: whether credentials and statement
//! text are sent base64-wrapped, and the advertised image type. These
//! affect every [`crate::Connection`] in the process, not just one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

static LOGIN_USE_BASE64: AtomicBool = AtomicBool::new(true);
static STATEMENT_USE_BASE64: AtomicBool = AtomicBool::new(true);

/// Whether `LOGIN` sends credentials base64-wrapped. Default: `true`.
pub fn login_use_base64() -> bool {
    LOGIN_USE_BASE64.load(Ordering::Relaxed)
}

/// Sets whether `LOGIN` sends credentials base64-wrapped.
pub fn set_login_use_base64(value: bool) {
    LOGIN_USE_BASE64.store(value, Ordering::Relaxed);
}

/// Whether `PREPARE-STATEMENT`/`EXECUTE-STATEMENT` send the SQL text
/// base64-wrapped. Default: `true`.
pub fn statement_use_base64() -> bool {
    STATEMENT_USE_BASE64.load(Ordering::Relaxed)
}

/// Sets whether `PREPARE-STATEMENT`/`EXECUTE-STATEMENT` send the SQL text
/// base64-wrapped.
pub fn set_statement_use_base64(value: bool) {
    STATEMENT_USE_BASE64.store(value, Ordering::Relaxed);
}

/// Returns the image type advertised in LOGIN's `PREFERRED-IMAGE-TYPES`.
/// Default: `"png"`.
pub fn default_image_type() -> String {
    image_type_storage()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone()
}

/// Sets the image type advertised in LOGIN's `PREFERRED-IMAGE-TYPES`.
pub fn set_default_image_type<S: Into<String>>(value: S) {
    *image_type_storage()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner) = value.into();
}

fn image_type_storage() -> &'static Mutex<String> {
    static STORAGE: std::sync::OnceLock<Mutex<String>> = std::sync::OnceLock::new();
    STORAGE.get_or_init(|| Mutex::new("png".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert!(login_use_base64());
        assert!(statement_use_base64());
        assert_eq!(default_image_type(), "png");
    }

    #[test]
    fn set_and_restore() {
        set_default_image_type("jpeg");
        assert_eq!(default_image_type(), "jpeg");
        set_default_image_type("png");
        assert_eq!(default_image_type(), "png");
    }
}
