//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_FE_FUSION` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no subscriber is installed.
//! - **Enabled**: Any other value installs a `fmt` subscriber with a maximum level of `DEBUG`.
//!
//! Data-quality warnings (possibly numerical features, unseen categories, enforced dtypes)
//! are emitted at `WARN`; fitted parameters are traced at `DEBUG`.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_FE_FUSION=true
//! ```

use ctor::ctor;
use tracing::Level;

const DEBUG_ENV_VAR: &str = "DEBUG_FE_FUSION";

fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false")))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
