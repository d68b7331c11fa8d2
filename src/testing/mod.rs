//! Testing utilities
//!
//! In-process request scenarios for the full router: no listener, cookies
//! carried by hand from one response to the next.
//!
//! # Example
//!
//! ```rust,ignore
//! use roomstay::testing;
//!
//! #[tokio::test]
//! async fn test_home() {
//!     let router = App::new(state).into_test_router().unwrap();
//!
//!     testing::get(router, "/")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_contains("Home, welcome!");
//! }
//! ```

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, delete, get, post, put};
