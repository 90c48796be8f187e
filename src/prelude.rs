//! The types most programs on this runtime need.
//!
//! ```
//! use cat_breeds::prelude::*;
//! ```

pub use crate::application::Application;
pub use crate::command::{Action, Command};
pub use crate::runtime::Runtime;
pub use crate::subscription::Subscription;
pub use crate::subscription::query::{Query, QueryClient, QueryKey, QueryResult, QueryState};
