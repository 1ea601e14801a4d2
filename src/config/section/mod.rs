//! Configuration sections.
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[serve]`   | HTTP front end (interface, port, URL prefix)    |
//! | `[runtime]` | Debug API, gzip, CSS rewriting                  |
//! | `[cache]`   | Capacity, refresh periods, fill policy, ETags   |
//! | `[model]`   | Group model file and resource base directory    |

mod cache;
mod model;
mod runtime;
mod serve;

pub use cache::CacheConfig;
pub use model::ModelConfig;
pub use runtime::RuntimeConfig;
pub use serve::ServeConfig;
