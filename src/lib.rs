//! A log follower library that pushes every line appended to a file to a subscriber.
//!
//! A follow polls the file on a fixed interval, survives truncation and
//! replacement (log rotation), and stops for good when the file is missing or
//! cannot be read. Lines can be indexed, transformed and windowed before they
//! reach the subscriber, and each subscription can be disposed at any time.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_follower::follow;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stream = follow("app.log").indexed().into_stream()?;
//!
//!     while let Some(line) = stream.next().await {
//!         match line {
//!             Ok((index, content)) => println!("{}: {}", index, content),
//!             Err(e) => eprintln!("Error: {}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod follow;
mod operators;
mod source;
mod stream;
mod subscription;
mod tail;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_SEPARATOR, FollowConfig, Schedule};
pub use error::{BoxError, Error, Result};
pub use operators::{Indexed, Window};
pub use stream::LogStream;
pub use subscription::{Observer, Subscription};
pub use tail::Tail;

use std::path::Path;

/// Starts describing a follow of `path`.
///
/// Relative paths are resolved against the working directory when the follow
/// is subscribed.
///
/// # Example
///
/// ```rust,no_run
/// use log_follower::follow;
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut stream = follow("app.log").window(5)?.into_stream()?;
///
///     while let Some(window) = stream.next().await {
///         println!("Last lines: {:?}", window?);
///     }
///
///     Ok(())
/// }
/// ```
pub fn follow<P: AsRef<Path>>(path: P) -> Tail<String> {
    Tail::new(path)
}
