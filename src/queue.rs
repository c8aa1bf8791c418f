//! Pending-request intake queue.
//!
//! The interception layer enqueues one [`NewRecord`] per matching request;
//! the analysis layer lists pending records and marks each one processed once
//! it is done with it. Delivery is at-least-once: concurrent consumers may see
//! the same pending record, which is why `mark_processed` is idempotent.
//!
//! Re-exports:
//! - [`Queue`]: the public API, generic over its storage [`Backend`].
//! - [`MemoryQueue`], [`FileQueue`], [`DatabaseQueue`]: the bundled variants.
//!
//! Example:
//! ```
//! use intake_queue::queue::MemoryQueue;
//! use intake_queue::storage::{MemoryAdapter, MemoryBackend, NewRecord};
//!
//! let queue = MemoryQueue::with_adapter(MemoryBackend::new(), MemoryAdapter::new("intake"));
//! let id = queue.enqueue(NewRecord::new("127.0.0.1").with_field("POST", "test", "foo"))?;
//! assert_eq!(queue.get_pending()?.len(), 1);
//! queue.mark_processed(&id)?;
//! assert!(queue.get_pending()?.is_empty());
//! # Ok::<(), intake_queue::error_handling::QueueError>(())
//! ```
//!
//! [`NewRecord`]: crate::storage::NewRecord
//! [`Backend`]: crate::storage::Backend

pub mod intake_queue;

pub use intake_queue::{DatabaseQueue, FileQueue, MemoryQueue, Queue};
