pub mod semaphore;
pub mod shutdown;

// Re-export commonly used types
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use shutdown::ShutdownSignal;
