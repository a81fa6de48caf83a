pub mod channels;

pub use channels::{admission_queue, AdmissionQueue, QueueConsumer, MAX_QUEUE_CAPACITY, MIN_QUEUE_CAPACITY};
