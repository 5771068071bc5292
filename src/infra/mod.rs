//! Concrete clients for the TfL and Threads HTTP APIs.

pub mod tfl {
    pub mod client;
    pub use client::TflClient;
}

pub mod threads {
    pub mod client;
    pub use client::{MAX_POST_CHARS, ThreadsClient, truncate_post};
}
