pub mod sidecar;

pub use sidecar::{BookSidecar, render_sidecar, write_sidecar};
