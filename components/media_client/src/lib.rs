mod client;
mod controller;
mod error;
mod progress;
mod quality;

pub use client::{disposition_filename, RelayApi, RelayClient, Transfer};
pub use controller::{Controller, Phase, SavedMedia};
pub use error::ClientError;
pub use progress::{Progress, TransferSession};
pub use quality::{quality_options, resolution_number, selector_for};
