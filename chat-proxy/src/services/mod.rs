pub mod metrics;
pub mod providers;

pub use self::metrics::{get_metrics, init_metrics};
pub use providers::{CompletionProvider, GenerationParams, ProviderError};
