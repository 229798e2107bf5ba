pub mod accessibility;
pub mod metrics;

pub use accessibility::Grade;
pub use metrics::{QualityMetrics, brightness, contrast, contrast_ratio, sharpness};
