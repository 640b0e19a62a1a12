mod classifier;
mod counts;

pub use classifier::ProtectionClassifier;
pub use counts::protection_counts;
