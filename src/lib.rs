pub mod collaborators;
pub mod config;
pub mod domain_utils;
pub mod image_analyzer;
pub mod sender_analyzer;
pub mod signal;
pub mod text_analyzer;
pub mod vision;

pub use config::DetectionConfig;
pub use image_analyzer::{ImageCollaborators, ImageSignalEngine};
pub use sender_analyzer::SenderIdentityAnalyzer;
pub use signal::{combine, merge_strongest, RiskLevel, Signal, SignalResult};
pub use text_analyzer::TextSignalEngine;
