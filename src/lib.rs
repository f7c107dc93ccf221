// src/lib.rs

pub mod audio;
pub mod capture;
pub mod config;
pub mod dsp;
pub mod editor;
pub mod render;
pub mod scope;
pub mod telemetry;

pub use capture::{CaptureProcessor, SharedCapture};
pub use config::ScopeConfig;
pub use editor::{FileView, ScopeEditor, TickReport};
pub use render::{ColouredScope, ScopeFrame};
pub use scope::{FileSource, LiveSource, ScopeSource};
