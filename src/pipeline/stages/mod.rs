//! Concrete model stages
//!
//! The closed set of capabilities the coordinator can drive. Each stage is
//! independent and unaware of the others; they share only the conversion
//! helpers and the [`CompiledModel`](crate::pipeline::model::CompiledModel)
//! seam.

pub mod classifier;
pub mod restyler;
pub mod speech;
pub mod text_reader;

pub use classifier::{Classifier, default_labels};
pub use restyler::Restyler;
pub use speech::SpeechRecognizer;
pub use text_reader::TextReader;
