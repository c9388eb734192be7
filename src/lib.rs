pub mod benchmark;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod invoker;
pub mod json_repair;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod prompt;
pub mod sink;
pub mod validator;

pub use benchmark::{benchmark, sort_rows, BenchmarkMetric, BenchmarkRow};
pub use builder::{ExtractionRequest, ExtractionRequestBuilder};
pub use config::{AppConfig, RetryConfig};
pub use error::{ErrorKind, ExtractError, FieldViolation};
pub use invoker::{
    BackendInvoker, CannedTransport, HttpTransport, InvocationMetrics, RawResponse, RetryPolicy,
    Transport,
};
pub use json_repair::{extract_json, BraceBalance};
pub use model::{Dish, Ingredient, SchemaPolicy};
pub use normalizer::{normalize, NormalizedEnvelope, ResponseShape};
pub use pipeline::{DishExtractor, Extraction};
pub use prompt::{build_request, route, BackendFamily, BackendRequest, ImageInput, PromptVersion};
pub use sink::{ResultSink, StdoutSink};
pub use validator::validate;
