//! Shared helpers for the integration tests

#![allow(dead_code)]

use modelcheck::{check, CheckError, CheckOptions, Model, Object, Value};
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; `RUST_LOG=modelcheck=trace`
/// shows every pipeline stage.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn data(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// An object built from pairs, for values JSON cannot express.
pub fn object<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    Value::Object(pairs.into_iter().collect::<Object>())
}

/// Check with the default options.
pub fn run(payload: &Value, model: &Model) -> Result<Value, CheckError> {
    run_with(payload, model, CheckOptions::default())
}

pub fn run_with(payload: &Value, model: &Model, options: CheckOptions) -> Result<Value, CheckError> {
    init_tracing();
    let mut payload = payload.clone();
    check(&mut payload, model, &options)
}

pub fn error_message(payload: &Value, model: &Model) -> String {
    run(payload, model)
        .expect_err("check should fail")
        .to_string()
}
