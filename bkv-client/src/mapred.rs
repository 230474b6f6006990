//! # Map-Reduce Query Builder
//!
//! Purpose: Build map-reduce queries fluently and compile them to the JSON
//! document the cluster executes.
//!
//! ## Design Principles
//! 1. **Fluent Setup**: Phases are configured through setup closures, so a
//!    query reads top-to-bottom like the pipeline it describes.
//! 2. **Compile Late**: Nothing is serialized until `compile`; the builder
//!    holds plain data until then.
//! 3. **Explicit Keep**: `keep` defaults to true only for the final phase,
//!    matching what the cluster streams back.

use serde_json::{json, Map, Value};
use thiserror::Error;

use bkv_common::Request;

use crate::keyfilter::KeyFilter;

/// Content type for compiled queries.
pub const MAPRED_CONTENT_TYPE: &str = "application/json";

/// Rejected query shapes, caught at compile time rather than on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapRedError {
    #[error("map-reduce query has no inputs")]
    MissingInputs,
    #[error("{0} phase has no function")]
    MissingFunction(&'static str),
}

#[derive(Debug, Clone)]
enum MapRedInputs {
    Bucket(String),
    Keys(Vec<(String, String)>),
}

#[derive(Debug, Clone, Copy)]
enum PhaseKind {
    Map,
    Reduce,
}

impl PhaseKind {
    fn key(self) -> &'static str {
        match self {
            PhaseKind::Map => "map",
            PhaseKind::Reduce => "reduce",
        }
    }
}

#[derive(Debug, Clone)]
enum PhaseSpec {
    Js(PhaseKind, JsPhase),
    Erlang(PhaseKind, ErlangPhase),
}

impl PhaseSpec {
    fn to_json(&self, default_keep: bool) -> Result<Value, MapRedError> {
        match self {
            PhaseSpec::Js(kind, phase) => phase.to_json(*kind, default_keep),
            PhaseSpec::Erlang(kind, phase) => phase.to_json(*kind, default_keep),
        }
    }
}

/// A JavaScript map or reduce phase under construction.
#[derive(Debug, Clone, Default)]
pub struct JsPhase {
    function: Option<JsFunction>,
    keep: Option<bool>,
    arg: Option<Value>,
}

#[derive(Debug, Clone)]
enum JsFunction {
    Source(String),
    Named(String),
    Stored { bucket: String, key: String },
}

impl JsPhase {
    /// Inline JavaScript source for the phase function.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.function = Some(JsFunction::Source(source.into()));
        self
    }

    /// A built-in function referenced by name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.function = Some(JsFunction::Named(name.into()));
        self
    }

    /// A function stored in the cluster under bucket/key.
    pub fn stored(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.function = Some(JsFunction::Stored {
            bucket: bucket.into(),
            key: key.into(),
        });
        self
    }

    /// Whether this phase's output is streamed back to the client.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = Some(keep);
        self
    }

    /// Static argument passed to every invocation of the phase function.
    pub fn arg(mut self, arg: Value) -> Self {
        self.arg = Some(arg);
        self
    }

    fn to_json(&self, kind: PhaseKind, default_keep: bool) -> Result<Value, MapRedError> {
        let mut body = Map::new();
        body.insert("language".to_string(), json!("javascript"));
        match &self.function {
            None => return Err(MapRedError::MissingFunction("javascript")),
            Some(JsFunction::Source(source)) => {
                body.insert("source".to_string(), json!(source));
            }
            Some(JsFunction::Named(name)) => {
                body.insert("name".to_string(), json!(name));
            }
            Some(JsFunction::Stored { bucket, key }) => {
                body.insert("bucket".to_string(), json!(bucket));
                body.insert("key".to_string(), json!(key));
            }
        }
        body.insert("keep".to_string(), json!(self.keep.unwrap_or(default_keep)));
        if let Some(arg) = &self.arg {
            body.insert("arg".to_string(), arg.clone());
        }
        Ok(wrap_phase(kind, body))
    }
}

/// An Erlang map or reduce phase under construction.
#[derive(Debug, Clone, Default)]
pub struct ErlangPhase {
    module: Option<String>,
    function: Option<String>,
    keep: Option<bool>,
    arg: Option<Value>,
}

impl ErlangPhase {
    /// Module and function implementing the phase.
    pub fn module_function(mut self, module: impl Into<String>, function: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self.function = Some(function.into());
        self
    }

    /// Whether this phase's output is streamed back to the client.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = Some(keep);
        self
    }

    /// Static argument passed to every invocation of the phase function.
    pub fn arg(mut self, arg: Value) -> Self {
        self.arg = Some(arg);
        self
    }

    fn to_json(&self, kind: PhaseKind, default_keep: bool) -> Result<Value, MapRedError> {
        let (module, function) = match (&self.module, &self.function) {
            (Some(module), Some(function)) => (module, function),
            _ => return Err(MapRedError::MissingFunction("erlang")),
        };
        let mut body = Map::new();
        body.insert("language".to_string(), json!("erlang"));
        body.insert("module".to_string(), json!(module));
        body.insert("function".to_string(), json!(function));
        body.insert("keep".to_string(), json!(self.keep.unwrap_or(default_keep)));
        if let Some(arg) = &self.arg {
            body.insert("arg".to_string(), arg.clone());
        }
        Ok(wrap_phase(kind, body))
    }
}

fn wrap_phase(kind: PhaseKind, body: Map<String, Value>) -> Value {
    let mut phase = Map::new();
    phase.insert(kind.key().to_string(), Value::Object(body));
    Value::Object(phase)
}

/// Map-reduce query under construction.
#[derive(Debug, Clone, Default)]
pub struct MapReduceQuery {
    inputs: Option<MapRedInputs>,
    phases: Vec<PhaseSpec>,
    filters: Vec<KeyFilter>,
}

impl MapReduceQuery {
    pub fn new() -> Self {
        MapReduceQuery::default()
    }

    /// Feeds every key of a bucket into the first phase.
    pub fn inputs_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.inputs = Some(MapRedInputs::Bucket(bucket.into()));
        self
    }

    /// Feeds explicit bucket/key pairs into the first phase.
    pub fn inputs_keys<I, B, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (B, K)>,
        B: Into<String>,
        K: Into<String>,
    {
        self.inputs = Some(MapRedInputs::Keys(
            pairs
                .into_iter()
                .map(|(bucket, key)| (bucket.into(), key.into()))
                .collect(),
        ));
        self
    }

    /// Restricts bucket inputs with a key-filter token.
    pub fn filter(mut self, filter: KeyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Appends a JavaScript map phase.
    pub fn map_js(mut self, setup: impl FnOnce(JsPhase) -> JsPhase) -> Self {
        self.phases
            .push(PhaseSpec::Js(PhaseKind::Map, setup(JsPhase::default())));
        self
    }

    /// Appends a JavaScript reduce phase.
    pub fn reduce_js(mut self, setup: impl FnOnce(JsPhase) -> JsPhase) -> Self {
        self.phases
            .push(PhaseSpec::Js(PhaseKind::Reduce, setup(JsPhase::default())));
        self
    }

    /// Appends an Erlang map phase.
    pub fn map_erlang(mut self, setup: impl FnOnce(ErlangPhase) -> ErlangPhase) -> Self {
        self.phases
            .push(PhaseSpec::Erlang(PhaseKind::Map, setup(ErlangPhase::default())));
        self
    }

    /// Appends an Erlang reduce phase.
    pub fn reduce_erlang(mut self, setup: impl FnOnce(ErlangPhase) -> ErlangPhase) -> Self {
        self.phases
            .push(PhaseSpec::Erlang(PhaseKind::Reduce, setup(ErlangPhase::default())));
        self
    }

    /// Compiles the query to its JSON document.
    pub fn compile(&self) -> Result<String, MapRedError> {
        Ok(self.compile_value()?.to_string())
    }

    /// Builds the wire request carrying the compiled query.
    pub fn to_request(&self) -> Result<Request, MapRedError> {
        Ok(Request::MapRed {
            content_type: MAPRED_CONTENT_TYPE.as_bytes().to_vec(),
            request: self.compile()?.into_bytes(),
        })
    }

    fn compile_value(&self) -> Result<Value, MapRedError> {
        let inputs = match &self.inputs {
            None => return Err(MapRedError::MissingInputs),
            Some(MapRedInputs::Bucket(bucket)) => json!(bucket),
            Some(MapRedInputs::Keys(pairs)) => Value::Array(
                pairs
                    .iter()
                    .map(|(bucket, key)| json!([bucket, key]))
                    .collect(),
            ),
        };

        let mut doc = Map::new();
        doc.insert("inputs".to_string(), inputs);
        if !self.filters.is_empty() {
            doc.insert(
                "key_filters".to_string(),
                Value::Array(self.filters.iter().map(KeyFilter::to_json).collect()),
            );
        }

        let last = self.phases.len().saturating_sub(1);
        let query = self
            .phases
            .iter()
            .enumerate()
            .map(|(idx, phase)| phase.to_json(idx == last))
            .collect::<Result<Vec<_>, _>>()?;
        doc.insert("query".to_string(), Value::Array(query));

        Ok(Value::Object(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_bucket_query_with_phases() {
        let query = MapReduceQuery::new()
            .inputs_bucket("users")
            .map_js(|phase| phase.source("function(v) { return [v]; }"))
            .reduce_erlang(|phase| phase.module_function("bkv_mapreduce", "reduce_count"));

        let compiled: Value = serde_json::from_str(&query.compile().unwrap()).unwrap();
        assert_eq!(
            compiled,
            json!({
                "inputs": "users",
                "query": [
                    {"map": {
                        "language": "javascript",
                        "source": "function(v) { return [v]; }",
                        "keep": false
                    }},
                    {"reduce": {
                        "language": "erlang",
                        "module": "bkv_mapreduce",
                        "function": "reduce_count",
                        "keep": true
                    }}
                ]
            })
        );
    }

    #[test]
    fn explicit_keep_overrides_default() {
        let query = MapReduceQuery::new()
            .inputs_bucket("b")
            .map_js(|phase| phase.name("Bkv.mapValuesJson").keep(true))
            .reduce_js(|phase| phase.name("Bkv.reduceSum").keep(false));

        let compiled: Value = serde_json::from_str(&query.compile().unwrap()).unwrap();
        assert_eq!(compiled["query"][0]["map"]["keep"], json!(true));
        assert_eq!(compiled["query"][1]["reduce"]["keep"], json!(false));
    }

    #[test]
    fn compiles_key_inputs_and_filters() {
        let query = MapReduceQuery::new()
            .inputs_keys(vec![("users", "ada"), ("users", "grace")])
            .filter(KeyFilter::StartsWith("a".to_string()))
            .map_js(|phase| phase.source("function(v) { return [1]; }"));

        let compiled: Value = serde_json::from_str(&query.compile().unwrap()).unwrap();
        assert_eq!(compiled["inputs"], json!([["users", "ada"], ["users", "grace"]]));
        assert_eq!(compiled["key_filters"], json!([["starts_with", "a"]]));
    }

    #[test]
    fn stored_js_function_compiles_to_bucket_key() {
        let query = MapReduceQuery::new()
            .inputs_bucket("b")
            .map_js(|phase| phase.stored("functions", "my_map").arg(json!(3)));

        let compiled: Value = serde_json::from_str(&query.compile().unwrap()).unwrap();
        assert_eq!(
            compiled["query"][0]["map"],
            json!({
                "language": "javascript",
                "bucket": "functions",
                "key": "my_map",
                "keep": true,
                "arg": 3
            })
        );
    }

    #[test]
    fn missing_inputs_is_an_error() {
        let query = MapReduceQuery::new().map_js(|phase| phase.name("Bkv.mapValues"));
        assert_eq!(query.compile(), Err(MapRedError::MissingInputs));
    }

    #[test]
    fn js_phase_without_function_is_an_error() {
        let query = MapReduceQuery::new().inputs_bucket("b").map_js(|phase| phase);
        assert_eq!(query.compile(), Err(MapRedError::MissingFunction("javascript")));
    }
}
