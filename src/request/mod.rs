//! Request model and key codec
//!
//! The history core only sees opaque string keys. This module defines the
//! request values the crawl engine hands in, and the codec that turns them
//! into keys and back.

mod codec;

pub use codec::{decode_request, failure_key, spider_name_of, success_key};

use serde::{Deserialize, Serialize};

/// Anything that identifies a fetch by URL and HTTP method
pub trait Record {
    fn url(&self) -> &str;
    fn method(&self) -> &str;
}

/// A crawl request, as owned by one spider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the spider that issued the request
    pub spider: String,

    /// Rule within the spider that handles the response
    #[serde(default)]
    pub rule: String,

    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub priority: i32,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Request {
    /// Creates a GET request for the given spider
    pub fn new(spider: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            spider: spider.into(),
            rule: String::new(),
            url: url.into(),
            method: default_method(),
            priority: 0,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Record for Request {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> &str {
        &self.method
    }
}
