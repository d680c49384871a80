pub mod application;
pub mod config;
pub mod controller;
pub mod demo;
pub mod dispatcher;
pub mod exception;
pub mod handler;
pub mod headers;
pub mod interceptors;
pub mod param;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
pub mod sink;
pub mod util;

pub use application::{Application, Component};
pub use config::Config;
pub use controller::{Controller, Controllers};
pub use exception::Exception;
pub use handler::{Handler, HandlerResult, MatchResult, ParamValue, Params};
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use pipeline::{from_fn, Interceptor, Next, Runner};
pub use request::Request;
pub use response::Response;
pub use router::{Route, Router};
pub use sink::{ExceptionHandler, ExceptionSink, Output};
pub use util::HtmlBuilder;
