pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod exception;
pub mod handler;
pub mod param;
pub mod reply;
pub mod request;
pub mod response;
pub mod router;
pub mod sink;
pub mod util;

pub use config::Config;
pub use dispatcher::{response_handler, transmit, Dispatcher, Handler, Transport};
pub use envelope::{
    Body, Cause, Envelope, ErrorDescriptor, Json, Render, INTERNAL_SERVER_ERROR,
    INTERNAL_SERVER_ERROR_JSON,
};
pub use exception::Exception;
pub use handler::{DescriptionPolicy, JsonType, Registry, RegistryBuilder, TypeHandler};
pub use param::{HttpRequestMethod, HttpVersion};
pub use reply::{Payload, Reply};
pub use request::{Context, Param, Params, Request};
pub use response::HttpResponse;
pub use router::Router;
pub use sink::{Event, LogSink, Sink};
pub use util::{severity, status_text};
