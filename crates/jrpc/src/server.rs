//! Line-delimited JSON-RPC server.
//!
//! Each line of the input stream holds exactly one request. Requests are
//! dispatched in the order they are read and every response is written as a
//! single line followed by a flush, so a host reading the output line by line
//! never observes a partial message.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::protocol::{Request, Response, RpcError};
use crate::ServerError;

/// Callable registered under a method name.
///
/// Receives the request `params` (`null` when omitted) and returns the
/// JSON value placed in the response `result`.
pub type Handler = Arc<dyn Fn(Value) -> Result<Value, RpcError> + Send + Sync>;

/// Contract between a plugin controller and the engine that moves requests
/// and responses over the wire.
pub trait Transport: Send + Sync {
    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`ServerError::DuplicateMethod`] if the name is taken.
    fn register(&self, name: &str, handler: Handler) -> Result<(), ServerError>;

    /// Removes the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`ServerError::UnknownMethod`] if nothing is registered.
    fn unregister(&self, name: &str) -> Result<(), ServerError>;

    /// Answers requests for `name` even when they carry no `id`.
    ///
    /// Such requests are answered with a `null` id. Transports that never
    /// drop id-less requests can keep the default.
    fn reply_without_id(&self, _name: &str) {}

    /// Serves requests from `input` until it is exhausted.
    fn run(&self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<(), ServerError>;
}

/// Default [`Transport`] backed by an in-memory method table.
#[derive(Default)]
pub struct Server {
    handlers: RwLock<HashMap<String, Handler>>,
    always_reply: RwLock<HashSet<String>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a handler is registered under `name`.
    pub fn has_method(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Lists registered method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn replies_without_id(&self, name: &str) -> bool {
        self.always_reply
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(name)
    }

    /// Handles one raw input line.
    ///
    /// Returns `None` for blank lines and notifications. A request without
    /// an `id` is a notification unless its method was marked with
    /// [`Transport::reply_without_id`].
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "unparseable request");
                return Some(Response::failure(Value::Null, RpcError::parse_error(err)));
            }
        };
        let id = raw.get("id").cloned();
        let request: Request = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "malformed request");
                return Some(Response::failure(
                    id.unwrap_or(Value::Null),
                    RpcError::invalid_request(err),
                ));
            }
        };
        let notification =
            request.is_notification() && !self.replies_without_id(&request.method);
        let outcome = self.dispatch(&request.method, request.params);
        if notification {
            if let Err(err) = outcome {
                debug!(method = %request.method, error = %err, "notification failed");
            }
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);
        Some(match outcome {
            Ok(result) => Response::success(id, result),
            Err(err) => Response::failure(id, err),
        })
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        // The table lock is released before the handler runs so handlers may
        // register or remove methods themselves.
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(method)
            .cloned();
        let Some(handler) = handler else {
            warn!(method, "request for unknown method");
            return Err(RpcError::method_not_found(method));
        };
        trace!(method, "dispatching");
        match catch_unwind(AssertUnwindSafe(|| handler(params))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "handler panicked".to_string()
                };
                error!(method, error = %msg, "handler panicked");
                Err(RpcError::internal(msg))
            }
        }
    }
}

impl Transport for Server {
    fn register(&self, name: &str, handler: Handler) -> Result<(), ServerError> {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if handlers.contains_key(name) {
            return Err(ServerError::DuplicateMethod(name.to_string()));
        }
        handlers.insert(name.to_string(), handler);
        debug!(method = name, "handler registered");
        Ok(())
    }

    fn unregister(&self, name: &str) -> Result<(), ServerError> {
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name);
        self.always_reply
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name);
        match removed {
            Some(_) => {
                debug!(method = name, "handler removed");
                Ok(())
            }
            None => Err(ServerError::UnknownMethod(name.to_string())),
        }
    }

    fn reply_without_id(&self, name: &str) {
        self.always_reply
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string());
    }

    fn run(&self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<(), ServerError> {
        debug!("transport loop started");
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            if let Some(response) = self.handle_line(&line) {
                serde_json::to_writer(&mut *output, &response)?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
        }
        debug!("input closed, transport loop finished");
        Ok(())
    }
}
