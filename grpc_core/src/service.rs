//! Handler registration and routing.
//!
//! Handlers are a tagged sum of the four RPC arities rather than a
//! protocol-polymorphism hierarchy. A [`Service`] is just a name plus a
//! routing table from method name to [`Handler`].

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream as FuturesStream;

use crate::context::CallContext;
use crate::status::Status;

pub type BoxStream<T> = Pin<Box<dyn FuturesStream<Item = Result<T, Status>> + Send>>;

/// The four RPC shapes a handler can implement, tagged by arity rather
/// than by a trait-object hierarchy per method kind.
#[async_trait]
pub trait Handler<Req, Resp>: Send + Sync
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn unary(&self, _ctx: &mut CallContext, _request: Req) -> Result<Resp, Status> {
        Err(Status::new(crate::status::Code::Unimplemented, "unary not implemented"))
    }

    async fn client_streaming(
        &self,
        _ctx: &mut CallContext,
        _requests: BoxStream<Req>,
    ) -> Result<Resp, Status> {
        Err(Status::new(
            crate::status::Code::Unimplemented,
            "client streaming not implemented",
        ))
    }

    async fn server_streaming(
        &self,
        _ctx: &mut CallContext,
        _request: Req,
    ) -> Result<BoxStream<Resp>, Status> {
        Err(Status::new(
            crate::status::Code::Unimplemented,
            "server streaming not implemented",
        ))
    }

    async fn bidi_streaming(
        &self,
        _ctx: &mut CallContext,
        _requests: BoxStream<Req>,
    ) -> Result<BoxStream<Resp>, Status> {
        Err(Status::new(
            crate::status::Code::Unimplemented,
            "bidi streaming not implemented",
        ))
    }
}

/// A type-erased entry point into a registered handler, keyed by method
/// name within a [`Service`]. Concrete codec types are resolved by the
/// call orchestrator, which knows the method's request/response types;
/// this table only routes by name.
pub struct MethodEntry {
    pub name: String,
    pub kind: crate::method::MethodKind,
}

/// A named collection of methods. Applications build one `Service` per
/// `.proto` service and register it with a server; the server dispatches
/// incoming calls by `/{service}/{method}` path.
pub struct Service {
    name: String,
    methods: HashMap<String, MethodEntry>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, method: impl Into<String>, kind: crate::method::MethodKind) {
        let method = method.into();
        self.methods.insert(
            method.clone(),
            MethodEntry { name: method, kind },
        );
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodEntry> {
        self.methods.values()
    }
}

/// A collection of [`Service`]s a server exposes, routed by fully
/// qualified service name.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, service: Service) {
        self.services.insert(service.name().to_string(), service);
    }

    pub fn get(&self, service_name: &str) -> Option<&Service> {
        self.services.get(service_name)
    }

    /// Resolves a `/{service}/{method}` wire path to its registered
    /// [`MethodEntry`], returning `unimplemented` if either the service or
    /// the method is unknown.
    pub fn resolve(&self, path: &str) -> Result<&MethodEntry, Status> {
        let (service_name, method_name) = crate::method::MethodDescriptor::parse_path(path)
            .ok_or_else(|| Status::new(crate::status::Code::Unimplemented, "malformed method path"))?;
        let service = self.services.get(&service_name).ok_or_else(|| {
            Status::new(crate::status::Code::Unimplemented, format!("service {service_name} not found"))
        })?;
        service.method(&method_name).ok_or_else(|| {
            Status::new(
                crate::status::Code::Unimplemented,
                format!("method {method_name} not found on service {service_name}"),
            )
        })
    }
}
