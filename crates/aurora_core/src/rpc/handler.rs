use super::RpcError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

type RespondFn = Box<dyn FnOnce(Vec<u8>) + Send>;

/// Untyped response continuation. Either carries a sink for the encoded
/// response or is the explicit fire-and-forget marker.
pub struct Responder {
    sink: Option<RespondFn>,
}

impl Responder {
    pub fn new<F>(sink: F) -> Self
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        Self {
            sink: Some(Box::new(sink)),
        }
    }

    /// Marker for calls that expect no response.
    pub fn noop() -> Self {
        Self { sink: None }
    }

    pub fn is_noop(&self) -> bool {
        self.sink.is_none()
    }

    pub fn respond(self, payload: Vec<u8>) {
        if let Some(sink) = self.sink {
            sink(payload);
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Typed response continuation handed to method handlers.
///
/// Dropping a `Done` without completing it sends nothing, which is how
/// handlers decline to answer.
pub struct Done<R> {
    responder: Responder,
    _response: PhantomData<fn(R)>,
}

impl<R: prost::Message> Done<R> {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            _response: PhantomData,
        }
    }

    pub fn noop() -> Self {
        Self::new(Responder::noop())
    }

    pub fn is_noop(&self) -> bool {
        self.responder.is_noop()
    }

    pub fn complete(self, response: &R) {
        self.responder.respond(response.encode_to_vec());
    }
}

impl<R> fmt::Debug for Done<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("response", &std::any::type_name::<R>())
            .field("noop", &self.responder.is_noop())
            .finish()
    }
}

/// Object-safe form of a registered method.
#[async_trait]
pub trait MethodHandler<C>: Send + Sync + 'static {
    /// Decodes `payload` and runs the method.
    async fn invoke(&self, ctx: C, payload: &[u8], responder: Responder) -> Result<(), RpcError>;

    fn request_type(&self) -> &'static str;
}

/// Adapts an async function over decoded messages into a [`MethodHandler`].
pub struct TypedMethod<Req, Resp, F> {
    handler: F,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F> TypedMethod<Req, Resp, F> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _types: PhantomData,
        }
    }
}

#[async_trait]
impl<C, Req, Resp, F, Fut> MethodHandler<C> for TypedMethod<Req, Resp, F>
where
    C: Send + 'static,
    Req: prost::Message + Default + 'static,
    Resp: prost::Message + 'static,
    F: Fn(C, Req, Done<Resp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RpcError>> + Send,
{
    async fn invoke(&self, ctx: C, payload: &[u8], responder: Responder) -> Result<(), RpcError> {
        let request = Req::decode(payload)?;
        (self.handler)(ctx, request, Done::new(responder)).await
    }

    fn request_type(&self) -> &'static str {
        std::any::type_name::<Req>()
    }
}
