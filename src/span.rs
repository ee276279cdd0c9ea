use actix::prelude::*;
use async_trait::async_trait;
use tracing::Span;

/// Message with span used for trace logging
pub struct SpanMessage<I> {
    pub msg: I,
    pub span: Span,
}

impl<M> SpanMessage<M> {
    pub fn new(msg: M) -> Self {
        Self {
            msg,
            span: Span::current(),
        }
    }
}

impl<M, R: 'static> Message for SpanMessage<M>
where
    M: Message<Result = R>,
{
    type Result = R;
}

#[async_trait]
pub trait AsyncSpanHandler<M>
where
    Self: Actor,
    M: Message + Send + 'static,
{
    async fn handle(msg: M) -> <M as Message>::Result;
}

/// Handles the wrapped message inside the caller's span. The actor handles
/// no other message until the returned future has completed.
#[macro_export]
macro_rules! span_message_atomic_impl {
    ($message_type:ident, $actor:ident) => {
        impl actix::Handler<$crate::span::SpanMessage<$message_type>> for $actor {
            type Result = actix::AtomicResponse<Self, <$message_type as actix::Message>::Result>;
            fn handle(
                &mut self,
                msg: $crate::span::SpanMessage<$message_type>,
                _ctx: &mut actix::Context<Self>,
            ) -> Self::Result {
                use actix_interop::FutureInterop;
                use tracing_futures::Instrument;
                let $crate::span::SpanMessage { span, msg } = msg;
                actix::AtomicResponse::new(
                    <Self as $crate::span::AsyncSpanHandler<$message_type>>::handle(msg)
                        .instrument(span)
                        .interop_actor_boxed(self),
                )
            }
        }
    };
}

#[macro_export]
macro_rules ! atomic_message_handler_with_span {
    (impl AsyncSpanHandler<$M:ident> for $A:ident $t:tt) => {
        $crate::span_message_atomic_impl!($M, $A);
        #[async_trait::async_trait]
        impl $crate::span::AsyncSpanHandler<$M> for $A
            $t

    }
}
