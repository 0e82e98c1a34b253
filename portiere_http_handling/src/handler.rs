// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use async_trait::async_trait;

use portiere_http::{
    Request,
    Response,
};

pub type HandlerResult = Result<Response, anyhow::Error>;

/// Application code that produces the response for the requests of a route.
///
/// Dependencies of a handler are given to it when it is constructed, the
/// server only ever sees the `Arc<dyn Handler>`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request) -> HandlerResult;
}

#[async_trait]
impl<F> Handler for F
        where F: Fn(&Request) -> HandlerResult + Send + Sync {
    async fn handle(&self, request: &Request) -> HandlerResult {
        (self)(request)
    }
}
