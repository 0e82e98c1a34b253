// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    sync::Arc,
    time::Duration,
};

use crate::{
    Router,
    TemplateRenderer,
    TlsContext,
};

#[derive(Clone)]
pub struct PortiereConfig {
    /// When present, every connection starts with a TLS handshake.
    pub tls: Option<TlsContext>,

    pub settings: PortiereSettings,
}

impl PortiereConfig {
    pub fn new(settings: PortiereSettings) -> Self {
        Self {
            tls: None,
            settings,
        }
    }

    pub fn with_tls(mut self, tls: TlsContext) -> Self {
        self.tls = Some(tls);
        self
    }
}

#[derive(Clone)]
pub struct PortiereSettings {
    pub router: Arc<Router>,

    pub template_renderer: Option<Arc<dyn TemplateRenderer>>,

    /// If the client doesn't transmit the full request-line and headers within
    /// this time, the request is terminated.
    pub read_headers_timeout: Duration,

    /// If the client doesn't transmit the full body within
    /// this time, the request is terminated.
    pub read_body_timeout: Duration,

    /// Request bodies larger than this are rejected with `413 Content Too
    /// Large`.
    pub maximum_body_size: u64,

    pub maximum_line_length: usize,

    pub maximum_header_count: usize,
}

impl PortiereSettings {
    pub fn with_router(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            ..Default::default()
        }
    }
}

impl Default for PortiereSettings {
    fn default() -> Self {
        Self {
            router: Arc::new(Router::new()),
            template_renderer: None,
            read_headers_timeout: Duration::from_secs(45),
            read_body_timeout: Duration::from_secs(60),
            maximum_body_size: 16 * 1024 * 1024,
            maximum_line_length: 8 * 1024,
            maximum_header_count: 100,
        }
    }
}
