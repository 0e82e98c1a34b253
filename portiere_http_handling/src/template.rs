// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use portiere_http::{
    Response,
    TemplateValues,
};

/// Renders the named templates of `Response::template` responses. The
/// templating engine itself is supplied by the embedder.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, values: &TemplateValues) -> Result<Response, anyhow::Error>;
}
