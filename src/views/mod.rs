//! HTML rendering. Handlers build a view model (one struct per page, see
//! [`models`]) and hand it to [`Views::render`]; templates never see
//! database rows directly.

pub mod models;

use anyhow::Context;
use axum::response::Html;
use serde::Serialize;
use tera::Tera;

use crate::error::AppError;

/// A view model bound to the template that renders it.
pub trait Page: Serialize {
    const TEMPLATE: &'static str;
}

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("login.html", include_str!("../../templates/login.html")),
            ("register.html", include_str!("../../templates/register.html")),
            ("todos.html", include_str!("../../templates/todos.html")),
            ("support.html", include_str!("../../templates/support.html")),
            ("ticket.html", include_str!("../../templates/ticket.html")),
            ("admin.html", include_str!("../../templates/admin.html")),
            ("admin_user_edit.html", include_str!("../../templates/admin_user_edit.html")),
            ("admin_todo_edit.html", include_str!("../../templates/admin_todo_edit.html")),
        ])
        .context("load templates")?;
        Ok(Self { tera })
    }

    pub fn render<P: Page>(&self, page: &P) -> Result<Html<String>, AppError> {
        let ctx = tera::Context::from_serialize(page).context("build template context")?;
        let html = self
            .tera
            .render(P::TEMPLATE, &ctx)
            .with_context(|| format!("render {}", P::TEMPLATE))?;
        Ok(Html(html))
    }
}

pub const STYLESHEET: &str = include_str!("../../templates/style.css");
