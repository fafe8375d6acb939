//! One-shot index template registration.

use crate::core::{normalise_url, ReporterError, Result};
use reqwest::{Client, StatusCode};
use std::path::PathBuf;

/// Templates compiled into the binary, looked up by name.
const BUILTIN_TEMPLATES: &[(&str, &str)] =
    &[("metric-1", include_str!("../../elastic-template/metric-1.json"))];

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Installs an index template when the cluster does not have it yet.
#[derive(Debug)]
pub struct TemplateApply {
    client: Client,
    base_url: String,
    template_name: Option<String>,
    template_dir: Option<PathBuf>,
}

impl TemplateApply {
    /// Create for the given cluster; a `None` template name disables the check.
    pub fn new(
        client: Client,
        base_url: &str,
        template_name: Option<String>,
        template_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            base_url: normalise_url(base_url),
            template_name,
            template_dir,
        }
    }

    /// Returns true if the template was added.
    ///
    /// Never fails: an existing template, a missing resource, or any HTTP
    /// problem is logged and reported as "not installed".
    pub async fn ensure_template(&self) -> bool {
        let Some(name) = self.template_name.as_deref() else {
            return false;
        };

        match self.template_missing(name).await {
            Ok(true) => {},
            Ok(false) => {
                tracing::debug!(template = name, "Template already present");
                return false;
            },
            Err(e) => {
                tracing::warn!(
                    template = name,
                    category = e.category(),
                    "Failed to check if template exists: {}",
                    e
                );
                return false;
            },
        }

        match self.put_template(name).await {
            Ok(()) => {
                tracing::info!(template = name, "PUT template");
                true
            },
            Err(e) => {
                tracing::warn!(
                    template = name,
                    category = e.category(),
                    "Failed to PUT template: {}",
                    e
                );
                false
            },
        }
    }

    fn template_url(&self, name: &str) -> String {
        format!("{}/_template/{}", self.base_url, name)
    }

    /// Only a 404 counts as missing; any other status means leave it alone.
    async fn template_missing(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.template_url(name))
            .send()
            .await
            .map_err(|e| ReporterError::network(e.to_string()))?;

        Ok(response.status() == StatusCode::NOT_FOUND)
    }

    async fn put_template(&self, name: &str) -> Result<()> {
        let body = self.load_template(name).await?;

        let response = self
            .client
            .put(self.template_url(name))
            .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| ReporterError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ReporterError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// `<template_dir>/<name>.json` first, then the built-in templates.
    async fn load_template(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.template_dir {
            let path = dir.join(format!("{}.json", name));
            match tokio::fs::read_to_string(&path).await {
                Ok(body) => return Ok(body),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => {
                    return Err(ReporterError::template(format!(
                        "Failed to read template {}: {}",
                        path.display(),
                        e
                    )))
                },
            }
        }

        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, body)| (*body).to_string())
            .ok_or_else(|| {
                ReporterError::template(format!(
                    "Could not find template resource {}.json to apply",
                    name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEMPLATE: &str = "metric-1";

    fn apply_for(server: &MockServer, name: Option<&str>) -> TemplateApply {
        TemplateApply::new(
            Client::new(),
            &format!("{}/", server.uri()),
            name.map(str::to_string),
            None,
        )
    }

    #[tokio::test]
    async fn test_missing_template_is_added() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_template/metric-1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/_template/metric-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let apply = apply_for(&server, Some(TEMPLATE));
        assert!(apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_existing_template_not_added() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_template/metric-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let apply = apply_for(&server, Some(TEMPLATE));
        assert!(!apply.ensure_template().await);
        assert!(!apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_check_error_not_added() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let apply = apply_for(&server, Some(TEMPLATE));
        assert!(!apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_put_failure_not_added() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no"))
            .expect(1)
            .mount(&server)
            .await;

        let apply = apply_for(&server, Some(TEMPLATE));
        assert!(!apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_no_template_name_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let apply = apply_for(&server, None);
        assert!(!apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_unknown_template_resource_not_added() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let apply = apply_for(&server, Some("no-such-template"));
        assert!(!apply.ensure_template().await);
    }

    #[tokio::test]
    async fn test_template_dir_overrides_builtin() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("metric-1.json"), "{\"order\":9}").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(body_string("{\"order\":9}"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let apply = TemplateApply::new(
            Client::new(),
            &server.uri(),
            Some(TEMPLATE.to_string()),
            Some(temp_dir.path().to_path_buf()),
        );
        assert!(apply.ensure_template().await);
    }

    #[test]
    fn test_builtin_template_is_json() {
        for (_, body) in BUILTIN_TEMPLATES {
            assert!(serde_json::from_str::<serde_json::Value>(body).is_ok());
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_not_added() {
        let apply = TemplateApply::new(
            Client::new(),
            "http://127.0.0.1:1",
            Some(TEMPLATE.to_string()),
            None,
        );
        assert!(!apply.ensure_template().await);
    }
}
