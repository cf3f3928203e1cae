use axum::{
    body::Body,
    http::{header, Request, Response},
};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: Option<&str>) -> Response<axum::body::Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &str,
        cookies: Option<&str>,
    ) -> Response<axum::body::Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        body: &str,
        cookies: Option<&str>,
    ) -> Response<axum::body::Body> {
        let mut builder = Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Response<axum::body::Body> {
        self.post_json(
            "/user/register",
            &format!(r#"{{"name": "{name}", "email": "{email}", "password": "{password}"}}"#),
            None,
        )
        .await
    }

    /// Logs in and returns the session cookies as one `Cookie` header value
    pub async fn login(&self, email: &str, password: &str) -> (Response<axum::body::Body>, String) {
        let response = self
            .post_json(
                "/auth/login",
                &format!(r#"{{"email": "{email}", "password": "{password}"}}"#),
                None,
            )
            .await;
        let cookies = cookie_header(&response);
        (response, cookies)
    }

    /// Pulls the activation token out of the most recent captured email
    pub fn last_activation_token(&self) -> String {
        let sent = self.mailer.sent();
        let email = sent.last().expect("no activation email was captured");

        let link_start = email
            .html
            .find("/verify-account/")
            .expect("activation email has no activation link");
        let token = &email.html[link_start + "/verify-account/".len()..];
        let token_end = token.find('"').expect("unterminated activation link");
        token[..token_end].to_string()
    }
}

/// Collects the `Set-Cookie` name=value pairs into a `Cookie` header value
pub fn cookie_header(response: &Response<axum::body::Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let raw = value.to_str().unwrap();
            raw.split(';').next().unwrap().to_string()
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_json(response: Response<axum::body::Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
