#![allow(dead_code)]

use axum::body::Body;
use http_body_util::BodyExt;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use sqlx::SqlitePool;
use std::time::Duration;

use lifemuseum::biographer::Biographer;
use lifemuseum::store::EntryStore;
use lifemuseum::AppState;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    /// The app's own store: writes through it reach signed-in live views.
    pub store: EntryStore,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = lifemuseum::db::memory_pool()
            .await
            .expect("Failed to create in-memory database");

        let state = AppState::new(pool.clone(), Biographer::offline());
        let store = state.store.clone();
        let router = lifemuseum::build_app(state, false)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            store,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create an account and return its user id.
    pub async fn create_user(&self, email: &str, password: &str) -> String {
        lifemuseum::accounts::sign_up(&self.db, email, password)
            .await
            .expect("Failed to create test user")
            .id
    }

    /// Sign in and return the session cookie string.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let body = format!("email={}&password={}", encode(email), encode(password));
        let resp = self.post_form("/login", &body, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp)
    }

    /// Create an account and sign in as it. Returns (user_id, cookie).
    pub async fn signed_in(&self, email: &str) -> (String, String) {
        let user_id = self.create_user(email, "hunter22").await;
        let cookie = self.login(email, "hunter22").await;
        (user_id, cookie)
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a POST form request with an optional session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Send a multipart/form-data POST, as a browser does for forms with a
    /// file input. `fields` is an urlencoded string of the text fields.
    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &str,
        upload: Option<Upload<'_>>,
        cookie: Option<&str>,
    ) -> Response {
        const BOUNDARY: &str = "museum-test-boundary";
        let mut body = Vec::new();
        for (name, value) in url::form_urlencoded::parse(fields.as_bytes()) {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(upload) = upload {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    upload.field, upload.filename, upload.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(upload.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body)).unwrap();
        self.request(req).await
    }

    /// Post the new-entry form.
    pub async fn post_entry(&self, fields: &str, cookie: Option<&str>) -> Response {
        self.post_multipart("/entries", fields, None, cookie).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method("DELETE");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }
}

/// A file part for [`TestApp::post_multipart`].
pub struct Upload<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Poll a page until its body contains `needle`. Store pushes reach the
/// live view asynchronously, so a page rendered right after a write may
/// still show the previous snapshot.
pub async fn page_containing(app: &TestApp, uri: &str, cookie: &str, needle: &str) -> String {
    let mut last = String::new();
    for _ in 0..100 {
        let resp = app.get(uri, Some(cookie)).await;
        last = body_string(resp).await;
        if last.contains(needle) {
            return last;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{uri} never contained {needle:?}; last body:\n{last}");
}

pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// The `name=value` part of the response's session cookie.
pub fn session_cookie(resp: &Response) -> String {
    resp.headers()
        .get("set-cookie")
        .expect("Response should set a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert!(
        resp.status().is_redirection(),
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}

/// Assert that an HX-Redirect header points to the expected location.
pub fn assert_hx_redirect(resp: &Response, expected_location: &str) {
    let hx = resp
        .headers()
        .get("hx-redirect")
        .expect("Expected HX-Redirect header")
        .to_str()
        .unwrap();
    assert_eq!(hx, expected_location);
}
