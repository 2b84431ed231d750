mod common;

use axum::http::StatusCode;
use common::{assert_redirect, body_string, page_containing, TestApp};
use lifemuseum::biographer::{NARRATIVE_NO_ENTRIES, NARRATIVE_TOO_FEW};
use lifemuseum::models::{Category, NewEntry};

#[tokio::test]
async fn story_page_starts_blank() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("ana@example.com").await;

    let resp = app.get("/story", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("The pages are blank."));
}

#[tokio::test]
async fn generating_without_entries_explains_why() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("ana@example.com").await;

    let resp = app.post_form("/story", "", Some(&cookie)).await;
    assert_redirect(&resp, "/story");

    let html = body_string(app.get("/story", Some(&cookie)).await).await;
    assert!(html.contains(NARRATIVE_NO_ENTRIES));
}

#[tokio::test]
async fn offline_story_asks_for_more_entries() {
    let app = TestApp::new().await;
    let (user_id, cookie) = app.signed_in("ana@example.com").await;

    app.store
        .create(
            &user_id,
            NewEntry {
                text: "Moved to Lisbon".to_string(),
                date: "2012-02-02".to_string(),
                category: Category::Travel,
                image_url: None,
                ai_prompted: false,
            },
        )
        .await
        .unwrap();
    page_containing(&app, "/story", &cookie, "ready to be woven").await;

    let resp = app.post_form("/story", "", Some(&cookie)).await;
    assert_redirect(&resp, "/story");

    let html = body_string(app.get("/story", Some(&cookie)).await).await;
    assert!(html.contains(NARRATIVE_TOO_FEW));
    assert!(html.contains("Regenerate Chapter"));
}

#[tokio::test]
async fn narrative_is_dropped_on_sign_out() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("ana@example.com").await;

    app.post_form("/story", "", Some(&cookie)).await;
    app.post_form("/logout", "", Some(&cookie)).await;

    let cookie = app.login("ana@example.com", "hunter22").await;
    let html = body_string(app.get("/story", Some(&cookie)).await).await;
    assert!(!html.contains(NARRATIVE_NO_ENTRIES));
    assert!(html.contains("The pages are blank."));
}
