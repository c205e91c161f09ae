use actix_web::cookie::Cookie;
use actix_web::{test, web, App};
use linkup_server::{configure, AppState, Settings};
use serde_json::{json, Value};

async fn test_state() -> web::Data<AppState> {
    let config = Settings::new_for_test().expect("Failed to load test config");
    web::Data::new(AppState::new(config).await.expect("Failed to build state"))
}

/// Registers `$username` and evaluates to `(session cookie, account id)`.
macro_rules! register {
    ($app:expr, $state:expr, $username:expr) => {{
        let response = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": $username.to_uppercase(),
                "username": $username,
                "email": format!("{}@x.com", $username),
                "password": "secret12"
            }))
            .send_request(&$app)
            .await;
        assert_eq!(response.status(), 201);
        let cookie: Cookie<'static> = response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == $state.config.auth.cookie_name)
            .expect("register sets the session cookie")
            .into_owned();
        let body: Value = test::read_body_json(response).await;
        let id = body["account"]["id"].as_str().unwrap().to_string();
        (cookie, id)
    }};
}

#[test_log::test(actix_web::test)]
async fn test_post_lifecycle() {
    let state = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
    let (ada, ada_id) = register!(app, state, "ada");
    let (bob, bob_id) = register!(app, state, "bob");

    // Create
    let response = test::TestRequest::post()
        .uri("/post")
        .cookie(ada.clone())
        .set_json(json!({ "content": "Hello network" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);
    let post: Value = test::read_body_json(response).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["author"]["id"], ada_id.as_str());
    assert_eq!(post["author"]["username"], "ada");

    // Feed
    let response = test::TestRequest::get()
        .uri("/post/feed")
        .cookie(bob.clone())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let feed: Value = test::read_body_json(response).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["content"], "Hello network");

    // Like
    let response = test::TestRequest::post()
        .uri(&format!("/post/{}/like", post_id))
        .cookie(bob.clone())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let liked: Value = test::read_body_json(response).await;
    assert_eq!(liked["likes"], json!([bob_id]));

    // Comment
    let response = test::TestRequest::post()
        .uri(&format!("/post/{}/comments", post_id))
        .cookie(bob.clone())
        .set_json(json!({ "content": "Welcome!" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);
    let commented: Value = test::read_body_json(response).await;
    assert_eq!(commented["comments"][0]["content"], "Welcome!");
    assert_eq!(commented["comments"][0]["author"]["username"], "bob");

    // Only the author may delete
    let response = test::TestRequest::delete()
        .uri(&format!("/post/{}", post_id))
        .cookie(bob)
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    let response = test::TestRequest::delete()
        .uri(&format!("/post/{}", post_id))
        .cookie(ada.clone())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::get()
        .uri(&format!("/post/{}", post_id))
        .cookie(ada)
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 404);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn test_posts_require_session() {
    let state = test_state().await;
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let response = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({ "content": "anonymous" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);

    let response = test::TestRequest::get()
        .uri("/post/feed")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_empty_post_rejected() {
    let state = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
    let (ada, _) = register!(app, state, "ada");

    let response = test::TestRequest::post()
        .uri("/post")
        .cookie(ada)
        .set_json(json!({ "content": "  " }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_profile_update_and_lookup() {
    let state = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
    let (ada, ada_id) = register!(app, state, "ada");
    let (bob, _) = register!(app, state, "bob");

    let response = test::TestRequest::put()
        .uri("/user/profile")
        .cookie(ada)
        .set_json(json!({ "headline": "Mathematician", "skills": ["analysis"] }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let updated: Value = test::read_body_json(response).await;
    assert_eq!(updated["headline"], "Mathematician");
    assert_eq!(updated["name"], "ADA");

    let response = test::TestRequest::get()
        .uri(&format!("/user/{}", ada_id))
        .cookie(bob.clone())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let profile: Value = test::read_body_json(response).await;
    assert_eq!(profile["skills"], json!(["analysis"]));

    let response = test::TestRequest::get()
        .uri(&format!("/user/{}", uuid::Uuid::new_v4()))
        .cookie(bob.clone())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 404);

    // Without a configured media host the upload fails server-side
    let response = test::TestRequest::post()
        .uri("/user/profile-image")
        .cookie(bob)
        .set_json(json!({ "image": "https://example.com/bob.png" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 500);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "Internal server error");
}

#[actix_web::test]
async fn test_malformed_id_is_json_not_found() {
    let state = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
    let (ada, _) = register!(app, state, "ada");

    for uri in ["/post/abc", "/user/not-a-uuid"] {
        let response = test::TestRequest::get()
            .uri(uri)
            .cookie(ada.clone())
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 404);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
