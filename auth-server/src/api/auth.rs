// auth-server/src/api/auth.rs
use actix_web::{get, post, web, Either, HttpRequest, HttpResponse, Responder};
use common::models::session::Credentials;
use serde_json::json;

use crate::state::AuthState;

// CSRF token, doubling as the SIWE nonce. Also set as an HttpOnly cookie
// for the double-submit check at login.
#[get("/csrf")]
pub async fn csrf_token(state: web::Data<AuthState>) -> impl Responder {
    let token = state.nonces.issue();
    HttpResponse::Ok()
        .cookie(state.csrf_cookie(token.clone()))
        .json(json!({
            "csrfToken": token
        }))
}

fn credentials_signin() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "error": "CredentialsSignin"
    }))
}

// Sign in with a signed SIWE message, submitted as JSON or form data.
// The submitted csrfToken must equal the CSRF cookie, be an unspent nonce
// issued by `/csrf`, and appear as the message nonce.
#[post("/callback/credentials")]
pub async fn credentials_callback(
    req: HttpRequest,
    body: Either<web::Json<Credentials>, web::Form<Credentials>>,
    state: web::Data<AuthState>,
) -> impl Responder {
    let credentials = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    let cookie = req.cookie(state.csrf_cookie_name());
    let nonce = match (cookie.as_ref(), credentials.csrf_token.as_deref()) {
        (Some(cookie), Some(submitted)) if !submitted.is_empty() && cookie.value() == submitted => {
            submitted
        }
        _ => {
            tracing::warn!("Login without a matching CSRF token");
            return credentials_signin();
        }
    };

    if !state.nonces.consume(nonce) {
        tracing::warn!("Login with an unknown or spent nonce");
        return credentials_signin();
    }

    let Some(user) = state.provider.authorize_with_nonce(&credentials, nonce).await else {
        return credentials_signin();
    };

    match state.sessions.issue(&user) {
        Ok(issued) => {
            tracing::info!("Issued session for {}", user.id);
            HttpResponse::Ok()
                .cookie(state.session_cookie(issued.token))
                .cookie(state.csrf_removal_cookie())
                .json(json!({
                    "status": "success",
                    "session": issued.session
                }))
        }
        Err(e) => {
            tracing::error!("Error issuing session token: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

// Current session, or an empty object when unauthenticated
#[get("/session")]
pub async fn get_session(req: HttpRequest, state: web::Data<AuthState>) -> impl Responder {
    match state.session_from_request(&req) {
        Some(read) => {
            let mut response = HttpResponse::Ok();
            if let Some(token) = read.refreshed {
                response.cookie(state.session_cookie(token));
            }
            response.json(read.session)
        }
        None => HttpResponse::Ok().json(json!({})),
    }
}

#[post("/signout")]
pub async fn sign_out(state: web::Data<AuthState>) -> impl Responder {
    tracing::info!("Session signed out");
    HttpResponse::Ok()
        .cookie(state.removal_cookie())
        .json(json!({
            "status": "success"
        }))
}

#[cfg(test)]
mod tests {
    use crate::api::configure;
    use crate::state::testing::{self, ADDRESS};
    use actix_web::cookie::Cookie;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    fn login(message: String, csrf_token: &str) -> Value {
        json!({ "message": message, "signature": "0x00", "csrfToken": csrf_token })
    }

    #[actix_web::test]
    async fn csrf_endpoint_sets_matching_cookie() {
        let state = testing::state(true);
        let csrf_cookie_name = state.csrf_cookie_name().to_string();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/auth/csrf").to_request(),
        )
        .await;

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == csrf_cookie_name)
            .expect("csrf cookie")
            .into_owned();
        assert!(cookie.http_only().unwrap_or(false));

        let body: Value = test::read_body_json(resp).await;
        let token = body["csrfToken"].as_str().unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(cookie.value(), token);
    }

    #[actix_web::test]
    async fn login_sets_cookie_and_session_reads_back() {
        let state = testing::state(true);
        let cookie_name = state.cookie_name().to_string();
        let csrf_cookie_name = state.csrf_cookie_name().to_string();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        // Fetch the nonce the way a browser does
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/auth/csrf").to_request(),
        )
        .await;
        let csrf_cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == csrf_cookie_name)
            .expect("csrf cookie")
            .into_owned();
        let body: Value = test::read_body_json(resp).await;
        let token = body["csrfToken"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(csrf_cookie)
            .set_json(login(testing::siwe_text(1, &token), &token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == cookie_name)
            .expect("session cookie")
            .into_owned();
        assert!(cookie.http_only().unwrap_or(false));
        let spent = resp
            .response()
            .cookies()
            .find(|c| c.name() == csrf_cookie_name)
            .expect("csrf removal cookie");
        assert_eq!(spent.value(), "");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["session"]["address"], ADDRESS);

        let req = test::TestRequest::get()
            .uri("/api/auth/session")
            .cookie(cookie)
            .to_request();
        let session: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session["address"], ADDRESS);
        assert_eq!(session["chainId"], 1);
        assert_eq!(session["user"]["name"], ADDRESS);
    }

    #[actix_web::test]
    async fn form_submission_is_accepted() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_form([
                ("message", testing::siwe_text(10, &token)),
                ("signature", "0x00".to_string()),
                ("csrfToken", token.clone()),
            ])
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["session"]["chainId"], 10);
    }

    #[actix_web::test]
    async fn replayed_login_is_rejected() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let body = login(testing::siwe_text(1, &token), &token);

        let first = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie.clone())
            .set_json(body.clone())
            .to_request();
        assert_eq!(test::call_service(&app, first).await.status(), StatusCode::OK);

        for _ in 0..2 {
            let again = test::TestRequest::post()
                .uri("/api/auth/callback/credentials")
                .cookie(cookie.clone())
                .set_json(body.clone())
                .to_request();
            let resp = test::call_service(&app, again).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn missing_csrf_cookie_or_token_is_rejected() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let message = testing::siwe_text(1, &token);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let no_cookie = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .set_json(login(message.clone(), &token))
            .to_request();
        let resp = test::call_service(&app, no_cookie).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.response().cookies().count(), 0);

        let no_token = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie.clone())
            .set_json(json!({ "message": message.clone(), "signature": "0x00" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, no_token).await.status(),
            StatusCode::UNAUTHORIZED
        );

        // Neither attempt spent the nonce
        let valid = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(message, &token))
            .to_request();
        assert_eq!(test::call_service(&app, valid).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn mismatched_csrf_token_is_rejected() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let (other, _) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(testing::siwe_text(1, &token), &other))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "CredentialsSignin" }));
    }

    #[actix_web::test]
    async fn self_chosen_nonce_is_rejected() {
        // Cookie and token agree, but the server never issued the value
        let state = testing::state(true);
        let forged = "k2Jd93LsQp0aXe7B";
        let cookie = Cookie::new(state.csrf_cookie_name().to_string(), forged);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(testing::siwe_text(1, forged), forged))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn message_nonce_must_match_csrf_token() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let (other, _) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(testing::siwe_text(1, &other), &token))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn expired_message_is_rejected() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let mut message = testing::siwe_message(1, &token);
        message.expiration_time = Some("2020-01-01T00:00:00.000Z".to_string());
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(message.to_string(), &token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.response().cookies().count(), 0);
    }

    #[actix_web::test]
    async fn rejected_signature_issues_no_cookie() {
        let state = testing::state(false);
        let (token, cookie) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(login(testing::siwe_text(1, &token), &token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.response().cookies().count(), 0);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "CredentialsSignin" }));
    }

    #[actix_web::test]
    async fn missing_message_is_rejected() {
        let state = testing::state(true);
        let (token, cookie) = testing::csrf(&state);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/auth/callback/credentials")
            .cookie(cookie)
            .set_json(json!({ "signature": "0x00", "csrfToken": token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn session_without_cookie_is_empty() {
        let app = test::init_service(App::new().app_data(testing::state(true)).configure(configure)).await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/auth/session").to_request(),
        )
        .await;
        assert_eq!(body, json!({}));
    }

    #[actix_web::test]
    async fn tampered_cookie_is_ignored() {
        let state = testing::state(true);
        let cookie = Cookie::new(state.cookie_name().to_string(), "garbage");
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/auth/session").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(body, json!({}));
    }

    #[actix_web::test]
    async fn sign_out_clears_cookie() {
        let state = testing::state(true);
        let cookie_name = state.cookie_name().to_string();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/auth/signout").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == cookie_name)
            .expect("removal cookie");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
    }
}
