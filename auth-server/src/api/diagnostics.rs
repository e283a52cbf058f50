// auth-server/src/api/diagnostics.rs
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::state::AuthState;

// Reports the caller's session, 401 when there is none
#[get("/test")]
pub async fn session_check(req: HttpRequest, state: web::Data<AuthState>) -> impl Responder {
    let Some(read) = state.session_from_request(&req) else {
        return HttpResponse::Unauthorized().json(json!({
            "error": "Not authenticated"
        }));
    };

    tracing::debug!("Session check: {:?}", read.session);
    HttpResponse::Ok().json(json!({
        "session": read.session
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::configure;
    use crate::state::testing::{self, ADDRESS};
    use actix_web::{http::StatusCode, test, App};
    use common::models::session::AuthorizedUser;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn unauthenticated_request_gets_401() {
        let app = test::init_service(App::new().app_data(testing::state(true)).configure(configure)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/test").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Not authenticated" }));
    }

    #[actix_web::test]
    async fn authenticated_request_gets_session() {
        let state = testing::state(true);
        let issued = state.sessions.issue(&AuthorizedUser::new(1, ADDRESS)).unwrap();
        let cookie = state.session_cookie(issued.token);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/test").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["session"]["address"], ADDRESS);
        assert_eq!(body["session"]["chainId"], 1);
    }
}
