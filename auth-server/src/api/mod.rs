// auth-server/src/api/mod.rs
pub mod auth;
pub mod diagnostics;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(
                actix_web::web::scope("/auth")
                    .service(auth::csrf_token)
                    .service(auth::credentials_callback)
                    .service(auth::get_session)
                    .service(auth::sign_out)
            )
            .service(diagnostics::session_check)
    );
}
