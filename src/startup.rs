use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, TokenEngine};
use crate::error::ApiError;
use crate::logger::LoggerMiddleware;
use crate::routes::{
    check, create_url, delete_url, delete_user, get_url, health_check, login, logout, refresh,
    register, update_url,
};
use crate::store::{UrlStore, UserStore};

pub fn run(
    listener: TcpListener,
    users: Arc<dyn UserStore>,
    urls: Arc<dyn UrlStore>,
    engine: TokenEngine,
) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(AuthService::new(Arc::new(engine), users));
    let urls: web::Data<dyn UrlStore> = web::Data::from(urls);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(LoggerMiddleware)
            .app_data(auth.clone())
            .app_data(urls.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/jwt")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::get().to(refresh))
                            .route("/logout", web::get().to(logout))
                            .route("/check", web::post().to(check))
                            .route("/delete", web::delete().to(delete_user)),
                    )
                    .service(
                        web::scope("/urls")
                            .route("/", web::post().to(create_url))
                            .route("/{short_url}", web::get().to(get_url))
                            .route("/{short_url}", web::patch().to(update_url))
                            .route("/{short_url}", web::delete().to(delete_url)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

// Malformed or incomplete JSON bodies get the same `{code, message}` body as
// every other 400.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(err).into()
}
