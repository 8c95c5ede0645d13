pub mod ai;
pub mod auth;
pub mod elections;
pub mod error;
pub mod friends;
pub mod health;
pub mod legal;
pub mod messages;
pub mod politicians;
pub mod response;
pub mod social;
pub mod users;

use actix_web::web;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut web::ServiceConfig) {
    conf.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler));

    // Route resolution stops at the first match, so literal segments such as
    // `/api/politicians/ingest` are registered before `{id}` patterns.
    health::configure(conf);
    auth::configure(conf);
    politicians::configure(conf);
    elections::configure(conf);
    legal::configure(conf);
    friends::configure(conf);
    messages::configure(conf);
    social::configure(conf);
    users::configure(conf);
    ai::configure(conf);
}
