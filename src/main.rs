mod analytics;
mod clients;
mod config;
mod database;
mod handlers;
mod import;
mod models;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use crate::clients::email::EmailClient;
use crate::config::AppConfig;
use crate::database::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    let bind_address = config.bind_address();

    let db = Database::connect(&config.database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    let email_client = EmailClient::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.notify_from.clone(),
        config.notify_to.clone(),
    );
    if !email_client.is_enabled() {
        log::warn!("EMAIL_API_KEY or NOTIFY_TO not set, new listing notifications are disabled");
    }

    let db_data = web::Data::new(db);
    let email_data = web::Data::new(email_client);
    let import_max_bytes = config.import_max_bytes;

    log::info!("Starting Antigua Directory Service on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(email_data.clone())
            .app_data(web::PayloadConfig::new(import_max_bytes))
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                web::scope("/api/v1")
                    // Health
                    .service(handlers::health_check)
                    // Lookups
                    .service(handlers::list_categories)
                    .service(handlers::list_parishes)
                    // Directory
                    .service(handlers::list_listings)
                    .service(handlers::submit_listing)
                    .service(handlers::get_listing)
                    // Claims
                    .service(handlers::claim_listing)
                    .service(handlers::unclaim_listing)
                    .service(handlers::list_claims_for_user)
                    .service(handlers::verify_claim)
                    // Reviews
                    .service(handlers::submit_review)
                    .service(handlers::admin_list_reviews)
                    .service(handlers::moderate_review)
                    .service(handlers::delete_review)
                    // Listing administration
                    .service(handlers::admin_list_listings)
                    .service(handlers::admin_update_listing)
                    .service(handlers::admin_set_listing_status)
                    .service(handlers::admin_delete_listing)
                    .service(handlers::import_listings)
                    .service(handlers::import_template)
                    // Analytics
                    .service(handlers::track_pageview)
                    .service(handlers::track_search)
                    .service(handlers::track_click)
                    .service(handlers::analytics_dashboard)
                    // Properties
                    .service(handlers::list_properties)
                    .service(handlers::get_property)
                    .service(handlers::create_property)
                    .service(handlers::update_property)
                    .service(handlers::delete_property)
                    .service(handlers::create_inquiry)
                    .service(handlers::list_inquiries),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
