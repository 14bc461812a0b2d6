use actix_cors::Cors;

/// The dashboard is served from its own origin and sends the bearer token
/// in a custom header, so preflight must accept any header.
pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
