use crate::{
    api::{employee, leave_request, stream},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-peer-IP limiter allowing `requests_per_min` with an equal burst.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let auth_limiter = Arc::new(
        build_limiter(config.rate_auth_per_min).expect("auth limiter quota is non-zero"),
    );
    let protected_limiter = Arc::new(
        build_limiter(config.rate_protected_per_min).expect("protected limiter quota is non-zero"),
    );

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/signup")
                    .wrap(auth_limiter.clone())
                    .route(web::post().to(handlers::signup)),
            )
            .service(
                web::resource("/login")
                    .wrap(auth_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(auth_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(employee::me)))
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::my_leaves))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/days
                    .service(web::resource("/days").route(web::get().to(leave_request::day_count)))
                    // /leave/stream
                    .service(web::resource("/stream").route(web::get().to(stream::my_leave_stream)))
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave))),
            )
            .service(
                web::scope("/admin")
                    // /admin/leave
                    .service(
                        web::resource("/leave")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::apply_admin_leave)),
                    )
                    // /admin/leave/stream
                    .service(
                        web::resource("/leave/stream").route(web::get().to(stream::all_leave_stream)),
                    )
                    // /admin/leave/{id}/approve
                    .service(
                        web::resource("/leave/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /admin/leave/{id}/reject
                    .service(
                        web::resource("/leave/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    // /admin/employees
                    .service(
                        web::resource("/employees").route(web::get().to(employee::list_employees)),
                    )
                    // /admin/employees/stream
                    .service(
                        web::resource("/employees/stream")
                            .route(web::get().to(stream::employee_stream)),
                    )
                    // /admin/metrics
                    .service(web::resource("/metrics").route(web::get().to(employee::metrics))),
            ),
    );
}

// SIGN UP / LOGIN
//  └─ access_token (ACCESS_TOKEN_TTL, default 15 min)

// API REQUEST
//  └─ Authorization: Bearer access_token

// LOGOUT
//  └─ token id revoked until it would have expired
