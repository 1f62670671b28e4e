use http::{Method, StatusCode};
use micro_dispatch::filter::allow_methods;
use micro_dispatch::method_router::get;
use micro_dispatch::{AppServer, RouteConfig, RouterHub, ServerConfig, access_log, error_fn, handler_fn};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

// curl -v http://127.0.0.1:8080/users/42/sites/7
// curl -v -X POST http://127.0.0.1:8080/admin/settings
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut admin = RouterHub::new("/admin/");
    admin.add_filter(allow_methods([Method::GET]));
    admin.route(
        "/admin/:page",
        handler_fn(|req, resp, _| {
            resp.write_str(&format!("admin page {}\r\n", req.path_param("page").unwrap_or_default()));
            Ok(())
        }),
        RouteConfig::new(),
    )?;

    let server = AppServer::builder()
        .config(ServerConfig::builder().addr("127.0.0.1:8080").build())
        .log_handler(access_log())
        .error_handler(error_fn(|err, resp, ctx| {
            error!(cause = %err, uri = ctx.uri(), "request failed");
            resp.write_text(StatusCode::INTERNAL_SERVER_ERROR, "internal server error\r\n");
        }))
        .response_text("/ping", "pong")?
        .route(
            "/users/",
            get(handler_fn(|_, resp, _| {
                resp.write_str("all users\r\n");
                Ok(())
            })),
            RouteConfig::new(),
        )?
        .route(
            "/users/:userId",
            handler_fn(|req, resp, _| {
                resp.write_str(&format!("user {}\r\n", req.path_param("userId").unwrap_or_default()));
                Ok(())
            }),
            RouteConfig::new(),
        )?
        .route(
            "/users/:userId/sites/:siteId",
            handler_fn(|req, resp, _| {
                let site_id: u32 = req.path_param("siteId").unwrap_or_default().parse()?;
                let user_id = req.path_param("userId").unwrap_or_default();
                resp.write_str(&format!("user {user_id}, site {site_id}\r\n"));
                Ok(())
            }),
            RouteConfig::new(),
        )?
        .hub(admin)
        .build()?;

    server.start().await?;
    Ok(())
}
