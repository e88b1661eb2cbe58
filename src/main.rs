use actix_web::{
    get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};

use multicluster_observability_addon::addon::{
    Settings, DEFAULT_ADDON_NAME, DEFAULT_IMAGES_CONFIG_MAP, DEFAULT_INSTALL_NAMESPACE,
    DEFAULT_RBAC_PROXY_PORT,
};
pub use multicluster_observability_addon::{self, telemetry, State};

#[derive(Debug, clap::Parser)]
struct Arguments {
    #[arg(long = "addon-name", env = "ADDON_NAME", default_value = DEFAULT_ADDON_NAME)]
    addon_name: String,

    #[arg(
        long = "install-namespace",
        env = "INSTALL_NAMESPACE",
        default_value = DEFAULT_INSTALL_NAMESPACE
    )]
    install_namespace: String,

    /// Fallback namespace for per-cluster secrets and config maps; defaults to the install namespace
    #[arg(long = "config-namespace", env = "CONFIG_NAMESPACE")]
    config_namespace: Option<String>,

    #[arg(
        long = "images-config-map",
        env = "IMAGES_CONFIG_MAP",
        default_value = DEFAULT_IMAGES_CONFIG_MAP
    )]
    images_config_map: String,

    #[arg(long = "rbac-proxy-port", env = "RBAC_PROXY_PORT", default_value_t = DEFAULT_RBAC_PROXY_PORT)]
    rbac_proxy_port: i32,

    #[arg(long = "bind-address", env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    bind_address: String,
}

impl Arguments {
    fn settings(&self) -> Settings {
        Settings {
            addon_name: self.addon_name.clone(),
            install_namespace: self.install_namespace.clone(),
            config_namespace: self
                .config_namespace
                .clone()
                .unwrap_or_else(|| self.install_namespace.clone()),
            images_config_map: self.images_config_map.clone(),
            rbac_proxy_port: self.rbac_proxy_port,
        }
    }
}

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok().body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init()?;

    let args: Arguments = Arguments::parse();

    // Initialize Kubernetes controller state
    let state = State::new(args.settings());
    let controller = multicluster_observability_addon::run(state.clone());
    tokio::pin!(controller);

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind(&args.bind_address)?
    .shutdown_timeout(5)
    .run();

    tokio::pin!(server);

    // Both runtimes implements graceful shutdown, so poll until both are done
    tokio::join!(controller, server).1?;
    Ok(())
}
