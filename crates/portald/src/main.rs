// # portald - Captive Portal Daemon
//
// Thin integration layer over portal-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the device's data points and web paths
// 4. Starting the portal engine
//
// ## Configuration
//
// - `PORTAL_CONFIG`: JSON file used as the base configuration (optional)
// - `PORTAL_ADDRESS`: Device address returned for every DNS query
// - `PORTAL_DNS_PORT`: UDP port for DNS (default 53)
// - `PORTAL_HTTP_PORT`: TCP port for HTTP (default 80)
// - `PORTAL_HOST`: Virtual host name of the web UI
// - `PORTAL_BLOCKED`: Comma-separated names answered with NXDOMAIN (at most 4)
// - `PORTAL_BIND_ADDR`: Address both listeners bind to
// - `PORTAL_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export PORTAL_ADDRESS=192.168.4.1
// export PORTAL_HOST=car.stop
// export PORTAL_BLOCKED=connectivitycheck.gstatic.com
//
// portald
// ```

use anyhow::{Context, Result};
use portal_core::http::handlers::{ListPoints, PointAccess, StaticPage};
use portal_core::registry::{DataPoint, DataPointRegistry, Value, ValueSlot};
use portal_core::{HttpRouter, Methods, PortalConfig, PortalEngine, WebPath};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

const INDEX_PAGE: &str = include_str!("../assets/index.html");

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum PortalExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PortalExitCode> for ExitCode {
    fn from(code: PortalExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    portal: PortalConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut portal = match env::var("PORTAL_CONFIG") {
            Ok(path) => PortalConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load PORTAL_CONFIG file {}", path))?,
            Err(_) => PortalConfig::new(),
        };

        if let Ok(address) = env::var("PORTAL_ADDRESS") {
            let address: Ipv4Addr = address
                .parse()
                .with_context(|| format!("PORTAL_ADDRESS '{}' is not an IPv4 address", address))?;
            portal = portal.with_address(address);
        }
        if let Ok(port) = env::var("PORTAL_DNS_PORT") {
            portal.dns.port = parse_port("PORTAL_DNS_PORT", &port)?;
        }
        if let Ok(port) = env::var("PORTAL_HTTP_PORT") {
            portal.http.port = parse_port("PORTAL_HTTP_PORT", &port)?;
        }
        if let Ok(host) = env::var("PORTAL_HOST") {
            portal.http.host = host.trim().to_string();
        }
        if let Ok(blocked) = env::var("PORTAL_BLOCKED") {
            portal.dns.blocked = split_list(&blocked);
        }
        if let Ok(bind) = env::var("PORTAL_BIND_ADDR") {
            let bind: IpAddr = bind
                .parse()
                .with_context(|| format!("PORTAL_BIND_ADDR '{}' is not an IP address", bind))?;
            portal.dns.bind_addr = bind;
            portal.http.bind_addr = bind;
        }

        Ok(Self {
            portal,
            log_level: env::var("PORTAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.portal.validate()?;

        if parse_level(&self.log_level).is_none() {
            anyhow::bail!(
                "PORTAL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} '{}' is not a port number", var, value))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return PortalExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return PortalExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PortalExitCode::ConfigError.into();
    }

    info!("Starting portald daemon");
    info!(
        "Portal address {}, host '{}', {} blocked name(s)",
        config.portal.dns.address,
        config.portal.http.host,
        config.portal.dns.blocked.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PortalExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config.portal).await {
            error!("Daemon error: {:#}", e);
            PortalExitCode::RuntimeError
        } else {
            PortalExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Device variables exposed through the registry
struct Device {
    name: ValueSlot,
    uptime: ValueSlot,
    portal_ip: ValueSlot,
    ap_password: ValueSlot,
    stop_mm: ValueSlot,
    brightness: ValueSlot,
    lights: ValueSlot,
    offset_mm: ValueSlot,
}

impl Device {
    fn new(address: Ipv4Addr) -> Self {
        Self {
            name: ValueSlot::new(Value::Str("Car Stop".to_string())),
            uptime: ValueSlot::new(Value::Time(0)),
            portal_ip: ValueSlot::new(Value::Ip(address)),
            ap_password: ValueSlot::new(Value::Str("carstop123".to_string())),
            stop_mm: ValueSlot::new(Value::U32(500)),
            brightness: ValueSlot::new(Value::U8(128)),
            lights: ValueSlot::new(Value::Bool(true)),
            offset_mm: ValueSlot::new(Value::I32(0)),
        }
    }

    fn register(&self, registry: &mut DataPointRegistry) -> Result<()> {
        registry.add(DataPoint::settable("name", self.name.clone()))?;
        registry.add(DataPoint::read_only("uptime", self.uptime.clone()))?;
        registry.add(DataPoint::read_only("portal_ip", self.portal_ip.clone()))?;
        registry.add(
            DataPoint::settable("ap_password", self.ap_password.clone())
                .with_hook(is_valid_passphrase),
        )?;
        registry.add(DataPoint::settable("stop_mm", self.stop_mm.clone()).with_hook(is_valid_stop))?;
        registry.add(DataPoint::settable("brightness", self.brightness.clone()))?;
        registry.add(DataPoint::settable("lights", self.lights.clone()))?;
        registry.add(DataPoint::settable("offset_mm", self.offset_mm.clone()))?;
        Ok(())
    }
}

/// WPA2 passphrases are 8 to 63 printable ASCII characters
fn is_valid_passphrase(value: &Value) -> bool {
    match value {
        Value::Str(s) => (8..=63).contains(&s.len()) && s.bytes().all(|b| (b' '..=b'~').contains(&b)),
        _ => false,
    }
}

/// Stop distance must stay within the sensor's range
fn is_valid_stop(value: &Value) -> bool {
    matches!(value, Value::U32(mm) if (100..=4000).contains(mm))
}

/// Run the daemon
async fn run_daemon(config: PortalConfig) -> Result<()> {
    let device = Device::new(config.http.portal_address);
    let mut registry = DataPointRegistry::new();
    device.register(&mut registry)?;
    let registry = Arc::new(registry);
    info!("Registered {} data point(s)", registry.count());

    let mut router = HttpRouter::from_config(&config.http);
    router.add_path(WebPath::new("/", Methods::GET, Arc::new(StaticPage::html(INDEX_PAGE))))?;
    router.add_path(WebPath::new(
        "/points",
        Methods::GET,
        Arc::new(ListPoints::new(registry.clone())),
    ))?;
    router.add_path(WebPath::new(
        "/point",
        Methods::BOTH,
        Arc::new(PointAccess::new(registry.clone())),
    ))?;

    let (engine, mut events) = PortalEngine::bind(config, router)
        .await
        .context("Failed to bind portal listeners")?;

    // Log engine events
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    // Uptime clock
    let uptime = device.uptime.clone();
    let started = Instant::now();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Err(e) = uptime.set(Value::Time(ms)) {
                error!("Failed to update uptime: {}", e);
                break;
            }
        }
    });

    info!("Daemon initialized successfully");
    engine.run().await?;
    info!("Shutting down daemon");

    Ok(())
}
