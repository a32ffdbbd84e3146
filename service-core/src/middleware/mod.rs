pub mod metrics;
pub mod panic;
pub mod rate_limit;
pub mod request_id;

pub use metrics::metrics_middleware;
pub use panic::catch_panic_layer;
pub use rate_limit::{IpRateLimit, ip_rate_limit_middleware};
pub use request_id::{REQUEST_ID_HEADER, request_id_layers};
