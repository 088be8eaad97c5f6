use std::num::NonZeroUsize;

use clap::Parser;
use iotdb_client::{
    RestSession, Session, SessionConfig, ZoneId,
    session::{DEFAULT_FETCH_SIZE, DEFAULT_REST_PORT},
};
use iotdb_tablet_bench::memory::MemorySession;
use observability_deps::tracing::info;
use secrecy::Secret;

#[derive(Debug, Parser)]
pub(crate) struct SessionArgs {
    /// The host of the running IoTDB server
    #[clap(long = "host", env = "IOTDB_HOST", default_value = "127.0.0.1")]
    pub(crate) host: String,

    /// The port of the server's REST service
    #[clap(long = "port", env = "IOTDB_PORT", default_value_t = DEFAULT_REST_PORT)]
    pub(crate) port: u16,

    /// The user to authenticate as
    #[clap(long = "username", env = "IOTDB_USERNAME", default_value = "root")]
    pub(crate) username: String,

    /// The password of the user
    #[clap(
        long = "password",
        env = "IOTDB_PASSWORD",
        default_value = "root",
        hide_default_value = true,
        hide_env_values = true
    )]
    pub(crate) password: Secret<String>,

    /// The default number of rows a query may return per round trip
    #[clap(long = "fetch-size", env = "IOTDB_FETCH_SIZE", default_value_t = DEFAULT_FETCH_SIZE)]
    pub(crate) fetch_size: NonZeroUsize,

    /// The time zone of the session, e.g. `UTC+8` or `-05:30`
    #[clap(long = "zone-id", env = "IOTDB_ZONE_ID", default_value_t = ZoneId::default())]
    pub(crate) zone_id: ZoneId,

    /// Run against an in-process store instead of a server
    #[clap(long = "dry-run", default_value_t = false)]
    pub(crate) dry_run: bool,
}

impl SessionArgs {
    /// A session that has not been opened yet
    pub(crate) fn session(&self) -> Box<dyn Session> {
        if self.dry_run {
            info!("dry run, inserting into an in-process store");
            return Box::new(MemorySession::new(self.fetch_size));
        }
        Box::new(RestSession::new(SessionConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            fetch_size: self.fetch_size,
            zone_id: self.zone_id,
        }))
    }
}

#[derive(Debug, Parser)]
pub(crate) struct ValueArgs {
    /// Seed of the run; only affects values when `--random-values` is set
    #[clap(long = "seed", env = "IOTDB_BENCH_SEED", default_value_t = 0)]
    pub(crate) seed: u64,

    /// Fill cells with seeded random values instead of one fixed sample per data type
    #[clap(long = "random-values", default_value_t = false)]
    pub(crate) random_values: bool,
}
