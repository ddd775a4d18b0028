use std::net::SocketAddr;

use clap::Parser;

/// Runtime settings, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "scholarship-admin", version, about = "Admin backend for scholarships, organizations and their members")]
pub struct Config {
    /// PostgreSQL connection string. Without it records live in memory.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address the console API listens on.
    #[arg(long, env = "SCHOLARSHIP_ADMIN_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}
