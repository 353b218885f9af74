//! Runtime configuration.
//!
//! The settings file is camelCase JSON. [`Settings::load`] resolves the
//! environment-derived fields once, so everything downstream of it sees a
//! fully-resolved struct and [`Settings::bind_addr`] stays a pure function.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// Environment marker present in sandboxed test environments. Those are
/// frequently IPv6-only with no default route, where binding `0.0.0.0` (and
/// even resolving `ip6-localhost`) fails, so binds are forced to `[::1]`.
const SANDBOX_MARKER: &str = "TEST_TMPDIR";

/// Configuration for one dispatcher instance.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Port the dispatcher listens on.
    pub server_port: u16,
    /// Address to bind. `None` binds all interfaces.
    pub server_host: Option<IpAddr>,
    /// Port of the embedded notebook server.
    pub notebook_port: u16,
    /// Container the terminal handler opens its sessions in.
    pub kernel_container_name: String,
    /// Path prefix of the debug-adapter multiplexer. Setting it registers
    /// the debug handler.
    pub debug_adapter_multiplexer_path: Option<String>,
    /// Registers the language-server handler.
    pub enable_lsp: bool,
    /// Installation root. The language server derives its content and log
    /// directories from it.
    pub root_dir: PathBuf,
    /// Content directory, relative to `root_dir`.
    pub content_dir: PathBuf,
    /// Forces binds to the IPv6 loopback address. Resolved from the
    /// execution environment by [`Settings::load`]; overrides the address
    /// only, never the port.
    #[serde(skip)]
    pub force_ipv6_loopback: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_port: 8080,
            server_host: None,
            notebook_port: 8888,
            kernel_container_name: String::new(),
            debug_adapter_multiplexer_path: None,
            enable_lsp: false,
            root_dir: PathBuf::from("/"),
            content_dir: PathBuf::from("content"),
            force_ipv6_loopback: false,
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file and resolves environment-derived
    /// fields.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(Error::Read)?;
        let mut settings: Settings = serde_json::from_str(&text).map_err(Error::Parse)?;
        settings.force_ipv6_loopback = sandbox_marker_present();
        Ok(settings)
    }

    /// The socket address `run` binds.
    ///
    /// The sandbox override wins over any configured host; the configured
    /// port is always kept.
    pub fn bind_addr(&self) -> SocketAddr {
        let host = if self.force_ipv6_loopback {
            IpAddr::V6(Ipv6Addr::LOCALHOST)
        } else {
            self.server_host
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        };
        SocketAddr::new(host, self.server_port)
    }
}

fn sandbox_marker_present() -> bool {
    std::env::var_os(SANDBOX_MARKER).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_is_all_interfaces() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn configured_host_and_port_are_used() {
        let settings = Settings {
            server_port: 9090,
            server_host: Some("127.0.0.1".parse().unwrap()),
            ..Settings::default()
        };
        assert_eq!(settings.bind_addr(), "127.0.0.1:9090".parse().unwrap());
    }

    #[test]
    fn sandbox_override_forces_v6_loopback_but_keeps_port() {
        let settings = Settings {
            server_port: 4321,
            server_host: Some("10.0.0.1".parse().unwrap()),
            force_ipv6_loopback: true,
            ..Settings::default()
        };
        assert_eq!(settings.bind_addr(), "[::1]:4321".parse().unwrap());
    }

    #[test]
    fn load_parses_camel_case_json() {
        let path = std::env::temp_dir().join(format!("usher-settings-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "serverPort": 7000,
                "serverHost": "127.0.0.1",
                "notebookPort": 7100,
                "kernelContainerName": "kernel",
                "debugAdapterMultiplexerPath": "/debugger",
                "enableLsp": true
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.server_port, 7000);
        assert_eq!(settings.server_host, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(settings.notebook_port, 7100);
        assert_eq!(settings.kernel_container_name, "kernel");
        assert_eq!(
            settings.debug_adapter_multiplexer_path.as_deref(),
            Some("/debugger")
        );
        assert!(settings.enable_lsp);
        // Unset fields keep their defaults.
        assert_eq!(settings.root_dir, PathBuf::from("/"));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!("usher-bad-settings-{}.json", std::process::id()));
        std::fs::write(&path, "{not json").unwrap();
        let result = Settings::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
