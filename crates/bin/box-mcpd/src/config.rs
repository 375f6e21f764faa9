use clap::{Parser, builder::BoolishValueParser};
use std::net::SocketAddr;
use std::time::Duration;

use box_core::auth::{Credentials, OAuthSettings, SubjectType};
use box_core::client::BoxEndpoints;
use box_core::paths::expand_home;
use box_mcp::server::McpHttpServerConfig;
use box_mcp::{ServerDescriptor, Transport};

const DEFAULT_TRANSPORT: &str = "stdio";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_AUTH_MODE: &str = "ccg";
const DEFAULT_SUBJECT_TYPE: &str = "enterprise";
const DEFAULT_REDIRECT_URL: &str = "http://localhost:8000/callback";
const DEFAULT_OAUTH_TOKEN_PATH: &str = "~/.box-mcp/oauth-token.json";

#[derive(Parser, Debug)]
#[command(name = "box-mcpd", version, about = "Box MCP daemon.")]
struct CliArgs {
    /// `stdio` or `http`.
    #[arg(long, env = "BOX_MCP_TRANSPORT", default_value = DEFAULT_TRANSPORT)]
    transport: String,

    #[arg(long, env = "BOX_MCP_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "BOX_MCP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, env = "BOX_MCP_SERVER_NAME")]
    server_name: Option<String>,

    #[arg(
        long,
        env = "BOX_MCP_STATEFUL",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    stateful: bool,

    /// `ccg`, `oauth` or `developer`.
    #[arg(long = "auth", env = "BOX_AUTH_MODE", default_value = DEFAULT_AUTH_MODE)]
    auth_mode: String,

    #[arg(long, env = "BOX_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "BOX_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    #[arg(long, env = "BOX_SUBJECT_TYPE", default_value = DEFAULT_SUBJECT_TYPE)]
    subject_type: String,

    #[arg(long, env = "BOX_SUBJECT_ID")]
    subject_id: Option<String>,

    #[arg(long, env = "BOX_REDIRECT_URL", default_value = DEFAULT_REDIRECT_URL)]
    redirect_url: String,

    #[arg(long, env = "BOX_OAUTH_TOKEN_PATH", default_value = DEFAULT_OAUTH_TOKEN_PATH)]
    oauth_token_path: String,

    #[arg(long, env = "BOX_DEVELOPER_TOKEN", hide_env_values = true)]
    developer_token: Option<String>,

    #[arg(long, env = "BOX_API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "BOX_UPLOAD_BASE_URL")]
    upload_base_url: Option<String>,

    #[arg(long, env = "BOX_AUTHORIZE_URL")]
    authorize_url: Option<String>,

    #[arg(long, env = "BOX_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct BoxConfig {
    pub transport: Transport,
    pub server_name: String,
    pub host: String,
    pub port: u16,
    pub http_addr: SocketAddr,
    pub stateful: bool,
    pub credentials: Credentials,
    pub endpoints: BoxEndpoints,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl BoxConfig {
    /// # Errors
    /// Returns `ConfigError` when a setting is missing or invalid.
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    #[must_use]
    pub fn descriptor(&self) -> ServerDescriptor {
        match self.transport {
            Transport::Stdio => ServerDescriptor::stdio(self.server_name.clone()),
            Transport::Http => {
                ServerDescriptor::http(self.server_name.clone(), self.host.clone(), self.port)
            }
        }
    }

    #[must_use]
    pub fn http_server(&self) -> McpHttpServerConfig {
        McpHttpServerConfig::new(self.http_addr).with_stateful_mode(self.stateful)
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    present(value).ok_or(ConfigError::MissingSetting(name))
}

fn credentials(args: &CliArgs) -> Result<Credentials, ConfigError> {
    match args.auth_mode.trim().to_ascii_lowercase().as_str() {
        "ccg" => {
            let subject_type = args.subject_type.parse::<SubjectType>().map_err(|_| {
                ConfigError::InvalidSetting {
                    name: "BOX_SUBJECT_TYPE",
                    value: args.subject_type.clone(),
                }
            })?;
            Ok(Credentials::ClientCredentials {
                client_id: required(args.client_id.clone(), "BOX_CLIENT_ID")?,
                client_secret: required(args.client_secret.clone(), "BOX_CLIENT_SECRET")?,
                subject_type,
                subject_id: required(args.subject_id.clone(), "BOX_SUBJECT_ID")?,
            })
        }
        "oauth" => Ok(Credentials::OAuth(OAuthSettings {
            client_id: required(args.client_id.clone(), "BOX_CLIENT_ID")?,
            client_secret: required(args.client_secret.clone(), "BOX_CLIENT_SECRET")?,
            redirect_uri: required(Some(args.redirect_url.clone()), "BOX_REDIRECT_URL")?,
            token_path: expand_home(args.oauth_token_path.trim()),
        })),
        "developer" => Ok(Credentials::DeveloperToken(required(
            args.developer_token.clone(),
            "BOX_DEVELOPER_TOKEN",
        )?)),
        _ => Err(ConfigError::InvalidSetting {
            name: "BOX_AUTH_MODE",
            value: args.auth_mode.clone(),
        }),
    }
}

/// The OAuth callback listener cannot share the MCP HTTP port.
fn check_redirect_port(redirect_uri: &str, http_port: u16) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidSetting {
        name: "BOX_REDIRECT_URL",
        value: redirect_uri.to_string(),
    };
    let redirect = reqwest::Url::parse(redirect_uri).map_err(|_| invalid())?;
    if redirect.port_or_known_default() == Some(http_port) {
        return Err(invalid());
    }
    Ok(())
}

impl TryFrom<CliArgs> for BoxConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let transport = args
            .transport
            .parse::<Transport>()
            .map_err(|_| ConfigError::InvalidSetting {
                name: "BOX_MCP_TRANSPORT",
                value: args.transport.clone(),
            })?;

        let host = args.host.trim().to_string();
        let http_addr = format!("{host}:{}", args.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSetting {
                name: "BOX_MCP_HOST",
                value: args.host.clone(),
            })?;

        let credentials = credentials(&args)?;
        if let (Transport::Http, Credentials::OAuth(settings)) = (transport, &credentials) {
            check_redirect_port(&settings.redirect_uri, args.port)?;
        }

        let mut endpoints = BoxEndpoints::default();
        if let Some(api_base) = present(args.api_base_url) {
            endpoints = endpoints.with_api_base(api_base);
        }
        if let Some(upload_base) = present(args.upload_base_url) {
            endpoints = endpoints.with_upload_base(upload_base);
        }
        if let Some(authorize_url) = present(args.authorize_url) {
            endpoints = endpoints.with_authorize_url(authorize_url);
        }

        let request_timeout = match args.request_timeout_secs {
            Some(0) => {
                return Err(ConfigError::InvalidSetting {
                    name: "BOX_REQUEST_TIMEOUT_SECS",
                    value: "0".to_string(),
                });
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            transport,
            server_name: present(args.server_name)
                .unwrap_or_else(|| ServerDescriptor::default_name(transport)),
            host,
            port: args.port,
            http_addr,
            stateful: args.stateful,
            credentials,
            endpoints,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            transport: DEFAULT_TRANSPORT.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            server_name: None,
            stateful: false,
            auth_mode: DEFAULT_AUTH_MODE.to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            subject_type: DEFAULT_SUBJECT_TYPE.to_string(),
            subject_id: Some("12345".to_string()),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            oauth_token_path: DEFAULT_OAUTH_TOKEN_PATH.to_string(),
            developer_token: None,
            api_base_url: None,
            upload_base_url: None,
            authorize_url: None,
            request_timeout_secs: None,
        }
    }

    #[test]
    fn defaults_to_stdio_with_client_credentials() {
        let config = BoxConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.server_name, "Box MCP STDIO Server");
        assert_eq!(config.credentials.mode(), "ccg");
        assert_eq!(config.endpoints, BoxEndpoints::default());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.descriptor().info().host, "N/A");
    }

    #[test]
    fn http_transport_binds_host_and_port() {
        let mut args = base_args();
        args.transport = "HTTP".to_string();
        args.host = "127.0.0.1".to_string();
        args.port = 9100;

        let config = BoxConfig::try_from(args).expect("config should parse");

        assert_eq!(config.server_name, "Box MCP HTTP Server");
        assert_eq!(config.http_addr, "127.0.0.1:9100".parse::<SocketAddr>().expect("addr"));
        assert!(!config.http_server().stateful_mode);
        assert_eq!(config.descriptor().port, Some(9100));
    }

    #[test]
    fn client_credentials_require_a_subject() {
        let mut args = base_args();
        args.subject_id = Some("  ".to_string());

        let err = BoxConfig::try_from(args).expect_err("subject id is required");

        assert!(matches!(err, ConfigError::MissingSetting("BOX_SUBJECT_ID")));
    }

    #[test]
    fn developer_mode_needs_only_a_token() {
        let mut args = base_args();
        args.auth_mode = "developer".to_string();
        args.client_id = None;
        args.client_secret = None;
        args.subject_id = None;
        args.developer_token = Some("dev-token".to_string());

        let config = BoxConfig::try_from(args).expect("config should parse");

        assert_eq!(config.credentials.mode(), "developer");
    }

    #[test]
    fn oauth_mode_expands_the_token_path() {
        let mut args = base_args();
        args.auth_mode = "oauth".to_string();
        args.oauth_token_path = "/var/lib/box-mcp/token.json".to_string();

        let config = BoxConfig::try_from(args).expect("config should parse");

        let Credentials::OAuth(settings) = config.credentials else {
            panic!("expected oauth credentials");
        };
        assert_eq!(settings.redirect_uri, DEFAULT_REDIRECT_URL);
        assert_eq!(
            settings.token_path,
            std::path::PathBuf::from("/var/lib/box-mcp/token.json")
        );
    }

    #[test]
    fn rejects_unknown_modes_and_transports() {
        let mut args = base_args();
        args.auth_mode = "jwt".to_string();
        assert!(matches!(
            BoxConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "BOX_AUTH_MODE", .. })
        ));

        let mut args = base_args();
        args.transport = "sse".to_string();
        assert!(matches!(
            BoxConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "BOX_MCP_TRANSPORT", .. })
        ));
    }

    #[test]
    fn endpoint_overrides_replace_production_hosts() {
        let mut args = base_args();
        args.api_base_url = Some("http://127.0.0.1:9000".to_string());
        args.request_timeout_secs = Some(30);

        let config = BoxConfig::try_from(args).expect("config should parse");

        assert_eq!(config.endpoints.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.endpoints.token_url(), "http://127.0.0.1:9000/oauth2/token");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn oauth_over_http_needs_a_separate_callback_port() {
        let mut args = base_args();
        args.transport = "http".to_string();
        args.auth_mode = "oauth".to_string();
        assert!(matches!(
            BoxConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "BOX_REDIRECT_URL", .. })
        ));

        let mut args = base_args();
        args.transport = "http".to_string();
        args.auth_mode = "oauth".to_string();
        args.redirect_url = "http://localhost:8001/callback".to_string();
        let config = BoxConfig::try_from(args).expect("config should parse");
        assert_eq!(config.port, 8000);
    }
}
