use strata::{BoxError, Config, DescriptionScope, Field, Fields, FlagScope};

/// Top-level configuration for the demo app.
#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    pub verbose: bool,
    pub api_token: String,
    pub tags: Vec<String>,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub tls: Option<TlsConfig>,
    pub upstreams: Vec<Upstream>,
}

impl Config for DemoConfig {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf(Field::new("verbose").describe("Enable verbose output."), &mut self.verbose)
            .leaf(
                Field::new("api_token").describe("Token sent to upstreams. Redacted in summaries."),
                &mut self.api_token,
            )
            .leaf(Field::new("tags").describe("Free-form tags."), &mut self.tags)
            .nested("server", &mut self.server)
            .nested("display", &mut self.display)
            .optional("tls", &mut self.tls)
            .seq(
                Field::new("upstreams").describe("Upstream services, tried in order."),
                &mut self.upstreams,
            );
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        flags.add("verbose", "verbose", "Enable verbose output.").switch();
        flags.add("tags", "tag", "Add a tag.").multiple();
    }

    fn post_load(&mut self) -> Result<(), BoxError> {
        if self.server.port == 0 {
            return Err("server.port must not be 0".into());
        }
        Ok(())
    }
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

impl Config for ServerConfig {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf("host", &mut self.host).leaf("port", &mut self.port);
    }

    fn describe_fields(&self, d: &mut DescriptionScope<'_>) {
        d.add("host", "Address to bind.");
        d.add("port", "Port to listen on.");
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        flags.add("host", "host", "Override the server host.");
        flags.add("port", "port", "Override the server port.").short('p');
    }
}

/// Display settings.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: "yellow".into(),
        }
    }
}

impl Config for DisplayConfig {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf(
            Field::new("color").describe("Output color: red, green, yellow, blue, magenta, cyan."),
            &mut self.color,
        );
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        flags.add("color", "color", "Override the display color.");
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub cert: String,
    pub key: String,
}

impl Config for TlsConfig {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf(Field::new("cert").describe("Certificate file."), &mut self.cert)
            .leaf(Field::new("key").describe("Private key file."), &mut self.key);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Upstream {
    pub name: String,
    pub url: String,
}

impl Config for Upstream {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf("name", &mut self.name).leaf("url", &mut self.url);
    }
}
