use clap::{Parser, Subcommand};
use rackops_common::validate::{MAX_VOLUME_GB, MIN_CDN_TTL, MIN_DNS_TTL};
use rackops_common::{Algorithm, RackopsError, Region, VipType};
use rackops_orchestrator::config::{connect, default_credentials_path, expand_home, PollIntervals, ProviderKind};
use rackops_orchestrator::workflows::balanced_servers::{self, BalancedServersOptions};
use rackops_orchestrator::workflows::build_servers::{self, BuildServersOptions};
use rackops_orchestrator::workflows::cdn_container::{self, CdnContainerOptions};
use rackops_orchestrator::workflows::clone_server::{self, CloneServerOptions};
use rackops_orchestrator::workflows::cloud_database::{self, DatabaseOptions};
use rackops_orchestrator::workflows::server_dns::{self, ServerDnsOptions, DEFAULT_IMAGE_ID};
use rackops_orchestrator::workflows::static_site::{self, StaticSiteOptions};
use rackops_orchestrator::workflows::upload_folder::{self, UploadFolderOptions};
use rackops_orchestrator::workflows::web_stack::{self, WebStackOptions};
use rackops_orchestrator::workflows::{add_record, Outcome, Session};
use rackops_orchestrator::Console;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rackops",
    about = "Provision servers, storage, DNS, load balancers and databases on Rackspace Cloud",
    version,
    propagate_version = true
)]
struct Cli {
    /// Credentials file (default: ~/.rackspace_cloud_credentials)
    ///
    /// RAX_USERNAME, RAX_API_KEY and RAX_REGION set in the environment, or in a
    /// `.env` file in the working directory, take precedence over the file's values.
    #[arg(long, global = true, env = "RACKOPS_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Provider backend
    #[arg(long, global = true, env = "RACKOPS_PROVIDER", value_enum, default_value = "rackspace")]
    provider: ProviderKind,

    /// Region to work in (default: RAX_REGION, then ORD)
    #[arg(long, global = true)]
    region: Option<Region>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a batch of identical servers
    BuildServers {
        #[arg(long, default_value = "server")]
        prefix: String,
        /// Flavor RAM in MB
        #[arg(long, default_value_t = 512)]
        ram: u32,
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=20))]
        count: u32,
        /// Image name fragment
        #[arg(long, default_value = "Squeeze")]
        image: String,
    },

    /// Clone a server through an intermediate image
    CloneServer {
        /// Id of the server to clone
        #[arg(long)]
        server: String,
        /// Clone name (default: source name + "-copy")
        #[arg(long)]
        name: Option<String>,
    },

    /// Upload a local directory into a container
    UploadDirectory {
        #[arg(long)]
        directory: PathBuf,
        #[arg(long)]
        container: String,
    },

    /// Interactively add an A record to a DNS zone
    AddRecord,

    /// Create a database instance with a database and a user
    CreateDatabase {
        #[arg(long)]
        instance: String,
        /// Memory in MB (512, 1024, 2048, 4096, 8192, 16384)
        #[arg(long, default_value_t = 512)]
        memory: u32,
        /// Volume size in GB
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_VOLUME_GB as i64))]
        volume: u32,
        #[arg(long, default_value = "mydb")]
        db_name: String,
        #[arg(long, default_value = "dbuser")]
        user: String,
        /// Generated when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value = "%")]
        host: String,
    },

    /// Upload a directory into a CDN-enabled container
    CdnContainer {
        #[arg(long)]
        directory: PathBuf,
        #[arg(long)]
        container: String,
        #[arg(long, default_value_t = MIN_CDN_TTL, value_parser = clap::value_parser!(u32).range(MIN_CDN_TTL as i64..))]
        ttl: u32,
        /// Reuse an existing container
        #[arg(long)]
        force: bool,
    },

    /// Build servers behind a new load balancer
    BalancedServers {
        #[arg(long, default_value = "server-")]
        prefix: String,
        #[arg(long, default_value = "1 GB Performance")]
        flavor: String,
        /// Image name fragment
        #[arg(long, default_value = "Debian 7 (Wheezy")]
        image: String,
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=10))]
        count: u32,
        /// Load balancer name (default: prefix + "lb")
        #[arg(long)]
        lb_name: Option<String>,
        /// PUBLIC or SERVICENET
        #[arg(long, default_value = "PUBLIC")]
        vip_type: VipType,
        #[arg(long, default_value = "RANDOM")]
        algorithm: Algorithm,
        #[arg(long, default_value_t = 80)]
        port: u16,
    },

    /// Publish a directory as a CDN static site with a CNAME
    StaticSite {
        #[arg(long)]
        directory: PathBuf,
        #[arg(long)]
        container: String,
        #[arg(long)]
        fqdn: String,
        #[arg(long, default_value_t = MIN_CDN_TTL, value_parser = clap::value_parser!(u32).range(MIN_CDN_TTL as i64..))]
        cdn_ttl: u32,
        #[arg(long, default_value = "index.html")]
        index: String,
        #[arg(long, default_value_t = MIN_DNS_TTL, value_parser = clap::value_parser!(u32).range(MIN_DNS_TTL as i64..))]
        cname_ttl: u32,
        /// Reuse an existing container
        #[arg(long)]
        force: bool,
    },

    /// Build a server and add an A record for it
    ServerDns {
        #[arg(long)]
        fqdn: String,
        #[arg(long, default_value = DEFAULT_IMAGE_ID)]
        image_id: String,
        /// RAM in MB (512, 1024, 2048, 4096, 8192, 15360, 30720)
        #[arg(long, default_value_t = 512)]
        ram: u32,
        #[arg(long, default_value_t = MIN_DNS_TTL, value_parser = clap::value_parser!(u32).range(MIN_DNS_TTL as i64..))]
        ttl: u32,
    },

    /// Build servers behind a monitored load balancer with DNS and an error page
    WebStack {
        #[arg(long)]
        fqdn: String,
        /// SSH public key injected as root's authorized_keys
        #[arg(long)]
        ssh_key: PathBuf,
        #[arg(long, default_value = "server")]
        prefix: String,
        #[arg(long, default_value_t = 512)]
        ram: u32,
        #[arg(long, default_value = DEFAULT_IMAGE_ID)]
        image_id: String,
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=10))]
        count: u32,
        /// Load balancer name (default: prefix + "-lb")
        #[arg(long)]
        lb_name: Option<String>,
        /// PUBLIC or SERVICENET
        #[arg(long, default_value = "PUBLIC")]
        vip_type: VipType,
        #[arg(long, default_value = "RANDOM")]
        algorithm: Algorithm,
        #[arg(long, default_value_t = 80)]
        port: u16,
        /// Container receiving a copy of the error page
        #[arg(long, default_value = "lb-page-backup")]
        container: String,
        #[arg(long, default_value_t = MIN_DNS_TTL, value_parser = clap::value_parser!(u32).range(MIN_DNS_TTL as i64..))]
        ttl: u32,
    },
}

async fn dispatch(cli: Cli) -> Result<Outcome, RackopsError> {
    let credentials = cli
        .credentials
        .map(|p| expand_home(&p))
        .unwrap_or_else(default_credentials_path);
    let cloud = connect(cli.provider, &credentials, cli.region).await?;
    let mut session = Session::new(cloud, PollIntervals::default(), Console::stdout());

    match cli.command {
        Commands::BuildServers {
            prefix,
            ram,
            count,
            image,
        } => {
            let opts = BuildServersOptions {
                prefix,
                ram_mb: ram,
                count,
                image,
            };
            build_servers::run(&mut session, &opts).await
        }
        Commands::CloneServer { server, name } => {
            let opts = CloneServerOptions {
                source_id: server,
                name,
            };
            clone_server::run(&mut session, &opts).await
        }
        Commands::UploadDirectory {
            directory,
            container,
        } => {
            let opts = UploadFolderOptions {
                directory,
                container,
            };
            upload_folder::run(&mut session, &opts).await
        }
        Commands::AddRecord => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            add_record::run(&mut session, &mut input).await
        }
        Commands::CreateDatabase {
            instance,
            memory,
            volume,
            db_name,
            user,
            password,
            host,
        } => {
            let opts = DatabaseOptions {
                memory_mb: memory,
                volume_gb: volume,
                db_name,
                username: user,
                password,
                host,
                ..DatabaseOptions::new(instance)
            };
            cloud_database::run(&mut session, &opts).await
        }
        Commands::CdnContainer {
            directory,
            container,
            ttl,
            force,
        } => {
            let opts = CdnContainerOptions {
                directory,
                container,
                ttl,
                force,
            };
            cdn_container::run(&mut session, &opts).await
        }
        Commands::BalancedServers {
            prefix,
            flavor,
            image,
            count,
            lb_name,
            vip_type,
            algorithm,
            port,
        } => {
            let opts = BalancedServersOptions {
                prefix,
                flavor,
                image,
                count,
                lb_name,
                vip_type,
                algorithm,
                port,
            };
            balanced_servers::run(&mut session, &opts).await
        }
        Commands::StaticSite {
            directory,
            container,
            fqdn,
            cdn_ttl,
            index,
            cname_ttl,
            force,
        } => {
            let opts = StaticSiteOptions {
                cdn_ttl,
                index,
                cname_ttl,
                force,
                ..StaticSiteOptions::new(directory, container, fqdn)
            };
            static_site::run(&mut session, &opts).await
        }
        Commands::ServerDns {
            fqdn,
            image_id,
            ram,
            ttl,
        } => {
            let opts = ServerDnsOptions {
                image_id,
                ram_mb: ram,
                ttl,
                ..ServerDnsOptions::new(fqdn)
            };
            server_dns::run(&mut session, &opts).await
        }
        Commands::WebStack {
            fqdn,
            ssh_key,
            prefix,
            ram,
            image_id,
            count,
            lb_name,
            vip_type,
            algorithm,
            port,
            container,
            ttl,
        } => {
            let opts = WebStackOptions {
                prefix,
                ram_mb: ram,
                image_id,
                count,
                lb_name,
                vip_type,
                algorithm,
                port,
                container,
                ttl,
                ..WebStackOptions::new(fqdn, ssh_key)
            };
            web_stack::run(&mut session, &opts).await
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match dispatch(cli).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::debug!("workflow failed: {:?}", e);
            eprintln!("ERROR: {:#}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn credentials_help_states_env_precedence() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "credentials")
            .unwrap();
        let help = arg.get_long_help().unwrap().to_string();
        assert!(help.contains(".env"));
        assert!(help.contains("take precedence"));
    }

    #[test]
    fn web_stack_region_flag_follows_subcommand() {
        let cli = Cli::try_parse_from([
            "rackops",
            "web-stack",
            "--fqdn",
            "www.example.com",
            "--ssh-key",
            "id.pub",
            "--region",
            "lon",
        ])
        .unwrap();
        assert_eq!(cli.region, Some(Region::Lon));
    }
}
