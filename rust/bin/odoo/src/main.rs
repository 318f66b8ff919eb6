//! `odoo`: command-line client for the Odoo external API.
//!
//! Manages contexts (server + database + credentials) and runs model
//! operations against the current one.

mod commands;
mod config;

use std::io::Write;

use clap::{Parser, Subcommand};

use commands::model::{QueryArgs, ShowArgs};

/// Odoo CLI tool.
#[derive(Parser, Debug)]
#[command(name = "odoo", about = "Odoo XML-RPC client")]
struct Cli {
    /// Path to client config file (default: ~/.odoo/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Verify credentials against the current context and store them.
    Login {
        /// Login name.
        #[arg(long)]
        user: Option<String>,
        /// Password or API key (prompted when omitted).
        #[arg(long)]
        password: Option<String>,
    },

    /// Clear stored credentials from the current context.
    Logout,

    /// Show client and server versions.
    Version,

    /// Show the authenticated identity.
    Whoami,

    /// Count records matching a domain.
    Count {
        /// Model name (e.g. res.partner).
        model: String,
        /// Domain as JSON (e.g. '[["is_company","=",true]]').
        #[arg(long)]
        domain: Option<String>,
    },

    /// List ids of records matching a domain.
    Search {
        model: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Read records matching a domain.
    Get {
        model: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Comma-separated field names.
        #[arg(long)]
        fields: Option<String>,
        /// Fetch every page instead of a single call.
        #[arg(long)]
        all: bool,
        /// Page size for --all.
        #[arg(long, default_value_t = 80)]
        page_size: usize,
    },

    /// Show one record, optionally following relations.
    Show(ShowArgs),

    /// Show field metadata of a model.
    Fields {
        model: String,
        /// Comma-separated attributes (default: string,help,type).
        #[arg(long)]
        attributes: Option<String>,
    },

    /// Create a record.
    Create {
        model: String,
        /// JSON values.
        #[arg(long = "json")]
        json_body: Option<String>,
        /// Read JSON from file.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
    },

    /// Write values to records.
    Update {
        model: String,
        /// Comma-separated record ids.
        ids: String,
        /// JSON values.
        #[arg(long = "json")]
        json_body: String,
    },

    /// Delete records.
    Delete {
        model: String,
        /// Comma-separated record ids.
        ids: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Call an arbitrary model method.
    Call {
        model: String,
        method: String,
        /// Positional arguments as a JSON array.
        #[arg(long)]
        args: Option<String>,
        /// Keyword arguments as a JSON object.
        #[arg(long)]
        kwargs: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        /// Context name.
        name: String,
        /// Server URL.
        #[arg(long)]
        url: String,
        /// Database name.
        #[arg(long)]
        database: String,
        /// Accept invalid TLS certificates.
        #[arg(long)]
        skip_tls: bool,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        skip_tls: Option<bool>,
        /// Request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create {
                name,
                url,
                database,
                skip_tls,
            } => {
                commands::context::create(&name, &url, &database, skip_tls, &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set {
                name,
                url,
                database,
                skip_tls,
                timeout,
            } => {
                let changes = commands::context::ContextChanges {
                    url,
                    database,
                    skip_tls,
                    timeout_secs: timeout,
                };
                commands::context::set(&name, changes, &config_path)?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Login { user, password } => {
            let username = match user {
                Some(u) => u,
                None => prompt("Username: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            commands::login::login(&username, &password, &config_path)?;
        }

        Commands::Logout => {
            commands::login::logout(&config_path)?;
        }

        Commands::Version => {
            println!("odoo cli v{}", env!("CARGO_PKG_VERSION"));
            commands::login::server_version(&config_path)?;
        }

        Commands::Whoami => {
            commands::login::whoami(&config_path)?;
        }

        Commands::Count { model, domain } => {
            commands::model::count(&model, domain.as_deref(), &config_path)?;
        }

        Commands::Search { model, query } => {
            commands::model::search(&model, &query, &config_path)?;
        }

        Commands::Get {
            model,
            query,
            fields,
            all,
            page_size,
        } => {
            let fields = fields.as_deref().map(commands::model::parse_list).unwrap_or_default();
            if all {
                commands::model::get_all(&model, &query, &fields, page_size, &config_path)?;
            } else {
                commands::model::get(&model, &query, &fields, &config_path)?;
            }
        }

        Commands::Show(args) => {
            commands::model::show(&args, &config_path)?;
        }

        Commands::Fields { model, attributes } => {
            let attributes = attributes.as_deref().map(commands::model::parse_list);
            commands::model::fields(&model, attributes.as_deref(), &config_path)?;
        }

        Commands::Create {
            model,
            json_body,
            file,
        } => {
            let body = if let Some(path) = file {
                std::fs::read_to_string(&path)?
            } else if let Some(json) = json_body {
                json
            } else {
                anyhow::bail!("Provide --json or -f <file>.");
            };
            commands::model::create(&model, &body, &config_path)?;
        }

        Commands::Update {
            model,
            ids,
            json_body,
        } => {
            commands::model::update(&model, &ids, &json_body, &config_path)?;
        }

        Commands::Delete { model, ids, yes } => {
            if !yes {
                let answer = prompt(&format!("Delete {} {}? [y/N]: ", model, ids))?;
                if !answer.eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            commands::model::delete(&model, &ids, &config_path)?;
        }

        Commands::Call {
            model,
            method,
            args,
            kwargs,
        } => {
            commands::model::call(&model, &method, args.as_deref(), kwargs.as_deref(), &config_path)?;
        }
    }

    Ok(())
}

/// Read one trimmed line from stdin after printing `label` to stderr.
fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}
