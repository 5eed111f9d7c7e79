use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration document holding the installation ledger [default: config.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory containing one subdirectory per bundle [default: ./bundles]
    #[arg(long, global = true, value_name = "PATH")]
    pub bundles_dir: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = "ECOBUNDLE_DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// Role granted default privileges on installed schemas [default: admin]
    #[arg(long, global = true, value_name = "ROLE")]
    pub admin_role: Option<String>,

    /// Timeout for each database call, in seconds [default: 30]
    #[arg(long, global = true, value_name = "SECS")]
    pub db_timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install a bundle
    Install {
        /// Bundle name, which is also its directory and schema name
        bundle: String,

        /// Also load demodata.sql
        #[arg(long)]
        demodata: bool,

        /// Uninstall the bundle first, then install it again
        #[arg(long, short = 'r')]
        reinstall: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Never prompt (requires --yes with --reinstall)
        #[arg(long)]
        non_interactive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Uninstall a bundle, dropping its schema and all data in it
    Uninstall {
        /// Bundle name
        bundle: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Never prompt (requires --yes)
        #[arg(long)]
        non_interactive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List installed bundles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the installation ledger with the database
    Verify {
        /// Rewrite the ledger to match the schemas that exist
        #[arg(long)]
        repair: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
