use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user with an optional access token
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Display name for the new user
        #[arg(long)]
        name: Option<String>,

        /// Create a token for the new user
        #[arg(long)]
        token: bool,

        /// Skip interactive prompts (requires --name)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List users with their progression
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
