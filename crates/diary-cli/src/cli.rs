use clap::{Args, Parser, Subcommand};

use diary_core::VERSION;

/// Diary - an encrypted, local-first journal
#[derive(Parser)]
#[command(name = "diary")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Journal to use (id or name); defaults to the active journal
    #[arg(short, long, global = true, env = "DIARY_JOURNAL")]
    pub journal: Option<String>,

    /// Unlock with this key file instead of a password
    #[arg(short, long, global = true, env = "DIARY_KEYFILE")]
    pub keyfile: Option<String>,

    /// Config file path
    #[arg(long, global = true, env = "DIARY_CONFIG")]
    pub config: Option<String>,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_input: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new encrypted diary
    Init(InitArgs),

    /// Write a new entry
    Write(WriteArgs),

    /// Show the entries for a day
    Show(ShowArgs),

    /// Edit an entry
    Edit(EditArgs),

    /// Delete an entry
    Delete {
        /// Entry ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List all entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search entries using full-text search
    Search {
        /// Search query
        #[arg(value_name = "QUERY")]
        query: String,

        /// Limit number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List days with entries, or step to the nearest one
    Dates(DatesArgs),

    /// Writing statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import entries from another diary
    Import(ImportArgs),

    /// Export every entry to a JSON or markdown file
    Export {
        /// Destination file
        #[arg(value_name = "PATH")]
        path: String,

        /// Output format: json or markdown
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Verify that every entry decrypts and the search index is consistent
    Check,

    /// Delete the diary file (backups are kept)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Manage authentication methods
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Manage journals
    #[command(subcommand)]
    Journal(JournalCommand),
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Journal name, used when registering a new journal
    #[arg(long, default_value = "Diary")]
    pub name: String,

    /// Database path for a new journal
    #[arg(value_name = "PATH")]
    pub path: Option<String>,
}

/// Arguments for the `write` command
#[derive(Args)]
pub struct WriteArgs {
    /// Entry title
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Entry body (read from stdin when omitted)
    #[arg(long)]
    pub body: Option<String>,

    /// Day of the entry (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Day to show (YYYY-MM-DD), defaults to today
    #[arg(value_name = "DATE")]
    pub date: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `edit` command
#[derive(Args)]
pub struct EditArgs {
    /// Entry ID
    #[arg(value_name = "ID")]
    pub id: String,

    /// New title
    #[arg(short, long)]
    pub title: Option<String>,

    /// New body
    #[arg(long)]
    pub body: Option<String>,
}

/// Arguments for the `dates` command
#[derive(Args)]
pub struct DatesArgs {
    /// Print the first day with entries after this date
    #[arg(long, value_name = "DATE", conflicts_with = "before")]
    pub after: Option<String>,

    /// Print the last day with entries before this date
    #[arg(long, value_name = "DATE")]
    pub before: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `import` command
#[derive(Args)]
pub struct ImportArgs {
    /// Source format: mini-diary-json, dayone-json, dayone-txt, jrnl-json
    #[arg(short, long)]
    pub format: String,

    /// File to import
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum AuthCommand {
    /// List authentication methods
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a password method
    AddPassword,

    /// Add a key file method, generating the key file if it does not exist
    AddKeyfile {
        /// Key file path
        #[arg(value_name = "PATH")]
        path: String,

        /// Label for the method
        #[arg(long, default_value = "Key file")]
        label: String,
    },

    /// Remove a method by id
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Change the password
    ChangePassword,

    /// Check a password against the diary without changing anything
    Verify,
}

#[derive(Subcommand)]
pub enum JournalCommand {
    /// List journals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a journal
    Add {
        /// Display name
        #[arg(value_name = "NAME")]
        name: String,

        /// Database path
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Unregister a journal (its file is kept)
    Remove {
        /// Journal id or name
        #[arg(value_name = "JOURNAL")]
        journal: String,
    },

    /// Rename a journal
    Rename {
        /// Journal id or name
        #[arg(value_name = "JOURNAL")]
        journal: String,

        /// New name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Make a journal the active one
    Use {
        /// Journal id or name
        #[arg(value_name = "JOURNAL")]
        journal: String,
    },
}
