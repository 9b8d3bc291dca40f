use clap::{Args, Parser, Subcommand, ValueEnum};
use gh_client::MergeMethod;
use gh_client_config::ClientConfig;

#[derive(Parser, Debug)]
#[command(
    name = "gh-pr-automate",
    version,
    about = "Automate GitHub pull requests from scripts and CI",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that win over the config file and the environment
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientArgs {
    /// API root, e.g. https://github.example.com/api/v3
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Host whose gh CLI login is used when no token is configured
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Lifetime of cached branch lookups, in seconds
    #[arg(long, global = true)]
    pub cache_ttl_secs: Option<u64>,
}

impl ClientArgs {
    /// Overrides for `ClientConfig::discover_with`; omitted flags stay unset
    pub fn overrides(&self) -> ClientConfig {
        ClientConfig {
            base_uri: self.api_url.clone().unwrap_or_default(),
            host: self.host.clone().unwrap_or_default(),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or_default(),
            ..ClientConfig::unset()
        }
    }
}

/// Repository coordinates shared by most subcommands
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RepoArgs {
    /// Repository owner (user or organization)
    #[arg(long, short = 'o', env = "GITHUB_OWNER")]
    pub owner: String,

    /// Repository name
    #[arg(long, short = 'r', env = "GITHUB_REPO")]
    pub repo: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the login of the authenticated user
    Whoami,

    /// Print the repository node id and default branch
    RepoInfo {
        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Print the number of the open PR whose head is the given branch
    FindPr {
        #[command(flatten)]
        repo: RepoArgs,

        /// Head branch name
        #[arg(long, short = 'b')]
        branch: String,
    },

    /// Print a pull request as JSON
    ShowPr {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long, short = 'n')]
        number: u64,
    },

    /// Open a pull request
    CreatePr {
        #[command(flatten)]
        repo: RepoArgs,

        /// Branch the changes are merged into
        #[arg(long)]
        base: String,

        /// Branch that holds the changes
        #[arg(long)]
        head: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        body: String,
    },

    /// Approve a pull request
    Approve {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long, short = 'n')]
        number: u64,

        /// Review message
        #[arg(long, short = 'm', default_value = "")]
        message: String,
    },

    /// Merge a pull request now
    Merge {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long, short = 'n')]
        number: u64,

        #[arg(long, value_enum, default_value_t = MergeArg::Squash)]
        method: MergeArg,
    },

    /// Merge a pull request once its checks pass
    AutoMerge {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long, short = 'n')]
        number: u64,

        #[arg(long, value_enum, default_value_t = MergeArg::Squash)]
        method: MergeArg,
    },

    /// Comment on a pull request
    Comment {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long, short = 'n')]
        number: u64,

        /// Comment text (Markdown)
        #[arg(long)]
        body: String,
    },

    /// Dispatch a workflow run
    TriggerWorkflow {
        #[command(flatten)]
        repo: RepoArgs,

        /// Workflow file name (e.g. deploy.yml) or numeric id
        #[arg(long, short = 'w')]
        workflow: String,

        /// Branch or tag the workflow runs on
        #[arg(long = "ref")]
        git_ref: String,

        /// Workflow input as key=value, repeatable
        #[arg(long = "input", short = 'i', value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },

    /// Print the access token in use
    Token,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeArg {
    Merge,
    Squash,
    Rebase,
}

impl From<MergeArg> for MergeMethod {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Merge => MergeMethod::Merge,
            MergeArg::Squash => MergeMethod::Squash,
            MergeArg::Rebase => MergeMethod::Rebase,
        }
    }
}

/// Split `key=value`; the value may itself contain `=`
fn parse_input(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}
