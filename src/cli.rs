use clap::Parser;

/// Scan a Singularity and return data
///
/// Environment presets are sets of useful environment variables selected with
/// `-x <num>`; preset 1 is TASK_HOST, PORT0.
#[derive(Parser, Debug)]
#[command(name = "cygnus", version)]
pub struct Cli {
    /// Base URL of the Singularity service
    pub url: String,

    /// Don't print the header line
    #[arg(short = 'H', long)]
    pub no_print_headers: bool,

    /// Do not print the active deploys
    #[arg(short = 'A', long)]
    pub no_print_active: bool,

    /// Also include pending deploys
    #[arg(short = 'p', long)]
    pub print_pending: bool,

    /// Environment variable to print; may be repeated
    #[arg(long = "env", value_name = "ENV")]
    pub env: Vec<String>,

    /// Use environment preset <NUM>
    #[arg(short = 'x', value_name = "NUM")]
    pub preset: Option<u32>,

    /// Include recent inactive tasks, and print tasks in any state
    #[arg(short = 'i', long)]
    pub include_inactive: bool,

    /// Print each task's latest status
    #[arg(short = 's', long)]
    pub include_status: bool,

    /// Print each task's docker image
    #[arg(short = 'd', long)]
    pub docker_image: bool,

    /// List request deploys instead of tasks
    #[arg(long)]
    pub deploys: bool,

    /// Maximum number of concurrent task fetches
    #[arg(long)]
    pub workers: Option<usize>,

    /// Do not record results in the cache database
    #[arg(long)]
    pub no_cache: bool,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    #[arg(long)]
    pub logging_level: Option<String>,

    /// Print debugging information
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_flag_set() {
        let cli = Cli::try_parse_from([
            "cygnus", "-H", "-p", "--env", "PORT0", "--env", "TASK_HOST", "-x", "1", "-s",
            "http://singularity",
        ])
        .unwrap();
        assert!(cli.no_print_headers);
        assert!(!cli.no_print_active);
        assert!(cli.print_pending);
        assert_eq!(cli.env, vec!["PORT0", "TASK_HOST"]);
        assert_eq!(cli.preset, Some(1));
        assert!(cli.include_status);
        assert_eq!(cli.url, "http://singularity");
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["cygnus", "-i"]).is_err());
    }
}
