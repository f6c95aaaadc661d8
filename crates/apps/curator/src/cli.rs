//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(version, about = "Organize saved web pages into folders")]
pub struct Cli {
    /// Backend base URL (overrides the config file and FAVORITES_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Read settings from this JSON file instead of ~/.config/favorites/client.json
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use built-in sample data instead of the server
    #[arg(long, global = true)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the folder tree
    Tree {
        /// Expand every folder instead of only the root
        #[arg(long)]
        all: bool,
    },
    /// Show a folder and its direct children
    Show { id: i64 },
    /// List favorites, optionally limited to a folder subtree
    List {
        #[arg(long)]
        folder: Option<i64>,
        /// Print full summaries instead of previews
        #[arg(long)]
        full: bool,
    },
    /// Create a folder
    Mkdir {
        name: String,
        /// Parent folder (defaults to the root)
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a folder; its children move up to its parent
    Rmdir { id: i64 },
    /// Move a folder under a new parent
    Mv {
        id: i64,
        #[arg(long)]
        to: i64,
    },
    /// Rename a folder
    Rename {
        id: i64,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Save a web page; the server summarizes it in the background
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        folder: Option<i64>,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Page metadata handed to the summarizer (for example meta tags)
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Show background tasks
    Tasks {
        /// Show a single task
        #[arg(long)]
        id: Option<String>,
        /// Keep polling until interrupted
        #[arg(long, conflicts_with = "id")]
        watch: bool,
        /// Poll period for --watch (defaults to the configured interval)
        #[arg(long, requires = "watch")]
        interval_ms: Option<u64>,
    },
    /// Semantic search over saved pages
    Search { query: String },
    /// Manage the client config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved settings
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_requires_subcommand() {
        let err = match Cli::try_parse_from(["curator"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn test_add_with_tags() {
        let cli = Cli::try_parse_from([
            "curator",
            "add",
            "https://example.com",
            "--tag",
            "docs",
            "--tag",
            "rust",
            "--folder",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Add {
                url,
                tags,
                folder,
                title,
                metadata,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(tags, vec!["docs", "rust"]);
                assert_eq!(folder, Some(3));
                assert_eq!(title, None);
                assert_eq!(metadata, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_add_with_metadata() {
        let cli = Cli::try_parse_from([
            "curator",
            "add",
            "https://example.com",
            "--metadata",
            "description: Example page",
        ])
        .unwrap();
        match cli.command {
            Command::Add { metadata, .. } => {
                assert_eq!(metadata.as_deref(), Some("description: Example page"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["curator", "tree", "--demo", "--api-url", "http://x:1"]).unwrap();
        assert!(cli.demo);
        assert_eq!(cli.api_url.as_deref(), Some("http://x:1"));
    }

    #[test]
    fn test_mv_requires_target() {
        let err = Cli::try_parse_from(["curator", "mv", "4"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_interval_requires_watch() {
        assert!(Cli::try_parse_from(["curator", "tasks", "--interval-ms", "100"]).is_err());
        assert!(Cli::try_parse_from(["curator", "tasks", "--watch", "--interval-ms", "100"]).is_ok());
    }
}
