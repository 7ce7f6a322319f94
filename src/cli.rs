use clap::{Parser, Subcommand, ValueEnum};

/// schemarag: retrieves the relevant slice of a database schema graph for a
/// natural-language question and turns it into SQL
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Schema graph retrieval for text-to-SQL"
)]
pub struct Cli {
    /// Graph database path (overrides SCHEMARAG_GRAPH_DB)
    #[arg(long, global = true)]
    pub graph_db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the schema graph to the graph database
    Seed {
        /// JSON schema description (defaults to the built-in e-commerce schema)
        #[arg(long, short)]
        schema: Option<String>,
    },

    /// Show the schema subgraph retrieved for a question
    Retrieve {
        /// Natural language question (e.g., "monthly sales per category")
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Answer a question: retrieve schema, generate SQL, run it, summarize
    Ask {
        /// Natural language question
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Data database the generated SQL runs against (overrides SCHEMARAG_DATA_DB)
        #[arg(long)]
        data_db: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Start the HTTP API server
    #[cfg(feature = "http")]
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value_t = 8080)]
        port: u16,

        /// Data database the generated SQL runs against (overrides SCHEMARAG_DATA_DB)
        #[arg(long)]
        data_db: Option<String>,
    },
}

/// Retrieval and LLM flags shared by several subcommands
#[derive(clap::Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// Maximum number of seed nodes
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Maximum number of expansion hops
    #[arg(long)]
    pub max_hops: Option<usize>,

    /// Skip LLM keyword augmentation and use only the question's own tokens
    #[arg(long)]
    pub no_llm: bool,

    /// LLM provider (openrouter, openai, mock)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM model name
    #[arg(long)]
    pub llm_model: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_retrieve_flags() {
        let cli = Cli::parse_from([
            "schemarag",
            "retrieve",
            "注文の合計金額",
            "--top-k",
            "5",
            "--max-hops",
            "1",
            "--no-llm",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Retrieve {
                question,
                retrieval,
                format,
            } => {
                assert_eq!(question, "注文の合計金額");
                assert_eq!(retrieval.top_k, Some(5));
                assert_eq!(retrieval.max_hops, Some(1));
                assert!(retrieval.no_llm);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected retrieve"),
        }
    }
}
