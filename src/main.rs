use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_harvest::browser::ChromeNavigator;
use job_harvest::export::{self, ExportField};
use job_harvest::navigator::ThreadClock;
use job_harvest::sites::{KarieraScraper, LinkedInScraper, SiteScraper};
use job_harvest::{
    Credentials, IngestionPipeline, JobFilter, RoleClassifier, RolePatternTable, SearchCriterion,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "job_harvest")]
#[command(about = "Collect data and ML job postings from job boards")]
struct Cli {
    /// SQLite database holding the collected postings
    #[arg(long, global = true, env = "DATABASE_URL", default_value = "sqlite://jobs.db?mode=rwc")]
    database: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the job boards and store new postings
    Scrape {
        /// Search keywords, one search per value
        #[arg(
            long = "keywords",
            default_values_t = [
                "Data Scientist".to_string(),
                "Machine Learning".to_string(),
                "Data Analyst".to_string(),
                "ML Ops".to_string(),
            ]
        )]
        keywords: Vec<String>,

        #[arg(long, default_value = "Greece")]
        location: String,

        /// Listings to scan per keyword search
        #[arg(long, default_value_t = 250)]
        max_per_criterion: usize,

        #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Site::Linkedin, Site::Kariera])]
        sites: Vec<Site>,

        /// JSON file with `username` and `password` for LinkedIn
        #[arg(long, env = "LINKEDIN_CREDENTIALS")]
        credentials: Option<PathBuf>,

        /// JSON file mapping each role to its title patterns
        #[arg(long)]
        roles: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Write stored postings to a JSON report
    Export {
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value = export::DEFAULT_REPORT_PATH)]
        output: PathBuf,

        /// Comma-separated keys to keep in each posting
        #[arg(long, value_delimiter = ',')]
        fields: Vec<ExportField>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Site {
    Linkedin,
    Kariera,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let store = SqliteStore::connect(&cli.database)
        .await
        .with_context(|| format!("Failed to open database {}", cli.database))?;

    match cli.command {
        Commands::Scrape {
            keywords,
            location,
            max_per_criterion,
            sites,
            credentials,
            roles,
            headed,
        } => {
            let table = match roles {
                Some(path) => RolePatternTable::load(&path)?,
                None => RolePatternTable::default(),
            };
            let classifier = Arc::new(RoleClassifier::new(&table)?);
            let mut credentials = credentials
                .map(|path| Credentials::load(&path))
                .transpose()
                .context("Failed to load credentials")?;

            let mut scrapers: Vec<Box<dyn SiteScraper>> = Vec::new();
            for site in sites {
                let nav = ChromeNavigator::launch(!headed).context("Failed to launch Chrome")?;
                let clock = ThreadClock::default();
                match site {
                    Site::Linkedin => {
                        let mut scraper = LinkedInScraper::new(nav, clock, classifier.clone());
                        if let Some(credentials) = credentials.take() {
                            scraper = scraper.with_credentials(credentials);
                        }
                        scrapers.push(Box::new(scraper));
                    }
                    Site::Kariera => {
                        scrapers.push(Box::new(KarieraScraper::new(nav, clock, classifier.clone())));
                    }
                }
            }

            let criteria: Vec<_> = keywords
                .into_iter()
                .map(|k| SearchCriterion::new(k).with_location(location.clone()))
                .collect();

            let pipeline = IngestionPipeline::new(Arc::new(store));
            let summary = pipeline.run(&mut scrapers, &criteria, max_per_criterion).await;
            for report in &summary.reports {
                println!("{report}");
            }
            println!("{} new postings stored", summary.total_inserted());
        }

        Commands::Export {
            role,
            source,
            output,
            fields,
        } => {
            let mut filter = JobFilter::all();
            if let Some(role) = role {
                filter = filter.with_role(role);
            }
            if let Some(source) = source {
                filter = filter.with_source(source);
            }
            let fields = if fields.is_empty() {
                ExportField::defaults()
            } else {
                fields
            };

            let count = export::export_report(&store, &filter, &fields, &output)
                .await
                .context("Export failed")?;
            println!("Exported {count} postings to {}", output.display());
        }
    }

    Ok(())
}
