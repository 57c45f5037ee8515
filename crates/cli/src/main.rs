use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cohort_client::HttpCohortClient;
use cohort_core::config::{api_url_from_env_value, root_code_from_env_value};
use cohort_core::constants::{DEFAULT_MAX_AGE, DEFAULT_MIN_AGE};
use cohort_core::submit::SUBMIT_FAILURE_MESSAGE;
use cohort_core::{
    CohortConfig, CohortForm, CohortResults, CohortSubmitter, DescendantExpander,
    Polarity, SubmitOutcome, TerminologySearch,
};
use snomed::{Concept, ConceptId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "SNOMED CT cohort builder CLI")]
struct Cli {
    /// Cohort builder API base URL (falls back to COHORT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search concepts under a root concept
    Search {
        /// Search term
        term: String,
        /// Root concept id (falls back to COHORT_ROOT_CODE, then Clinical finding)
        #[arg(long)]
        root: Option<String>,
    },
    /// Show a concept's self-plus-descendant expansion
    Expand {
        /// Concept id
        code: String,
    },
    /// Build a cohort definition and submit it
    Select {
        /// Cohort title
        #[arg(long, default_value = "")]
        title: String,
        /// Gender code (repeatable; none means all)
        #[arg(long)]
        gender: Vec<String>,
        /// Ethnicity code (repeatable; none means all)
        #[arg(long)]
        ethnicity: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_MIN_AGE)]
        min_age: u32,
        #[arg(long, default_value_t = DEFAULT_MAX_AGE)]
        max_age: u32,
        /// Earliest event date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Latest event date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Required concept, `CODE` or `<<CODE` to include descendants (repeatable)
        #[arg(long)]
        must_have: Vec<CriterionArg>,
        /// Excluded concept, `CODE` or `<<CODE` to include descendants (repeatable)
        #[arg(long)]
        must_not: Vec<CriterionArg>,
    },
}

/// A criterion given on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CriterionArg {
    code: ConceptId,
    include_descendants: bool,
}

impl FromStr for CriterionArg {
    type Err = snomed::SnomedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (raw, include_descendants) = match s.strip_prefix("<<") {
            Some(rest) => (rest.trim(), true),
            None => (s, false),
        };
        Ok(Self {
            code: ConceptId::parse(raw)?,
            include_descendants,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let api_url = cli
        .api_url
        .unwrap_or_else(|| api_url_from_env_value(std::env::var("COHORT_API_URL").ok()));

    match cli.command {
        Commands::Search { term, root } => {
            let root = match root {
                Some(root) => ConceptId::parse(&root)?,
                None => root_code_from_env_value(std::env::var("COHORT_ROOT_CODE").ok())?,
            };
            let client = client(&api_url, root.clone())?;
            let mut search = TerminologySearch::new(root);
            let candidates = search.search(&client, &term).await;
            if candidates.is_empty() {
                println!("No concepts found.");
            }
            for concept in candidates {
                println!("{}\t{}", concept.code, concept.display);
            }
        }
        Commands::Expand { code } => {
            let code = ConceptId::parse(&code)?;
            let client = client(&api_url, code.clone())?;
            let expansion = DescendantExpander::new(&client).expand(code.as_str()).await?;
            match expansion.descendant_count {
                Some(count) => println!("{code}: {count} code(s) including descendants"),
                None => println!("{code}: no descendant count reported"),
            }
            for concept in &expansion.expanded_codes {
                println!("{}\t{}", concept.code, concept.display);
            }
        }
        Commands::Select {
            title,
            gender,
            ethnicity,
            min_age,
            max_age,
            start,
            end,
            must_have,
            must_not,
        } => {
            let root = root_code_from_env_value(std::env::var("COHORT_ROOT_CODE").ok())?;
            let client = client(&api_url, root)?;

            let mut form = CohortForm::new(client.config());
            form.set_title(title);
            for code in &gender {
                form.toggle_gender(code)?;
            }
            for code in &ethnicity {
                form.toggle_ethnicity(code)?;
            }
            form.set_age_range(min_age, max_age)?;
            form.set_time_range(start, end);

            for (polarity, args) in [(Polarity::MustHave, must_have), (Polarity::MustNot, must_not)]
            {
                for arg in args {
                    add_criterion(&mut form, &client, polarity, arg).await?;
                }
            }

            println!("{}", form.summary());
            println!();

            let definition = form.build()?;
            match CohortSubmitter::new().submit(&client, definition).await? {
                SubmitOutcome::Succeeded(results) => print_results(&results),
                SubmitOutcome::Failed(_) => anyhow::bail!(SUBMIT_FAILURE_MESSAGE),
            }
        }
    }

    Ok(())
}

/// Warnings from the binary and the libraries it drives, on top of `RUST_LOG`.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("cohort=warn".parse()?)
        .add_directive("cohort_core=warn".parse()?)
        .add_directive("cohort_client=warn".parse()?))
}

fn client(api_url: &str, root: ConceptId) -> anyhow::Result<HttpCohortClient> {
    let cfg = CohortConfig::new(api_url, root, false)?;
    Ok(HttpCohortClient::new(Arc::new(cfg))?)
}

/// Adds a command-line criterion, using its expansion to resolve the display name.
async fn add_criterion(
    form: &mut CohortForm,
    client: &HttpCohortClient,
    polarity: Polarity,
    arg: CriterionArg,
) -> anyhow::Result<()> {
    let code = arg.code.as_str();
    let expansion = DescendantExpander::new(client).expand(code).await;

    let display = match &expansion {
        Ok(e) => e
            .expanded_codes
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.display.clone()),
        Err(e) => {
            tracing::warn!(code, "descendant expansion failed: {e}");
            None
        }
    }
    .unwrap_or_else(|| code.to_string());

    let Some(ticket) = form.choose(polarity, Concept::new(code, display)) else {
        eprintln!("Skipping duplicate {} criterion {code}", polarity.label());
        return Ok(());
    };
    form.apply_expansion(ticket.respond(expansion.ok()));

    if arg.include_descendants {
        let index = form.criteria().len(polarity).saturating_sub(1);
        form.set_include_descendants(polarity, index, true)?;
    }
    Ok(())
}

fn print_results(results: &CohortResults) {
    println!("Cohort: {}", results.title);
    println!("Total patients: {}", results.total_patients);
    if !results.has_patients() {
        return;
    }
    for g in &results.gender_counts {
        println!("  {}: {}", g.gender, g.count);
    }
    for a in &results.age_groups {
        println!("  Age {}: {}", a.range, a.count);
    }
    for e in &results.ethnicity_counts {
        println!("  {}: {}", e.ethnicity, e.count);
    }
    if let (Some(min), Some(max)) = (results.min_age, results.max_age) {
        println!("Ages {min} - {max}");
    }
}
