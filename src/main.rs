mod actions;
mod api;
mod app;
mod applications;
mod config;
mod dispatch;
mod filters;
mod forms;
mod listing;
mod loadable;
mod models;
mod pagination;
mod session;
mod tui;
mod view;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{ApiClient, JobQuery};
use config::Config;
use filters::{FilterCriteria, FilterField, FilterState};
use forms::{company_options, filter_options, location_options};
use models::{Job, SalaryMetric};

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Job board client - browse, apply, shortlist, post and analyze jobs")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and environment)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive terminal client (default)
    Browse,

    /// List jobs matching the filters
    Jobs {
        #[command(flatten)]
        filters: FilterArgs,

        /// Zero-based page index
        #[arg(short, long, default_value = "0")]
        page: usize,

        /// Viewer id, lets the server hide jobs they disliked
        #[arg(short, long)]
        user: Option<i64>,

        /// List every active job, ignoring filters and paging
        #[arg(long)]
        all: bool,
    },

    /// Count jobs matching the filters
    Count {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List known locations
    Locations {
        /// Only show locations matching this text
        search: Option<String>,
    },

    /// List known companies
    Companies {
        /// Only show companies matching this text
        search: Option<String>,
    },

    /// Show job statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },

    /// Show jobs similar to a job
    Recommend {
        /// Job ID
        job_id: i64,

        /// Viewer id
        #[arg(short, long)]
        user: i64,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Average salary per location
    Salaries {
        /// Which salary bound to average (min, max)
        #[arg(short, long, default_value = "min")]
        metric: String,
    },

    /// Engagement averages for a city
    City {
        /// City name or ID
        city: String,
    },

    /// Engagement averages for a company
    Company {
        /// Company name or ID
        company: String,
    },

    /// Shortlist to application ratio of an employer's jobs
    Ratio {
        /// Employer user ID
        employer_id: i64,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// City name or ID
    #[arg(long)]
    city: Option<String>,

    /// Company name or ID
    #[arg(long)]
    company: Option<String>,

    /// Minimum salary (thousands)
    #[arg(long)]
    min_salary: Option<String>,

    /// Maximum salary (thousands)
    #[arg(long)]
    max_salary: Option<String>,

    /// Work type (full-time, part-time, contract, intern)
    #[arg(long)]
    work_type: Option<String>,
}

impl FilterArgs {
    /// Resolves the arguments the same way the filter bar does. Reference
    /// data is only fetched when a city or company was given.
    async fn resolve(&self, api: &ApiClient) -> Result<FilterCriteria> {
        let locations = match &self.city {
            Some(_) => api.locations().await?,
            None => Vec::new(),
        };
        let companies = match &self.company {
            Some(_) => api.companies().await?,
            None => Vec::new(),
        };

        let mut state = FilterState::default();
        let values = [
            (FilterField::City, &self.city),
            (FilterField::Company, &self.company),
            (FilterField::MinSalary, &self.min_salary),
            (FilterField::MaxSalary, &self.max_salary),
            (FilterField::WorkType, &self.work_type),
        ];
        for (field, value) in values {
            if let Some(value) = value {
                state.set_input(field, value.clone());
            }
        }
        let criteria = state.commit(&locations, &companies)?;
        Ok(criteria.clone())
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    init_logging(&config)?;
    info!(api_url = %config.api_url, "starting");

    let api = ApiClient::new(&config.api_url, config.request_timeout())?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    match cli.command.unwrap_or(Commands::Browse) {
        Commands::Browse => {
            tui::run_browse(&runtime, api, &config)?;
        }

        Commands::Jobs {
            filters,
            page,
            user,
            all,
        } => {
            let jobs = runtime.block_on(async {
                if all {
                    return Ok::<_, anyhow::Error>(api.list_jobs().await?);
                }
                let query = JobQuery {
                    filters: filters.resolve(&api).await?,
                    page,
                    page_size: config.page_size,
                    user_id: user,
                };
                Ok(api.search_jobs(&query).await?)
            })?;
            print_jobs(&jobs);
        }

        Commands::Count { filters } => {
            let count = runtime.block_on(async {
                let criteria = filters.resolve(&api).await?;
                Ok::<_, anyhow::Error>(api.count_jobs(&criteria).await?)
            })?;
            let pages = (count as usize).div_ceil(config.page_size);
            println!("{} jobs ({} pages of {})", count, pages, config.page_size);
        }

        Commands::Locations { search } => {
            let locations = runtime.block_on(api.locations())?;
            let options = location_options(&locations);
            let shown = match &search {
                Some(text) => filter_options(&options, text),
                None => options.iter().collect(),
            };
            if shown.is_empty() {
                println!("No locations found.");
            } else {
                println!("{:<6} {:<40}", "ID", "LOCATION");
                println!("{}", "-".repeat(46));
                for opt in shown {
                    println!("{:<6} {:<40}", opt.id, truncate(&opt.label, 40));
                }
            }
        }

        Commands::Companies { search } => {
            let companies = runtime.block_on(api.companies())?;
            let options = company_options(&companies);
            let shown = match &search {
                Some(text) => filter_options(&options, text),
                None => options.iter().collect(),
            };
            if shown.is_empty() {
                println!("No companies found.");
            } else {
                println!("{:<6} {:<40}", "ID", "COMPANY");
                println!("{}", "-".repeat(46));
                for opt in shown {
                    println!("{:<6} {:<40}", opt.id, truncate(&opt.label, 40));
                }
            }
        }

        Commands::Stats { command } => match command {
            StatsCommands::Salaries { metric } => {
                let metric = match metric.to_lowercase().as_str() {
                    "min" | "minimum" => SalaryMetric::Min,
                    "max" | "maximum" => SalaryMetric::Max,
                    other => return Err(anyhow!("Unknown metric '{}', use min or max", other)),
                };
                let rows = runtime.block_on(api.salary_by_location(metric))?;
                if rows.is_empty() {
                    println!("No salary data.");
                } else {
                    println!("Average {} by location", metric.label());
                    println!("{:<24} {:<20} {:>12}", "CITY", "COUNTRY", "SALARY (K)");
                    println!("{}", "-".repeat(58));
                    for row in &rows {
                        let value = row
                            .value(metric)
                            .map_or_else(|| "-".to_string(), |v| format!("${:.0}", v));
                        println!(
                            "{:<24} {:<20} {:>12}",
                            truncate(&row.city_name, 22),
                            truncate(&row.country_name, 18),
                            value
                        );
                    }
                }
            }

            StatsCommands::City { city } => {
                let stats = runtime.block_on(async {
                    let locations = api.locations().await?;
                    let id = forms::resolve_option(&location_options(&locations), &city, "location")?;
                    Ok::<_, anyhow::Error>(api.location_stats(id).await?)
                })?;
                println!("Location: {}", city);
                print_metrics("Average", &stats.averages);
                print_top("Top 10%", &stats.top_decile);
            }

            StatsCommands::Company { company } => {
                let stats = runtime.block_on(async {
                    let companies = api.companies().await?;
                    let id = forms::resolve_option(&company_options(&companies), &company, "company")?;
                    Ok::<_, anyhow::Error>(api.company_stats(id).await?)
                })?;
                println!("Company: {}", company);
                print_metrics("Company average", &stats.company_averages);
                print_top("Industry top 10%", &stats.industry_top_decile);
            }

            StatsCommands::Ratio { employer_id } => {
                let rows = runtime.block_on(api.shortlist_ratio(employer_id))?;
                if rows.is_empty() {
                    println!("No jobs found for employer #{}.", employer_id);
                } else {
                    println!("{:<6} {:<30} {:>10} {:>12} {:>8}", "ID", "TITLE", "SHORTLIST", "APPLICATIONS", "RATIO");
                    println!("{}", "-".repeat(70));
                    for row in rows {
                        println!(
                            "{:<6} {:<30} {:>10} {:>12} {:>8}",
                            row.job_id,
                            truncate(row.title.as_deref().unwrap_or("-"), 28),
                            row.shortlist_count.unwrap_or(0),
                            row.application_count.unwrap_or(0),
                            row.ratio.map_or_else(|| "-".to_string(), |r| format!("{:.2}", r))
                        );
                    }
                }
            }
        },

        Commands::Recommend { job_id, user } => {
            let jobs = runtime.block_on(api.recommendations(job_id, user))?;
            if jobs.is_empty() {
                println!("No similar jobs found.");
            } else {
                print_jobs(&jobs);
            }
        }
    }

    Ok(())
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<6} {:<30} {:<20} {:<20} {:<10} {:>12}",
        "ID", "TITLE", "COMPANY", "LOCATION", "TYPE", "SALARY"
    );
    println!("{}", "-".repeat(103));
    for job in jobs {
        println!(
            "{:<6} {:<30} {:<20} {:<20} {:<10} {:>12}",
            job.job_id,
            truncate(&job.title, 28),
            truncate(&job.company_name, 18),
            truncate(&job.location(), 18),
            job.work_type.label(),
            job.salary_range()
        );
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn print_metrics(label: &str, metrics: &models::MetricAverages) {
    println!(
        "{:<18} apply {:>8}  dislike {:>8}  shortlist {:>8}",
        label,
        fmt_metric(metrics.avg_apply),
        fmt_metric(metrics.avg_dislike),
        fmt_metric(metrics.avg_shortlist)
    );
}

fn print_top(label: &str, top: &models::TopDecile) {
    println!(
        "{:<18} apply {:>8}  dislike {:>8}  shortlist {:>8}",
        label,
        fmt_metric(top.top_apply),
        fmt_metric(top.top_dislike),
        fmt_metric(top.top_shortlist)
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Backend Engineer", 20), "Backend Engineer");
        assert_eq!(truncate("Senior Platform Engineer", 10), "Senior ...");
        assert_eq!(truncate("Développeur", 8), "Dével...");
    }
}
