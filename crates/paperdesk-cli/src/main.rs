use std::path::PathBuf;

use clap::{builder::ArgAction, Parser, Subcommand, ValueEnum};
use console::{style, Emoji};
use errors::PaperdeskCliError;
use paperdesk::{
  bootstrap::{BootstrapOutcome, Bootstrapper},
  config::Config,
  format,
  gateway::Gateway,
  guard::{Decision, Route, RouteGuard},
  models::{AnalyzeResponse, HistoryOrderBy, HistoryView, SortOrder},
  ops::{
    Analyze, Collect, CollectMode, CollectRequest, Credentials, FetchHistory, Login, Logout, Query,
    Recommend, Register, Registration,
  },
  query::{FilterValue, QueryBuilder, DEFAULT_LIMIT},
  session::SessionStore,
  task::{AsyncTask, Operation, TaskStatus},
};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;
use url::Url;

pub mod errors;
mod render;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

/// Fields a query shows when none are requested.
const DEFAULT_QUERY_FIELDS: [&str; 2] = ["title", "authors"];

#[derive(Parser)]
#[command(author, version, about = "Terminal client for the paperdesk paper discovery service")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Base URL of the service, overriding PAPERDESK_API_URL
  #[arg(long, global = true)]
  api_url: Option<Url>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Log in and keep the session for later commands
  Login {
    /// Account name, prompted for when omitted
    #[arg(long, short)]
    username: Option<String>,
  },
  /// Create an account
  Register {
    /// Account name, prompted for when omitted
    #[arg(long, short)]
    username: Option<String>,
    /// Contact address, prompted for when omitted
    #[arg(long, short)]
    email:    Option<String>,
  },
  /// End the session
  Logout,
  /// Show the session and the configured service
  Status,
  /// Navigate to a client route, e.g. `/` or `/assist?arxiv_id=2305.03048`
  Open {
    /// Client path
    path: String,
  },
  /// Collect papers of a month or a day
  Collect {
    #[command(subcommand)]
    period: Period,
  },
  /// Run a structured query over collected papers
  Query {
    /// Field to show; repeat for several (default: title, authors)
    #[arg(long = "field", short)]
    fields:  Vec<String>,
    /// Maximum number of rows
    #[arg(long, short, default_value_t = DEFAULT_LIMIT)]
    limit:   u32,
    /// Equality filter `key=value`; repeat for several
    #[arg(long = "where", short)]
    filters: Vec<String>,
  },
  /// Analyse a paper by arXiv identifier
  Assist {
    /// arXiv identifier, e.g. 2305.03048
    arxiv_id: String,
    /// Also download the PDF into this directory
    #[arg(long)]
    download: Option<PathBuf>,
  },
  /// Recommend collected papers for some keywords
  Recommend {
    /// Keywords describing what you are looking for
    #[arg(required = true)]
    keywords: Vec<String>,
  },
  /// Show the papers you analysed
  History {
    /// Column to order by
    #[arg(long, value_enum, default_value_t = SortColumn::AccessTime)]
    sort:  SortColumn,
    /// Direction; clicking a column starts ascending, except the default recency view
    #[arg(long, value_enum)]
    order: Option<Order>,
  },
}

#[derive(Subcommand)]
enum Period {
  /// Every paper of a month
  Monthly {
    /// Year, e.g. 2025
    year:  i32,
    /// Month, 1-12
    month: u32,
  },
  /// Papers of a single day
  Daily {
    /// Year, e.g. 2025
    year:  i32,
    /// Month, 1-12
    month: u32,
    /// Day of month, the 1st when omitted
    day:   Option<u32>,
  },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SortColumn {
  /// When the paper was analysed
  AccessTime,
  /// Number of likes
  Likes,
}

impl From<SortColumn> for HistoryOrderBy {
  fn from(column: SortColumn) -> Self {
    match column {
      SortColumn::AccessTime => HistoryOrderBy::AccessTime,
      SortColumn::Likes => HistoryOrderBy::LikeCount,
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Order {
  /// Smallest first
  Asc,
  /// Largest first
  Desc,
}

impl From<Order> for SortOrder {
  fn from(order: Order) -> Self {
    match order {
      Order::Asc => SortOrder::Ascending,
      Order::Desc => SortOrder::Descending,
    }
  }
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Everything a command needs, built once per run.
struct App {
  config:  Config,
  session: SessionStore,
  gateway: Gateway,
  guard:   RouteGuard,
}

impl App {
  fn new(api_url: Option<Url>) -> Result<Self, PaperdeskCliError> {
    let mut config = Config::from_env()?;
    if let Some(api_url) = api_url {
      config = config.with_api_url(api_url);
    }
    trace!("Using session at: {}", config.session_path.display());
    let session = SessionStore::open(&config.session_path)?;
    let gateway = Gateway::new(&config, session.clone())?;
    let guard = RouteGuard::new(session.clone());
    Ok(Self { config, session, gateway, guard })
  }

  /// Asks the guard whether `route` renders; prints where the user is sent otherwise.
  fn enter(&self, route: &Route) -> bool {
    let decision = self.guard.evaluate_route(route);
    if let Decision::Render(_) = decision {
      return true;
    }
    let destination = decision.destination();
    println!(
      "{} {} redirected to {}",
      style(WARNING).yellow(),
      style(route).yellow(),
      style(&destination).cyan()
    );
    if destination == Route::Login {
      println!("   Log in first with {}", style("paperdesk login").yellow().bold());
    }
    false
  }
}

/// Invokes `task` and returns its output, printing the failure message if it did not succeed.
async fn settle<O: Operation>(task: &AsyncTask<O>, gateway: &Gateway) -> Option<O::Output> {
  let settlement = task.invoke(gateway).await;
  debug!("{} settled: {settlement:?}", O::NAME);
  outcome(task)
}

/// The output of a settled task, or `None` after printing why there is none.
fn outcome<O: Operation>(task: &AsyncTask<O>) -> Option<O::Output> {
  if task.status() == TaskStatus::Succeeded {
    return task.output();
  }
  if let Some(message) = task.error_message() {
    println!("{} {}", style(WARNING).yellow(), style(message).red());
  }
  None
}

/// Prompts for a text value unless it was given on the command line.
fn text_or_prompt(value: Option<String>, prompt: &str) -> Result<String, PaperdeskCliError> {
  match value {
    Some(value) => Ok(value),
    None => Ok(dialoguer::Input::<String>::new().with_prompt(prompt).interact_text()?),
  }
}

fn parse_filter(filter: &str) -> Result<(String, FilterValue), PaperdeskCliError> {
  match filter.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() =>
      Ok((key.trim().to_string(), FilterValue::parse(value))),
    _ => Err(PaperdeskCliError::Filter(filter.to_string())),
  }
}

async fn show_analysis(arxiv_id: &str, response: &AnalyzeResponse, download: Option<PathBuf>) {
  println!("\n{} Analysis of {}:", style(PAPER).green(), style(arxiv_id).yellow());
  render::analysis(response);

  if let Some(dir) = download {
    match format::download_pdf(response, arxiv_id, &dir).await {
      Ok(path) => {
        println!("\n{} Saved PDF to {}", style(SAVE).green(), style(path.display()).yellow())
      },
      Err(e) => println!("\n{} PDF download failed: {}", style(WARNING).yellow(), style(e).red()),
    }
  }
}

async fn history(app: &App, sort: SortColumn, order: Option<Order>) {
  let task = AsyncTask::new(FetchHistory, ());
  let Some(entries) = settle(&task, &app.gateway).await else {
    return;
  };
  if entries.is_empty() {
    println!("{} No reading history yet", style(BOOKS).cyan());
    return;
  }

  let view = match order {
    Some(order) => HistoryView::ordered(&entries, sort.into(), order.into()),
    None => {
      let mut view = HistoryView::new(&entries);
      if sort != SortColumn::AccessTime {
        view.toggle(sort.into());
      }
      view
    },
  };
  println!("{} {} papers analysed:", style(BOOKS).cyan(), style(entries.len()).yellow());
  render::history(&view.sorted());
}

#[tokio::main]
async fn main() -> Result<(), PaperdeskCliError> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);
  let app = App::new(cli.api_url)?;

  match cli.command {
    Commands::Login { username } => {
      let username = text_or_prompt(username, "Username")?;
      let password = dialoguer::Password::new().with_prompt("Password").interact()?;

      println!("{} Logging in as {}", style(KEY).cyan(), style(&username).yellow());
      let task = AsyncTask::new(Login, Credentials::new(username, password));
      if settle(&task, &app.gateway).await.is_some() {
        println!("{} Logged in successfully!", style(SUCCESS).green());
        println!(
          "   {} {}",
          style("Session:").green(),
          style(app.config.session_path.display()).yellow()
        );
        let start = app.guard.evaluate("/").destination();
        println!("   {} {}", style("Start at:").green(), style(start).cyan());
      }
      Ok(())
    },

    Commands::Register { username, email } => {
      let username = text_or_prompt(username, "Username")?;
      let email = text_or_prompt(email, "Email")?;
      let password = dialoguer::Password::new()
        .with_prompt("Password")
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?;

      let task = AsyncTask::new(Register, Registration { username, password, email });
      if let Some(message) = settle(&task, &app.gateway).await {
        let message = message.unwrap_or_else(|| "Registration successful".to_string());
        println!("{} {}", style(SUCCESS).green(), message);
        println!("   Log in with {}", style("paperdesk login").yellow().bold());
      }
      Ok(())
    },

    Commands::Logout => {
      if !app.session.is_logged_in() {
        println!("{} Not logged in", style("ℹ").blue());
        return Ok(());
      }
      let task = AsyncTask::new(Logout, ());
      if let Some(outcome) = settle(&task, &app.gateway).await {
        if let Some(error) = outcome.remote_error {
          println!("{} Server logout failed: {}", style(WARNING).yellow(), style(error).red());
        }
        println!("{} Logged out, local session cleared", style(SUCCESS).green());
      }
      Ok(())
    },

    Commands::Status => {
      if app.session.is_logged_in() {
        println!("{} Logged in", style(KEY).green());
      } else {
        println!("{} Not logged in", style("ℹ").blue());
      }
      println!("   {} {}", style("Service:").green(), style(&app.config.api_url).yellow());
      println!(
        "   {} {}",
        style("Session:").green(),
        style(app.config.session_path.display()).yellow()
      );
      Ok(())
    },

    Commands::Open { path } => {
      let decision = app.guard.evaluate(&path);
      let destination = decision.destination();
      if decision.is_redirect() {
        println!(
          "{} {} redirected to {}",
          style(ROCKET).cyan(),
          style(&path).yellow(),
          style(&destination).cyan()
        );
      } else {
        println!("{} Opening {}", style(ROCKET).cyan(), style(&destination).cyan());
      }

      match &destination {
        Route::Assist { .. } => {
          let task = AsyncTask::new(Analyze, String::new());
          match Bootstrapper::from_route(&destination).run(&task, &app.gateway).await {
            BootstrapOutcome::Triggered(_) => {
              if let Some(response) = outcome(&task) {
                show_analysis(&task.input(), &response, None).await;
              }
            },
            BootstrapOutcome::Populated => println!(
              "{} {} is not a valid arXiv ID (e.g., 2305.03048)",
              style(WARNING).yellow(),
              style(task.input()).yellow()
            ),
            BootstrapOutcome::Ignored =>
              println!("   Analyse a paper with {}", style("paperdesk assist <arxiv-id>").yellow()),
          }
        },
        Route::History => history(&app, SortColumn::AccessTime, None).await,
        Route::Login | Route::Register => println!(
          "   Continue with {}",
          style(format!("paperdesk {}", destination.path().trim_start_matches('/'))).yellow().bold()
        ),
        other => println!(
          "   See {}",
          style(format!("paperdesk {} --help", other.path().trim_start_matches('/'))).yellow()
        ),
      }
      Ok(())
    },

    Commands::Collect { period } => {
      if !app.enter(&Route::Collect) {
        return Ok(());
      }
      let request = match period {
        Period::Monthly { year, month } => CollectRequest::monthly(year, month),
        Period::Daily { year, month, day } => CollectRequest::daily(year, month, day),
      };
      let date = match request.mode {
        CollectMode::Monthly => {
          format!("{}-{:02}", request.year, request.month.unwrap_or_default())
        },
        CollectMode::Daily => format!(
          "{}-{:02}-{:02}",
          request.year,
          request.month.unwrap_or_default(),
          request.effective_day()
        ),
      };
      println!("{} Collecting papers for {}", style(LOOKING_GLASS).cyan(), style(date).yellow());

      let task = AsyncTask::new(Collect, request);
      if let Some(response) = settle(&task, &app.gateway).await {
        println!(
          "\n{} Collected {} papers",
          style(SUCCESS).green(),
          style(response.result.len()).yellow()
        );
        render::papers(&response.result);
      }
      Ok(())
    },

    Commands::Query { fields, limit, filters } => {
      if !app.enter(&Route::Query) {
        return Ok(());
      }
      let mut builder = QueryBuilder::new();
      if fields.is_empty() {
        for field in DEFAULT_QUERY_FIELDS {
          builder.add_field(field);
        }
      }
      for field in fields {
        builder.add_field(field);
      }
      for filter in &filters {
        let (key, value) = parse_filter(filter)?;
        builder.set_filter(key, value);
      }
      builder.set_limit(limit);
      debug!("Query: {:?}", builder.build());

      let fields = builder.fields().join(", ");
      println!("{} Querying {}", style(LOOKING_GLASS).cyan(), style(fields).yellow());
      let task = AsyncTask::new(Query, builder);
      if let Some(rows) = settle(&task, &app.gateway).await {
        if rows.is_empty() {
          println!("{} No papers match", style(WARNING).yellow());
        } else {
          println!("\n{} Found {} rows:", style(SUCCESS).green(), style(rows.len()).yellow());
          render::rows(task.input().fields(), &rows);
        }
      }
      Ok(())
    },

    Commands::Assist { arxiv_id, download } => {
      if !app.enter(&Route::assist(arxiv_id.as_str())) {
        return Ok(());
      }
      println!("{} Analysing {}", style(LOOKING_GLASS).cyan(), style(&arxiv_id).yellow());
      let task = AsyncTask::new(Analyze, arxiv_id.clone());
      if let Some(response) = settle(&task, &app.gateway).await {
        show_analysis(&arxiv_id, &response, download).await;
      }
      Ok(())
    },

    Commands::Recommend { keywords } => {
      if !app.enter(&Route::Recommend) {
        return Ok(());
      }
      let keywords = keywords.join(" ");
      println!(
        "{} Recommending papers for {}",
        style(LOOKING_GLASS).cyan(),
        style(&keywords).yellow()
      );

      let task = AsyncTask::new(Recommend, keywords);
      if let Some(papers) = settle(&task, &app.gateway).await {
        if papers.is_empty() {
          println!(
            "{} No recommendations, try collecting more papers first",
            style(WARNING).yellow()
          );
        } else {
          println!(
            "\n{} {} recommendations:",
            style(SUCCESS).green(),
            style(papers.len()).yellow()
          );
          render::papers(&papers);
        }
      }
      Ok(())
    },

    Commands::History { sort, order } => {
      if app.enter(&Route::History) {
        history(&app, sort, order).await;
      }
      Ok(())
    },
  }
}
